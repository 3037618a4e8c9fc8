use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Per-symbol, per-analyzer score mapping
///
/// `scores["BTCUSDT"]["stats"]` is the statistics worker's bounded signal
/// for BTCUSDT; other analyzers add their own keys as the update travels
/// down the pipeline.
pub type ScoreMap = BTreeMap<String, BTreeMap<String, f64>>;

/// Free-form command arguments
pub type Args = serde_json::Map<String, Value>;

/// An analysis cycle's shared score mapping
///
/// Minted by the operator with one empty entry per tracked symbol; each
/// worker enriches it and republishes it on the next stage's topic. The
/// request id correlates envelopes belonging to one cycle across services;
/// updates without one (legacy senders) are processed unchanged.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScoreUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub scores: ScoreMap,
}

impl ScoreUpdate {
    /// Start a new analysis cycle over `symbols`
    pub fn request(symbols: impl IntoIterator<Item = String>) -> Self {
        Self {
            request_id: Some(Uuid::new_v4().to_string()),
            scores: symbols.into_iter().map(|s| (s, BTreeMap::new())).collect(),
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        self.scores.keys().cloned().collect()
    }
}

/// Messages exchanged between pipeline stages
///
/// Untagged: each variant is discriminated by its distinct required key
/// (`scores`, `scommand`, `tcommand`, `command`), matching the wire shapes
/// the services already speak. Variant order matters — a scores-bearing
/// payload always dispatches as a score update.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireMessage {
    /// `{"scores": {...}}` — an analysis cycle in flight
    Scores(ScoreUpdate),
    /// `{"scommand": "...", "args": {...}}` — statistics-worker side task
    StatsTask {
        scommand: String,
        #[serde(default)]
        args: Args,
    },
    /// `{"tcommand": "...", "args": {...}}` — sentiment-worker side task
    SentimentTask {
        tcommand: String,
        #[serde(default)]
        args: Args,
    },
    /// `{"command": "...", "args": {...}}` — operator-level command
    Command {
        command: String,
        #[serde(default)]
        args: Args,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Envelope;
    use serde_json::json;

    #[test]
    fn test_score_request_has_empty_maps_and_id() {
        let update = ScoreUpdate::request(vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]);
        assert_eq!(update.symbols(), vec!["BTCUSDT", "ETHUSDT"]);
        assert!(update.scores.values().all(|m| m.is_empty()));
        assert!(update.request_id.is_some());
    }

    #[test]
    fn test_wire_shapes_decode_to_the_right_variant() {
        let scores = Envelope::encode(
            "t",
            &json!({"scores": {"BTCUSDT": {"stats": 0.5}}}),
        )
        .unwrap();
        assert!(matches!(
            scores.decode::<WireMessage>().unwrap(),
            WireMessage::Scores(_)
        ));

        let stats_task =
            Envelope::encode("t", &json!({"scommand": "export", "args": {}})).unwrap();
        assert!(matches!(
            stats_task.decode::<WireMessage>().unwrap(),
            WireMessage::StatsTask { .. }
        ));

        let sentiment_task =
            Envelope::encode("t", &json!({"tcommand": "keyword", "args": {"keyword": "btc"}}))
                .unwrap();
        assert!(matches!(
            sentiment_task.decode::<WireMessage>().unwrap(),
            WireMessage::SentimentTask { .. }
        ));

        let command = Envelope::encode("t", &json!({"command": "analyze"})).unwrap();
        assert!(matches!(
            command.decode::<WireMessage>().unwrap(),
            WireMessage::Command { .. }
        ));
    }

    #[test]
    fn test_score_update_round_trips_without_request_id() {
        // Legacy senders omit the id entirely; it must stay absent, not
        // serialize as null.
        let update = ScoreUpdate {
            request_id: None,
            scores: ScoreMap::from([(
                "BTCUSDT".to_string(),
                BTreeMap::from([("stats".to_string(), -0.25)]),
            )]),
        };
        let envelope = Envelope::encode("t", &WireMessage::Scores(update.clone())).unwrap();
        assert!(!String::from_utf8(envelope.payload.clone())
            .unwrap()
            .contains("request_id"));
        let decoded: WireMessage = envelope.decode().unwrap();
        assert_eq!(decoded, WireMessage::Scores(update));
    }
}
