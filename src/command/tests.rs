use super::*;
use crate::bus::{Envelope, EnvelopeSink, MessageHandler};
use crate::chat::ChatClient;
use crate::config::PulseConfig;
use crate::protocol::{ScoreUpdate, WireMessage};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

// ── Test doubles ──────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct MockChat {
    messages: Arc<StdMutex<Vec<(String, String)>>>,
    attachments: Arc<StdMutex<Vec<(String, String)>>>,
}

impl MockChat {
    fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    fn attachments(&self) -> Vec<(String, String)> {
        self.attachments.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for MockChat {
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }

    async fn post_attachment(
        &self,
        channel: &str,
        title: &str,
        _path: &Path,
    ) -> anyhow::Result<()> {
        self.attachments
            .lock()
            .unwrap()
            .push((channel.to_string(), title.to_string()));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct CaptureSink {
    sent: Arc<StdMutex<Vec<Envelope>>>,
}

impl CaptureSink {
    fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().unwrap().clone()
    }
}

impl EnvelopeSink for CaptureSink {
    fn send(&self, envelope: Envelope) {
        self.sent.lock().unwrap().push(envelope);
    }
}

fn test_config() -> PulseConfig {
    let mut config = PulseConfig::default();
    config.operator.privileged_user = "operator".to_string();
    config.operator.min_interval_secs = 60;
    config.operator.supported_symbols = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()];
    config
}

fn fixture() -> (
    CommandRouter,
    Arc<Mutex<OperatorSession>>,
    MockChat,
    CaptureSink,
) {
    let config = test_config();
    let chat = MockChat::default();
    let sink = CaptureSink::default();
    let router = CommandRouter::new(&config.commands, &config.operator.privileged_user).unwrap();
    let session = Arc::new(Mutex::new(OperatorSession::new(
        Arc::new(chat.clone()),
        Arc::new(sink.clone()),
        &config,
    )));
    (router, session, chat, sink)
}

// ── Router ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ordinary_conversation_is_ignored() {
    let (router, session, chat, sink) = fixture();

    router
        .dispatch(&ChatEvent::message("good morning all", "u1", "general"), &session)
        .await;

    assert!(chat.messages().is_empty());
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn test_bot_and_non_message_events_are_ignored() {
    let (router, session, chat, sink) = fixture();

    let mut from_bot = ChatEvent::message("target BTCUSDT", "u1", "general");
    from_bot.from_bot = true;
    router.dispatch(&from_bot, &session).await;

    let mut wrong_kind = ChatEvent::message("target BTCUSDT", "u1", "general");
    wrong_kind.kind = "channel_join".to_string();
    router.dispatch(&wrong_kind, &session).await;

    assert!(session.lock().await.targets().is_empty());
    assert!(chat.messages().is_empty());
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn test_unauthorized_privileged_command_is_dropped() {
    let (router, session, chat, sink) = fixture();

    router
        .dispatch(&ChatEvent::message("setlog", "mallory", "general"), &session)
        .await;

    // No state mutation, no reply, no outbound envelope.
    assert_eq!(session.lock().await.log_channel(), None);
    assert!(chat.messages().is_empty());
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn test_privileged_command_runs_for_the_configured_user() {
    let (router, session, _chat, _sink) = fixture();

    router
        .dispatch(&ChatEvent::message("setlog", "operator", "alerts"), &session)
        .await;

    assert_eq!(session.lock().await.log_channel(), Some("alerts"));
}

#[tokio::test]
async fn test_first_token_is_case_insensitive() {
    let (router, session, _chat, _sink) = fixture();

    router
        .dispatch(&ChatEvent::message("Target btcusdt", "u1", "general"), &session)
        .await;

    assert_eq!(session.lock().await.targets(), ["BTCUSDT"]);
}

#[test]
fn test_router_rejects_unknown_configured_command() {
    let mut config = test_config();
    config.commands.insert(
        "frobnicate".to_string(),
        crate::config::CommandSpec {
            description: "does not exist".to_string(),
            privileged: false,
        },
    );

    let result = CommandRouter::new(&config.commands, "operator");
    assert_eq!(
        result.err(),
        Some(RouterError::UnknownCommand("frobnicate".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_throttle_delays_second_analyze() {
    let (router, session, _chat, sink) = fixture();

    router
        .dispatch(&ChatEvent::message("target BTCUSDT", "u1", "general"), &session)
        .await;
    router
        .dispatch(&ChatEvent::message("analyze", "u1", "general"), &session)
        .await;

    let started = Instant::now();
    router
        .dispatch(&ChatEvent::message("analyze", "u1", "general"), &session)
        .await;

    // The second trigger executes only after the full interval has elapsed.
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert_eq!(sink.sent().len(), 2);
}

// ── Session commands ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_target_dedups_and_untarget_empties() {
    let (router, session, _chat, _sink) = fixture();

    router
        .dispatch(
            &ChatEvent::message("target BTCUSDT BTCUSDT", "u1", "general"),
            &session,
        )
        .await;
    assert_eq!(session.lock().await.targets(), ["BTCUSDT"]);

    router
        .dispatch(&ChatEvent::message("untarget BTCUSDT", "u1", "general"), &session)
        .await;
    assert!(session.lock().await.targets().is_empty());
}

#[tokio::test]
async fn test_target_unsupported_symbol_leaves_set_unchanged() {
    let (router, session, chat, _sink) = fixture();

    router
        .dispatch(&ChatEvent::message("target DOGE", "u1", "general"), &session)
        .await;

    assert!(session.lock().await.targets().is_empty());
    // Exactly one diagnostic, no summary.
    let messages = chat.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, "DOGE is not supported, skipped.");
}

#[tokio::test]
async fn test_untarget_unknown_symbol_is_a_diagnostic() {
    let (router, session, chat, _sink) = fixture();

    router
        .dispatch(&ChatEvent::message("untarget ETHUSDT", "u1", "general"), &session)
        .await;

    let messages = chat.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, "ETHUSDT is not tracked, skipped.");
}

#[tokio::test]
async fn test_help_posts_the_command_table() {
    let (router, session, chat, _sink) = fixture();

    router
        .dispatch(&ChatEvent::message("help", "u1", "general"), &session)
        .await;

    let messages = chat.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("analyze"));
    assert!(messages[0].1.contains("BTCUSDT"));
}

#[tokio::test]
async fn test_help_with_arguments_asks_back() {
    let (router, session, chat, _sink) = fixture();

    router
        .dispatch(&ChatEvent::message("help me please", "u1", "general"), &session)
        .await;

    assert_eq!(chat.messages()[0].1, "Invalid command, do you mean \"help\"?");
}

#[tokio::test]
async fn test_analyze_publishes_one_request_per_cycle() {
    let (router, session, _chat, sink) = fixture();

    router
        .dispatch(
            &ChatEvent::message("target BTCUSDT ETHUSDT", "u1", "general"),
            &session,
        )
        .await;
    router
        .dispatch(&ChatEvent::message("analyze", "u1", "general"), &session)
        .await;

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].topic, "pulse.work.stats");

    let WireMessage::Scores(update) = sent[0].decode().unwrap() else {
        panic!("expected a score update");
    };
    assert_eq!(update.symbols(), vec!["BTCUSDT", "ETHUSDT"]);
    assert!(update.scores.values().all(|m| m.is_empty()));
    assert!(update.request_id.is_some());

    // The throttle stamp was taken.
    assert!(session.lock().await.throttle_remaining() > Duration::ZERO);
}

#[tokio::test]
async fn test_analyze_without_targets_is_a_diagnostic_noop() {
    let (router, session, chat, sink) = fixture();

    router
        .dispatch(&ChatEvent::message("analyze", "u1", "general"), &session)
        .await;

    assert!(sink.sent().is_empty());
    assert_eq!(
        chat.messages()[0].1,
        "No targets set, run `target <SYMBOL>` first."
    );
}

#[tokio::test]
async fn test_showlast_posts_one_attachment_per_target() {
    let (router, session, chat, _sink) = fixture();

    router
        .dispatch(
            &ChatEvent::message("target BTCUSDT ETHUSDT", "u1", "general"),
            &session,
        )
        .await;
    router
        .dispatch(&ChatEvent::message("showlast", "u1", "general"), &session)
        .await;

    let attachments = chat.attachments();
    assert_eq!(attachments.len(), 2);
    assert_eq!(attachments[0].1, "BTCUSDT last forecast");
}

// ── Inbound handlers ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_score_log_handler_posts_to_the_log_channel() {
    let (router, session, chat, _sink) = fixture();

    router
        .dispatch(&ChatEvent::message("setlog", "operator", "alerts"), &session)
        .await;

    let update = ScoreUpdate {
        request_id: None,
        scores: BTreeMap::from([(
            "BTCUSDT".to_string(),
            BTreeMap::from([("stats".to_string(), 0.5)]),
        )]),
    };
    let envelope = Envelope::encode("pulse.scores", &WireMessage::Scores(update)).unwrap();

    let mut handler = ScoreLogHandler::new(session.clone());
    handler.on_envelope(&envelope).await.unwrap();

    let messages = chat.messages();
    let line = &messages.last().unwrap();
    assert_eq!(line.0, "alerts");
    assert_eq!(line.1, "BTCUSDT: stats 0.500");
}

#[tokio::test]
async fn test_score_log_handler_without_channel_only_logs() {
    let (_router, session, chat, _sink) = fixture();

    let update = ScoreUpdate {
        request_id: None,
        scores: BTreeMap::from([("BTCUSDT".to_string(), BTreeMap::new())]),
    };
    let envelope = Envelope::encode("pulse.scores", &WireMessage::Scores(update)).unwrap();

    let mut handler = ScoreLogHandler::new(session);
    handler.on_envelope(&envelope).await.unwrap();

    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn test_score_log_handler_delivers_artifacts() {
    let (router, session, chat, _sink) = fixture();

    router
        .dispatch(&ChatEvent::message("setlog", "operator", "alerts"), &session)
        .await;

    let envelope = Envelope::encode(
        "pulse.scores",
        &json!({"command": "post", "args": {"type": "csv", "path": "/data/btc.csv"}}),
    )
    .unwrap();

    let mut handler = ScoreLogHandler::new(session);
    handler.on_envelope(&envelope).await.unwrap();

    assert_eq!(chat.attachments(), vec![("alerts".to_string(), "csv".to_string())]);
}

#[tokio::test]
async fn test_score_log_handler_rejects_malformed_payload() {
    let (_router, session, _chat, _sink) = fixture();

    let mut handler = ScoreLogHandler::new(session);
    let envelope = Envelope::new("pulse.scores", b"not json at all".to_vec());
    assert!(handler.on_envelope(&envelope).await.is_err());
}

#[tokio::test]
async fn test_command_envelope_drives_the_router() {
    let (router, session, _chat, sink) = fixture();

    let mut handler = CommandEnvelopeHandler::new(Arc::new(router), session);

    let target = Envelope::encode(
        "pulse.intake",
        &json!({"command": "target", "args": {"text": "target BTCUSDT", "user": "u1", "channel": "general"}}),
    )
    .unwrap();
    handler.on_envelope(&target).await.unwrap();

    let analyze = Envelope::encode("pulse.intake", &json!({"command": "analyze"})).unwrap();
    handler.on_envelope(&analyze).await.unwrap();

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        sent[0].decode::<WireMessage>().unwrap(),
        WireMessage::Scores(_)
    ));
}

#[tokio::test]
async fn test_command_envelope_respects_privilege() {
    let (router, session, _chat, _sink) = fixture();

    let mut handler = CommandEnvelopeHandler::new(Arc::new(router), session.clone());

    // No sender in args means unprivileged.
    let envelope =
        Envelope::encode("pulse.intake", &json!({"command": "setlog", "args": {"channel": "alerts"}}))
            .unwrap();
    handler.on_envelope(&envelope).await.unwrap();

    assert_eq!(session.lock().await.log_channel(), None);
}
