use crate::sentiment::SentimentModel;
use anyhow::bail;

/// Financial-tone words counted positive
const POSITIVE: &[&str] = &[
    "gain", "gains", "rally", "rallies", "surge", "surges", "soar", "soars", "bull",
    "bullish", "record", "growth", "profit", "profits", "rebound", "recovery", "upgrade",
    "breakout", "adoption", "support",
];

/// Financial-tone words counted negative
const NEGATIVE: &[&str] = &[
    "loss", "losses", "crash", "crashes", "plunge", "plunges", "drop", "drops", "bear",
    "bearish", "fraud", "hack", "hacked", "selloff", "sell-off", "downgrade", "fear",
    "ban", "banned", "lawsuit", "collapse",
];

/// Keyword-lexicon sentiment model
///
/// A deterministic replaceable leaf standing in for a trained classifier:
/// each text scores (positive hits - negative hits) / total hits, and the
/// batch score is the mean over texts that matched anything. Texts with no
/// lexicon hits are neutral and excluded from the mean.
pub struct LexiconSentiment;

impl LexiconSentiment {
    fn score_text(text: &str) -> Option<f64> {
        let mut positive = 0usize;
        let mut negative = 0usize;
        for word in text
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            if POSITIVE.contains(&word.as_str()) {
                positive += 1;
            } else if NEGATIVE.contains(&word.as_str()) {
                negative += 1;
            }
        }
        let hits = positive + negative;
        if hits == 0 {
            return None;
        }
        Some((positive as f64 - negative as f64) / hits as f64)
    }
}

impl SentimentModel for LexiconSentiment {
    fn score(&self, texts: &[String]) -> anyhow::Result<f64> {
        if texts.is_empty() {
            bail!("no texts to score");
        }
        let scores: Vec<f64> = texts.iter().filter_map(|t| Self::score_text(t)).collect();
        if scores.is_empty() {
            return Ok(0.0);
        }
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}
