// Text-sentiment worker: enriches analysis cycles with per-source
// sentiment scores derived from scraped text.

mod handler;
mod lexicon;
mod reddit;


pub use handler::SentimentHandler;
pub use lexicon::LexiconSentiment;
pub use reddit::RedditScraper;

use async_trait::async_trait;
use std::collections::HashMap;

/// Source of raw text per symbol (news site, social media, ...)
#[async_trait]
pub trait TextScraper: Send + Sync {
    /// Collect recent texts mentioning each symbol. Symbols with no
    /// matching text are simply absent from the result.
    async fn scrape_targets(
        &self,
        symbols: &[String],
    ) -> anyhow::Result<HashMap<String, Vec<String>>>;
}

/// Scores a batch of texts into a single sentiment value in [-1, 1]
pub trait SentimentModel: Send + Sync {
    fn score(&self, texts: &[String]) -> anyhow::Result<f64>;
}
