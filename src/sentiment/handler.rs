use crate::bus::{Envelope, EnvelopeSink, MessageHandler};
use crate::cache::DailyCache;
use crate::protocol::{Args, ScoreUpdate, WireMessage};
use crate::sentiment::{SentimentModel, TextScraper};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Inbound handler of the sentiment worker
///
/// Consumes the sentiment work topic: score updates gain one score per
/// text source that produced any material for a symbol; `tcommand` side
/// tasks run locally; anything else passes through to the reply topic.
///
/// Scrapers are a named list so deployments can run with any subset of
/// sources configured.
pub struct SentimentHandler {
    scrapers: Vec<(String, Box<dyn TextScraper>)>,
    model: Box<dyn SentimentModel>,
    sink: Arc<dyn EnvelopeSink>,
    reply_topic: String,
    cache: DailyCache<BTreeMap<String, f64>>,
    data_dir: PathBuf,
}

impl SentimentHandler {
    pub fn new(
        scrapers: Vec<(String, Box<dyn TextScraper>)>,
        model: Box<dyn SentimentModel>,
        sink: Arc<dyn EnvelopeSink>,
        reply_topic: impl Into<String>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scrapers,
            model,
            sink,
            reply_topic: reply_topic.into(),
            cache: DailyCache::new(),
            data_dir: data_dir.into(),
        }
    }

    /// Fill in per-source sentiment scores for every symbol of the update
    ///
    /// The whole per-symbol score map is cached per day, so a symbol
    /// analyzed twice on one day is neither rescraped nor rescored.
    pub(crate) async fn enrich(
        &self,
        update: &mut ScoreUpdate,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let symbols = update.symbols();
        let uncached: Vec<String> = symbols
            .iter()
            .filter(|s| self.cache.get(s, today).is_none())
            .cloned()
            .collect();

        let mut scraped: Vec<(&str, HashMap<String, Vec<String>>)> = Vec::new();
        if !uncached.is_empty() {
            for (source, scraper) in &self.scrapers {
                match scraper.scrape_targets(&uncached).await {
                    Ok(texts) => scraped.push((source, texts)),
                    // A dead source must not sink the whole cycle.
                    Err(err) => {
                        warn!(source = %source, error = %err, "scrape failed, source skipped");
                    }
                }
            }
        }

        for symbol in &symbols {
            let scores = match self.cache.get(symbol, today) {
                Some(scores) => {
                    debug!(symbol = %symbol, "serving cached sentiment");
                    scores
                }
                None => {
                    let mut scores = BTreeMap::new();
                    for (source, texts) in &scraped {
                        let Some(texts) = texts.get(symbol).filter(|t| !t.is_empty()) else {
                            continue;
                        };
                        match self.model.score(texts) {
                            Ok(score) => {
                                info!(symbol = %symbol, source = %source, score, "scored texts");
                                scores.insert(source.to_string(), score);
                            }
                            Err(err) => {
                                warn!(symbol = %symbol, source = %source, error = %err, "scoring failed");
                            }
                        }
                    }
                    // Only a non-empty result counts as computed; a symbol
                    // with no material today may still get some later.
                    if !scores.is_empty() {
                        self.cache.insert(symbol, today, scores.clone());
                    }
                    scores
                }
            };
            if let Some(analyzers) = update.scores.get_mut(symbol) {
                analyzers.extend(scores);
            }
        }
        Ok(())
    }

    fn run_task(&self, name: &str, args: &Args) -> anyhow::Result<()> {
        match name {
            "keyword" => {
                let Some(keyword) = args.get("keyword").and_then(|v| v.as_str()) else {
                    warn!("keyword task without a keyword, ignored");
                    return Ok(());
                };
                let path = self.data_dir.join(format!("{}.csv", keyword));
                let mut reply_args = Args::new();
                reply_args.insert("type".to_string(), "csv".into());
                reply_args.insert(
                    "path".to_string(),
                    path.to_string_lossy().into_owned().into(),
                );
                let reply = WireMessage::Command {
                    command: "post".to_string(),
                    args: reply_args,
                };
                self.sink.send(Envelope::encode(&self.reply_topic, &reply)?);
                Ok(())
            }
            other => {
                warn!(task = %other, "unknown sentiment task, ignored");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl MessageHandler for SentimentHandler {
    async fn on_envelope(&mut self, envelope: &Envelope) -> anyhow::Result<()> {
        let message: WireMessage = envelope.decode()?;
        match message {
            WireMessage::Scores(mut update) => {
                let today = Utc::now().date_naive();
                self.enrich(&mut update, today).await?;
                self.sink
                    .send(Envelope::encode(&self.reply_topic, &WireMessage::Scores(update))?);
            }
            WireMessage::SentimentTask { tcommand, args } => {
                self.run_task(&tcommand, &args)?;
            }
            other => {
                debug!(topic = %envelope.topic, "passing message through");
                self.sink.send(Envelope::encode(&self.reply_topic, &other)?);
            }
        }
        Ok(())
    }
}
