use crate::bus::{Envelope, EnvelopeSink, MessageHandler};
use crate::cache::DailyCache;
use crate::market::scoring::signal_score;
use crate::market::{ForecastEngine, MarketDataSource};
use crate::protocol::{Args, ScoreUpdate, WireMessage};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Analyzer name this worker writes into the score mapping
const ANALYZER: &str = "stats";

/// Inbound handler of the statistics worker
///
/// Consumes the stats work topic: score updates are enriched with one
/// signal per symbol and republished on the reply topic; `scommand` side
/// tasks run locally; anything else passes through unchanged so the chain
/// keeps flowing.
pub struct MarketHandler {
    market: Box<dyn MarketDataSource>,
    engine: Box<dyn ForecastEngine>,
    sink: Arc<dyn EnvelopeSink>,
    reply_topic: String,
    cache: DailyCache<f64>,
    target_increase_pct: f64,
    data_dir: PathBuf,
}

impl MarketHandler {
    pub fn new(
        market: Box<dyn MarketDataSource>,
        engine: Box<dyn ForecastEngine>,
        sink: Arc<dyn EnvelopeSink>,
        reply_topic: impl Into<String>,
        target_increase_pct: f64,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            market,
            engine,
            sink,
            reply_topic: reply_topic.into(),
            cache: DailyCache::new(),
            target_increase_pct,
            data_dir: data_dir.into(),
        }
    }

    /// Fill in the `stats` score for every symbol of the update
    ///
    /// Scores already computed today are served from the cache; the market
    /// source is queried only for the remainder.
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

        let fetched = if uncached.is_empty() {
            Default::default()
        } else {
            self.market.query(&uncached).await?
        };

        for symbol in &symbols {
            let score = match self.cache.get(symbol, today) {
                Some(score) => {
                    debug!(symbol = %symbol, score, "serving cached signal");
                    score
                }
                None => {
                    let Some(series) = fetched.get(symbol) else {
                        warn!(symbol = %symbol, "no price data returned, skipping");
                        continue;
                    };
                    let (Some(min), Some(max), Some(current)) =
                        (series.min_close(), series.max_close(), series.last_close())
                    else {
                        warn!(symbol = %symbol, "empty price series, skipping");
                        continue;
                    };
                    let forecast = self.engine.forecast(symbol, series)?;
                    let score = signal_score(
                        min,
                        max,
                        current,
                        forecast.max,
                        forecast.min,
                        self.target_increase_pct,
                    );
                    info!(symbol = %symbol, score, "computed signal");
                    self.cache.insert(symbol, today, score);
                    score
                }
            };
            if let Some(analyzers) = update.scores.get_mut(symbol) {
                analyzers.insert(ANALYZER.to_string(), score);
            }
        }
        Ok(())
    }

    fn run_task(&self, name: &str, _args: &Args, today: NaiveDate) -> anyhow::Result<()> {
        match name {
            "export" => self.export_scores(today),
            other => {
                warn!(task = %other, "unknown stats task, ignored");
                Ok(())
            }
        }
    }

    /// Dump today's cached signals to a CSV and announce the artifact
    fn export_scores(&self, today: NaiveDate) -> anyhow::Result<()> {
        let path = self.data_dir.join(format!("stats_scores_{}.csv", today));
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "symbol,score")?;
        for (symbol, score) in self.cache.entries_for(today) {
            writeln!(file, "{},{}", symbol, score)?;
        }
        info!(path = %path.display(), "exported scores");

        let mut args = Args::new();
        args.insert("type".to_string(), "csv".into());
        args.insert(
            "path".to_string(),
            path.to_string_lossy().into_owned().into(),
        );
        let reply = WireMessage::Command {
            command: "post".to_string(),
            args,
        };
        self.sink.send(Envelope::encode(&self.reply_topic, &reply)?);
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for MarketHandler {
    async fn on_envelope(&mut self, envelope: &Envelope) -> anyhow::Result<()> {
        let message: WireMessage = envelope.decode()?;
        let today = Utc::now().date_naive();
        match message {
            WireMessage::Scores(mut update) => {
                self.enrich(&mut update, today).await?;
                self.sink
                    .send(Envelope::encode(&self.reply_topic, &WireMessage::Scores(update))?);
            }
            WireMessage::StatsTask { scommand, args } => {
                self.run_task(&scommand, &args, today)?;
            }
            other => {
                debug!(topic = %envelope.topic, "passing message through");
                self.sink.send(Envelope::encode(&self.reply_topic, &other)?);
            }
        }
        Ok(())
    }
}
