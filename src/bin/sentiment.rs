use anyhow::{Context, Result};
use pulse::bus::{Publisher, Subscriber};
use pulse::config::PulseConfig;
use pulse::sentiment::{LexiconSentiment, RedditScraper, SentimentHandler, TextScraper};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=info".into()),
        )
        .init();

    info!("pulse sentiment worker starting...");

    let config = PulseConfig::load().context("failed to load configuration")?;

    // Sources are optional: only those with credentials configured run.
    let mut scrapers: Vec<(String, Box<dyn TextScraper>)> = Vec::new();
    match std::env::var("PULSE_REDDIT_USER_AGENT") {
        Ok(user_agent) => {
            scrapers.push(("reddit".to_string(), Box::new(RedditScraper::new(user_agent))));
        }
        Err(_) => info!("PULSE_REDDIT_USER_AGENT not set, reddit source disabled"),
    }

    let publisher = Publisher::connect("pulse-sentiment-pub", &config.broker)
        .await
        .context("failed to connect publisher")?;

    let handler = SentimentHandler::new(
        scrapers,
        Box::new(LexiconSentiment),
        Arc::new(publisher),
        config.topics.scores.clone(),
        config.operator.data_dir.clone(),
    );

    let mut subscriber = Subscriber::connect(
        "pulse-sentiment-sub",
        &config.broker,
        &config.topics.sentiment_work,
    )
    .await
    .context("failed to connect subscriber")?;
    subscriber.add_handler(Box::new(handler));

    info!(
        work_topic = %config.topics.sentiment_work,
        reply_topic = %config.topics.scores,
        "pulse sentiment worker running"
    );

    subscriber.run().await?;
    Ok(())
}
