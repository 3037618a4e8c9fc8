use anyhow::{Context, Result};
use pulse::bus::{Publisher, Subscriber};
use pulse::config::PulseConfig;
use pulse::market::{BinanceMarketData, DriftForecast, MarketHandler};
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

    info!("pulse statistics worker starting...");

    let config = PulseConfig::load().context("failed to load configuration")?;

    let publisher = Publisher::connect("pulse-stats-pub", &config.broker)
        .await
        .context("failed to connect publisher")?;

    let handler = MarketHandler::new(
        Box::new(BinanceMarketData::new(&config.analysis)),
        Box::new(DriftForecast::new(config.analysis.horizon_steps)),
        Arc::new(publisher),
        config.topics.sentiment_work.clone(),
        config.analysis.target_increase_pct,
        config.operator.data_dir.clone(),
    );

    let mut subscriber =
        Subscriber::connect("pulse-stats-sub", &config.broker, &config.topics.stats_work)
            .await
            .context("failed to connect subscriber")?;
    subscriber.add_handler(Box::new(handler));

    info!(
        work_topic = %config.topics.stats_work,
        reply_topic = %config.topics.sentiment_work,
        "pulse statistics worker running"
    );

    subscriber.run().await?;
    Ok(())
}
