use anyhow::{Context, Result};
use pulse::bus::{Publisher, Subscriber};
use pulse::chat::{ChatClient, LogChat};
use pulse::command::{CommandEnvelopeHandler, CommandRouter, OperatorSession, ScoreLogHandler};
use pulse::config::PulseConfig;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=info".into()),
        )
        .init();

    info!("pulse operator starting...");

    let config = PulseConfig::load().context("failed to load configuration")?;

    let router = Arc::new(
        CommandRouter::new(&config.commands, &config.operator.privileged_user)
            .context("invalid command table")?,
    );

    let publisher = Publisher::connect("pulse-operator-pub", &config.broker)
        .await
        .context("failed to connect publisher")?;
    let chat: Arc<dyn ChatClient> = Arc::new(LogChat);
    let session = Arc::new(Mutex::new(OperatorSession::new(
        chat,
        Arc::new(publisher),
        &config,
    )));

    // Subscribe first, then wire up the consumers.
    let mut scores = Subscriber::connect("pulse-operator-scores", &config.broker, &config.topics.scores)
        .await
        .context("failed to connect scores subscriber")?;
    scores.add_handler(Box::new(ScoreLogHandler::new(session.clone())));

    let mut intake = Subscriber::connect("pulse-operator-intake", &config.broker, &config.topics.intake)
        .await
        .context("failed to connect intake subscriber")?;
    intake.add_handler(Box::new(CommandEnvelopeHandler::new(router, session)));

    info!(
        scores_topic = %config.topics.scores,
        intake_topic = %config.topics.intake,
        "pulse operator running"
    );

    tokio::try_join!(scores.run(), intake.run())?;
    Ok(())
}
