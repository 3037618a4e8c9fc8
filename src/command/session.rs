use crate::bus::{Envelope, EnvelopeSink};
use crate::chat::ChatClient;
use crate::command::router::CommandKind;
use crate::config::{CommandsConfig, PulseConfig};
use crate::protocol::{ScoreUpdate, WireMessage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Session state and operations of the operator-facing service
///
/// Holds the tracked-symbol set, the designated output channel and the
/// last-analysis stamp. Shared behind a mutex by the chat-command loop and
/// the subscribe loop; only command-handling methods mutate it.
pub struct OperatorSession {
    chat: Arc<dyn ChatClient>,
    sink: Arc<dyn EnvelopeSink>,
    stats_topic: String,
    supported: Vec<String>,
    help_text: String,
    data_dir: PathBuf,
    min_interval: Duration,
    targets: Vec<String>,
    log_channel: Option<String>,
    last_analysis: Option<Instant>,
}

impl OperatorSession {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        sink: Arc<dyn EnvelopeSink>,
        config: &PulseConfig,
    ) -> Self {
        Self {
            chat,
            sink,
            stats_topic: config.topics.stats_work.clone(),
            supported: config.operator.supported_symbols.clone(),
            help_text: build_help(&config.commands, &config.operator.supported_symbols),
            data_dir: PathBuf::from(&config.operator.data_dir),
            min_interval: Duration::from_secs(config.operator.min_interval_secs),
            targets: Vec::new(),
            log_channel: None,
            last_analysis: None,
        }
    }

    /// Run an already-authorized command
    pub async fn execute(&mut self, kind: CommandKind, text: &str, sender: &str, channel: &str) {
        debug!(command = ?kind, sender = %sender, channel = %channel, "executing command");
        match kind {
            CommandKind::Help => self.help(text, channel).await,
            CommandKind::Target => self.target(text, channel).await,
            CommandKind::Untarget => self.untarget(text, channel).await,
            CommandKind::SetLog => self.set_log(channel).await,
            CommandKind::ClearLog => self.clear_log(channel).await,
            CommandKind::Analyze => self.analyze(text, channel).await,
            CommandKind::ShowLast => self.show_last(channel).await,
        }
    }

    async fn help(&self, text: &str, channel: &str) {
        if text.trim() == "help" {
            self.post(channel, &self.help_text).await;
        } else {
            self.post(channel, "Invalid command, do you mean \"help\"?")
                .await;
        }
    }

    async fn target(&mut self, text: &str, channel: &str) {
        let symbols: Vec<String> = text
            .split_whitespace()
            .skip(1)
            .map(|s| s.to_uppercase())
            .collect();
        if symbols.is_empty() {
            self.post(channel, "No symbol specified, ignored the target command.")
                .await;
            return;
        }

        let mut changed = false;
        for symbol in symbols {
            if !self.supported.contains(&symbol) {
                self.post(channel, &format!("{} is not supported, skipped.", symbol))
                    .await;
            } else if self.targets.contains(&symbol) {
                self.post(channel, &format!("{} is already tracked, skipped.", symbol))
                    .await;
            } else {
                info!(symbol = %symbol, "tracking symbol");
                self.targets.push(symbol);
                changed = true;
            }
        }

        if changed {
            let summary = format!("Targets updated: {}.", self.targets.join(", "));
            self.post(channel, &summary).await;
        }
    }

    async fn untarget(&mut self, text: &str, channel: &str) {
        let symbols: Vec<String> = text
            .split_whitespace()
            .skip(1)
            .map(|s| s.to_uppercase())
            .collect();
        if symbols.is_empty() {
            self.post(channel, "No symbol specified, ignored the untarget command.")
                .await;
            return;
        }

        let mut changed = false;
        for symbol in symbols {
            match self.targets.iter().position(|t| *t == symbol) {
                Some(index) => {
                    info!(symbol = %symbol, "no longer tracking symbol");
                    self.targets.remove(index);
                    changed = true;
                }
                None => {
                    self.post(channel, &format!("{} is not tracked, skipped.", symbol))
                        .await;
                }
            }
        }

        if changed {
            let summary = if self.targets.is_empty() {
                "Targets updated: none.".to_string()
            } else {
                format!("Targets updated: {}.", self.targets.join(", "))
            };
            self.post(channel, &summary).await;
        }
    }

    async fn set_log(&mut self, channel: &str) {
        info!(from = ?self.log_channel, to = %channel, "switching log channel");
        self.log_channel = Some(channel.to_string());
        self.post(channel, "This channel now receives analysis results.")
            .await;
    }

    async fn clear_log(&mut self, channel: &str) {
        info!(from = ?self.log_channel, "clearing log channel");
        self.log_channel = None;
        self.post(channel, "Analysis results are no longer posted.")
            .await;
    }

    /// Start an analysis cycle over the tracked set
    ///
    /// Fire-and-forget: the request is published on the stats work topic
    /// and the reply arrives later on the scores topic, handled by
    /// `ScoreLogHandler`. The throttle interval is enforced by the router
    /// before this method runs.
    async fn analyze(&mut self, text: &str, channel: &str) {
        if text.trim() != "analyze" {
            self.post(channel, "Invalid command, do you mean \"analyze\"?")
                .await;
            return;
        }
        if self.targets.is_empty() {
            self.post(channel, "No targets set, run `target <SYMBOL>` first.")
                .await;
            return;
        }

        let update = ScoreUpdate::request(self.targets.iter().cloned());
        info!(
            request_id = ?update.request_id,
            targets = ?self.targets,
            "starting analysis cycle"
        );
        match Envelope::encode(&self.stats_topic, &WireMessage::Scores(update)) {
            Ok(envelope) => {
                self.sink.send(envelope);
                self.last_analysis = Some(Instant::now());
            }
            Err(err) => warn!(error = %err, "failed to encode analysis request"),
        }
    }

    async fn show_last(&self, channel: &str) {
        if self.targets.is_empty() {
            self.post(channel, "No targets set, nothing to show.").await;
            return;
        }
        for target in &self.targets {
            let path = self.data_dir.join(format!("{}_last_vis.png", target));
            let title = format!("{} last forecast", target);
            if let Err(err) = self.chat.post_attachment(channel, &title, &path).await {
                warn!(channel = %channel, path = %path.display(), error = %err, "failed to post artifact");
            }
        }
    }

    /// Render a finished analysis cycle into the log channel
    pub async fn log_scores(&self, update: &ScoreUpdate) {
        for (symbol, analyzers) in &update.scores {
            let mut line = format!("{}:", symbol);
            for (analyzer, score) in analyzers {
                line.push_str(&format!(" {} {:.3}", analyzer, score));
            }
            info!(request_id = ?update.request_id, "{}", line);
            if let Some(channel) = &self.log_channel {
                self.post(channel, &line).await;
            }
        }
    }

    /// Deliver a worker-generated artifact to the log channel
    pub async fn post_artifact(&self, title: &str, path: &Path) {
        let Some(channel) = &self.log_channel else {
            info!(title = %title, "no log channel designated, artifact not posted");
            return;
        };
        if let Err(err) = self.chat.post_attachment(channel, title, path).await {
            warn!(channel = %channel, path = %path.display(), error = %err, "failed to post artifact");
        }
    }

    /// Time left before the next analysis command may run
    pub fn throttle_remaining(&self) -> Duration {
        match self.last_analysis {
            Some(at) => self.min_interval.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn log_channel(&self) -> Option<&str> {
        self.log_channel.as_deref()
    }

    async fn post(&self, channel: &str, text: &str) {
        if let Err(err) = self.chat.post_message(channel, text).await {
            warn!(channel = %channel, error = %err, "failed to post chat message");
        }
    }
}

fn build_help(commands: &CommandsConfig, supported: &[String]) -> String {
    let mut text = String::from("Available commands are the following:\n");
    for (name, spec) in commands {
        text.push_str(&format!("\t- {}: {}\n", name, spec.description));
    }
    text.push_str("Supported symbols are the following:\n");
    for symbol in supported {
        text.push_str(&format!("\t- {}\n", symbol));
    }
    text
}
