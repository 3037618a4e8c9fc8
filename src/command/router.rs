use crate::command::session::OperatorSession;
use crate::config::CommandsConfig;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A raw message record from the operator's chat surface
#[derive(Clone, Debug)]
pub struct ChatEvent {
    pub text: String,
    pub sender: String,
    pub channel: String,
    pub kind: String,
    pub from_bot: bool,
}

impl ChatEvent {
    /// A plain human-authored message
    pub fn message(
        text: impl Into<String>,
        sender: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
            channel: channel.into(),
            kind: "message".to_string(),
            from_bot: false,
        }
    }
}

/// The fixed set of operations a command name may resolve to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Target,
    Untarget,
    SetLog,
    ClearLog,
    Analyze,
    ShowLast,
}

impl CommandKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "help" => Some(Self::Help),
            "target" => Some(Self::Target),
            "untarget" => Some(Self::Untarget),
            "setlog" => Some(Self::SetLog),
            "clearlog" => Some(Self::ClearLog),
            "analyze" => Some(Self::Analyze),
            "showlast" => Some(Self::ShowLast),
            _ => None,
        }
    }

    /// Analysis-class commands are throttled against the session interval
    pub fn is_analysis(self) -> bool {
        matches!(self, CommandKind::Analyze)
    }
}

/// Command-table validation errors
#[derive(Debug, PartialEq)]
pub enum RouterError {
    /// A configured command name does not resolve to a known operation
    UnknownCommand(String),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::UnknownCommand(name) => {
                write!(f, "configured command '{}' is not a known operation", name)
            }
        }
    }
}

impl std::error::Error for RouterError {}

struct CommandEntry {
    kind: CommandKind,
    privileged: bool,
}

/// Decides whether an incoming text command executes, and runs it
///
/// Validity, recognition, privilege and throttling happen here; the session
/// only ever sees commands that are allowed to run.
pub struct CommandRouter {
    table: BTreeMap<String, CommandEntry>,
    privileged_user: String,
}

impl CommandRouter {
    /// Build the dispatch table from configuration
    ///
    /// Every configured name must resolve to a known operation so that a
    /// typo in the config fails at startup, not at dispatch time.
    pub fn new(commands: &CommandsConfig, privileged_user: &str) -> Result<Self, RouterError> {
        let mut table = BTreeMap::new();
        for (name, spec) in commands {
            let kind = CommandKind::from_name(name)
                .ok_or_else(|| RouterError::UnknownCommand(name.clone()))?;
            table.insert(
                name.clone(),
                CommandEntry {
                    kind,
                    privileged: spec.privileged,
                },
            );
        }
        Ok(Self {
            table,
            privileged_user: privileged_user.to_string(),
        })
    }

    /// Route one chat event, executing a recognized command on the session
    ///
    /// Non-message events and automated senders are ignored (loop
    /// prevention). Unrecognized first tokens are ordinary conversation,
    /// not errors. Unauthorized privileged commands are dropped with a log
    /// line and no reply, so the command surface is not leaked.
    pub async fn dispatch(&self, event: &ChatEvent, session: &Mutex<OperatorSession>) {
        if event.kind != "message" {
            debug!(kind = %event.kind, "ignoring non-message event");
            return;
        }
        if event.from_bot {
            debug!("ignoring event from automated sender");
            return;
        }

        let Some(first) = event.text.split_whitespace().next() else {
            return;
        };
        let name = first.to_lowercase();
        let Some(entry) = self.table.get(&name) else {
            debug!(sender = %event.sender, channel = %event.channel, "not a command, ignored");
            return;
        };

        if entry.privileged && event.sender != self.privileged_user {
            warn!(
                command = %name,
                sender = %event.sender,
                "unauthorized command dropped"
            );
            return;
        }

        if entry.kind.is_analysis() {
            let remaining = session.lock().await.throttle_remaining();
            if remaining > Duration::ZERO {
                info!(command = %name, remaining = ?remaining, "throttling analysis command");
                tokio::time::sleep(remaining).await;
            }
        }

        let text = event.text.to_lowercase();
        let mut session = session.lock().await;
        session
            .execute(entry.kind, &text, &event.sender, &event.channel)
            .await;
    }
}
