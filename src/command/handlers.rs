use crate::bus::{Envelope, MessageHandler};
use crate::command::router::{ChatEvent, CommandRouter};
use crate::command::session::OperatorSession;
use crate::protocol::WireMessage;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Consumes the final scores topic for the operator service
///
/// Finished analysis cycles are rendered into the log channel; worker
/// artifact pointers (`{"command": "post", ...}`) are delivered as chat
/// attachments.
pub struct ScoreLogHandler {
    session: Arc<Mutex<OperatorSession>>,
}

impl ScoreLogHandler {
    pub fn new(session: Arc<Mutex<OperatorSession>>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl MessageHandler for ScoreLogHandler {
    async fn on_envelope(&mut self, envelope: &Envelope) -> anyhow::Result<()> {
        let message: WireMessage = envelope.decode()?;
        match message {
            WireMessage::Scores(update) => {
                self.session.lock().await.log_scores(&update).await;
            }
            WireMessage::Command { command, args } if command == "post" => {
                let title = args
                    .get("type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("artifact");
                let Some(path) = args.get("path").and_then(|v| v.as_str()) else {
                    warn!(topic = %envelope.topic, "post command without a path, ignored");
                    return Ok(());
                };
                self.session
                    .lock()
                    .await
                    .post_artifact(title, Path::new(path))
                    .await;
            }
            _ => {
                debug!(topic = %envelope.topic, "ignoring message");
            }
        }
        Ok(())
    }
}

/// Turns command envelopes on the intake topic into router dispatches
///
/// Lets upstream automation drive the operator session over the bus with
/// the same validity, privilege and throttle rules as chat input. The
/// sender and channel travel in `args`; an absent sender is treated as
/// unprivileged.
pub struct CommandEnvelopeHandler {
    router: Arc<CommandRouter>,
    session: Arc<Mutex<OperatorSession>>,
}

impl CommandEnvelopeHandler {
    pub fn new(router: Arc<CommandRouter>, session: Arc<Mutex<OperatorSession>>) -> Self {
        Self { router, session }
    }
}

#[async_trait]
impl MessageHandler for CommandEnvelopeHandler {
    async fn on_envelope(&mut self, envelope: &Envelope) -> anyhow::Result<()> {
        let message: WireMessage = envelope.decode()?;
        let WireMessage::Command { command, args } = message else {
            debug!(topic = %envelope.topic, "ignoring non-command message");
            return Ok(());
        };

        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or(&command)
            .to_string();
        let sender = args
            .get("user")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let channel = args
            .get("channel")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let event = ChatEvent::message(text, sender, channel);
        self.router.dispatch(&event, &self.session).await;
        Ok(())
    }
}
