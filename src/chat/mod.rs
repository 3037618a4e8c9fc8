use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// Narrow surface of the chat platform the operator service talks to
///
/// Delivery details (Slack, Matrix, ...) live behind this port; the core
/// only posts text and file artifacts.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()>;

    async fn post_attachment(&self, channel: &str, title: &str, path: &Path)
        -> anyhow::Result<()>;
}

/// Chat client that writes to the log instead of a chat platform
///
/// Used when no platform is wired in (local runs, worker-only deployments).
pub struct LogChat;

#[async_trait]
impl ChatClient for LogChat {
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        info!(channel = %channel, text = %text, "chat message");
        Ok(())
    }

    async fn post_attachment(
        &self,
        channel: &str,
        title: &str,
        path: &Path,
    ) -> anyhow::Result<()> {
        info!(channel = %channel, title = %title, path = %path.display(), "chat attachment");
        Ok(())
    }
}
