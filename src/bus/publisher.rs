use crate::bus::client::BusClient;
use crate::bus::envelope::Envelope;
use crate::bus::BusError;
use crate::config::BrokerConfig;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Somewhere to publish envelopes
///
/// The one seam between command/worker logic and the transport: production
/// code hands components a `Publisher`, tests hand them a capture sink.
pub trait EnvelopeSink: Send + Sync {
    fn send(&self, envelope: Envelope);
}

/// Bus publisher
///
/// Runs its own send loop so publishing never blocks the caller. Publishing
/// is fire-and-forget: there is no ack tracking and no retry buffer; a
/// failed send is logged and dropped.
#[derive(Clone)]
pub struct Publisher {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Publisher {
    /// Connect and spawn the send loop
    pub async fn connect(client_id: &str, broker: &BrokerConfig) -> Result<Self, BusError> {
        let client = BusClient::connect(client_id, broker).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(send_loop(client, rx));
        Ok(Self { tx })
    }

    /// Enqueue an envelope for the send loop
    ///
    /// Never blocks and never surfaces transport errors; outcome is logged
    /// by the loop.
    pub fn publish(&self, envelope: Envelope) {
        if self.tx.send(envelope).is_err() {
            error!("publisher send loop has stopped, message dropped");
        }
    }
}

impl EnvelopeSink for Publisher {
    fn send(&self, envelope: Envelope) {
        self.publish(envelope);
    }
}

/// Drains the outbound queue until every `Publisher` clone is dropped, then
/// releases the connection.
async fn send_loop(client: BusClient, mut rx: mpsc::UnboundedReceiver<Envelope>) {
    while let Some(envelope) = rx.recv().await {
        match client
            .client()
            .publish(envelope.topic.clone(), envelope.payload.into())
            .await
        {
            Ok(()) => {
                debug!(
                    client_id = %client.client_id(),
                    topic = %envelope.topic,
                    "published message"
                );
            }
            Err(err) => {
                error!(
                    client_id = %client.client_id(),
                    topic = %envelope.topic,
                    error = %err,
                    "failed to publish message"
                );
            }
        }
    }
    client.disconnect().await;
}
