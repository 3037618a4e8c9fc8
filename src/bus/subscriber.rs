use crate::bus::client::BusClient;
use crate::bus::envelope::Envelope;
use crate::bus::BusError;
use crate::config::BrokerConfig;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// A consumer of decoded bus traffic on one topic
#[async_trait]
pub trait MessageHandler: Send {
    async fn on_envelope(&mut self, envelope: &Envelope) -> anyhow::Result<()>;
}

/// Stops a running subscriber from another task
#[derive(Clone)]
pub struct SubscriberHandle {
    shutdown: Arc<Notify>,
}

impl SubscriberHandle {
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }
}

/// Bus subscriber
///
/// Receives envelopes on one topic and fans them out to the registered
/// handlers, in registration order, synchronously. The receive loop is the
/// sole driver of downstream processing in a worker process; a handler that
/// blocks delays delivery to the next handler and to future messages.
pub struct Subscriber {
    client: BusClient,
    topic: String,
    handlers: Vec<Box<dyn MessageHandler>>,
    shutdown: Arc<Notify>,
}

impl Subscriber {
    /// Connect with no handlers; handlers may be registered before `run()`
    pub async fn connect(
        client_id: &str,
        broker: &BrokerConfig,
        topic: impl Into<String>,
    ) -> Result<Self, BusError> {
        let client = BusClient::connect(client_id, broker).await?;
        Ok(Self {
            client,
            topic: topic.into(),
            handlers: Vec::new(),
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Append a handler; dispatch order is registration order
    pub fn add_handler(&mut self, handler: Box<dyn MessageHandler>) {
        self.handlers.push(handler);
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn handle(&self) -> SubscriberHandle {
        SubscriberHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Subscribe and dispatch until the stream ends or `handle().stop()`
    ///
    /// Blocks the calling task. On stop, unsubscribes and releases the
    /// connection.
    pub async fn run(mut self) -> Result<(), BusError> {
        let mut subscription = self
            .client
            .client()
            .subscribe(self.topic.clone())
            .await
            .map_err(|e| BusError::Connection(e.to_string()))?;

        info!(client_id = %self.client.client_id(), topic = %self.topic, "subscribed");

        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                message = subscription.next() => {
                    match message {
                        Some(message) => {
                            let envelope = Envelope::new(self.topic.clone(), message.payload.to_vec());
                            debug!(
                                topic = %envelope.topic,
                                bytes = envelope.payload.len(),
                                "received message"
                            );
                            dispatch(&mut self.handlers, &envelope).await;
                        }
                        None => {
                            warn!(topic = %self.topic, "subscription stream ended");
                            break;
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!(topic = %self.topic, "stopping subscriber");
                    if let Err(err) = subscription.unsubscribe().await {
                        warn!(topic = %self.topic, error = %err, "unsubscribe failed");
                    }
                    break;
                }
            }
        }

        self.client.disconnect().await;
        Ok(())
    }
}

/// Fan one envelope out to every handler, in order
///
/// A failing handler is logged and must not prevent delivery to subsequent
/// handlers or future messages.
async fn dispatch(handlers: &mut [Box<dyn MessageHandler>], envelope: &Envelope) {
    for handler in handlers.iter_mut() {
        if let Err(err) = handler.on_envelope(envelope).await {
            error!(topic = %envelope.topic, error = %err, "message handler failed");
        }
    }
}
