use crate::bus::BusError;
use crate::config::BrokerConfig;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Connection state as seen by this layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// One physical connection to the message bus
///
/// Connect/disconnect acknowledgements arrive asynchronously through the
/// transport's event callback and are logged, not propagated. Reconnection
/// after a lost keep-alive is the transport client's own policy; this layer
/// only defines the callback contract.
pub struct BusClient {
    client: async_nats::Client,
    client_id: String,
}

impl BusClient {
    /// Connect to the bus with the broker's credentials
    ///
    /// Failure here is the only connection error that propagates; callers at
    /// process start treat it as fatal.
    pub async fn connect(client_id: &str, broker: &BrokerConfig) -> Result<Self, BusError> {
        info!(client_id = %client_id, url = %broker.url(), "connecting to message bus");

        let id = client_id.to_string();
        let client = async_nats::ConnectOptions::new()
            .name(client_id)
            .user_and_password(broker.username.clone(), broker.password.clone())
            .ping_interval(Duration::from_secs(broker.keepalive_secs))
            .event_callback(move |event| {
                let client_id = id.clone();
                async move {
                    match event {
                        async_nats::Event::Connected => {
                            info!(client_id = %client_id, "connected to message bus");
                        }
                        async_nats::Event::Disconnected => {
                            warn!(client_id = %client_id, "disconnected from message bus");
                        }
                        async_nats::Event::ClientError(err) => {
                            error!(client_id = %client_id, error = %err, "bus client error");
                        }
                        event => {
                            debug!(client_id = %client_id, event = %event, "bus connection event");
                        }
                    }
                }
            })
            .connect(broker.url())
            .await
            .map_err(|e| BusError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            client_id: client_id.to_string(),
        })
    }

    /// Get the underlying transport client
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn state(&self) -> ConnectionState {
        match self.client.connection_state() {
            async_nats::connection::State::Pending => ConnectionState::Connecting,
            async_nats::connection::State::Connected => ConnectionState::Connected,
            async_nats::connection::State::Disconnected => ConnectionState::Disconnected,
        }
    }

    /// Flush pending messages and release the connection
    ///
    /// Idempotent: safe to call on an already-disconnected client. Transport
    /// errors are logged, never returned.
    pub async fn disconnect(&self) {
        if let Err(err) = self.client.flush().await {
            debug!(client_id = %self.client_id, error = %err, "flush on disconnect failed");
        }
        if let Err(err) = self.client.drain().await {
            debug!(client_id = %self.client_id, error = %err, "drain on disconnect failed");
        }
        info!(client_id = %self.client_id, "released bus connection");
    }
}
