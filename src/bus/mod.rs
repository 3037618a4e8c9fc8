// Message bus transport

mod client;
mod envelope;
mod publisher;
mod subscriber;

pub use client::{BusClient, ConnectionState};
pub use envelope::{BusError, Envelope};
pub use publisher::{EnvelopeSink, Publisher};
pub use subscriber::{MessageHandler, Subscriber, SubscriberHandle};
