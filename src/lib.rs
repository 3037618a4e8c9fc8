// Message bus transport: client, envelope, publisher, subscriber
pub mod bus;

// Wire message schema shared by all services
pub mod protocol;

// Configuration
pub mod config;

// Command routing and the operator session
pub mod command;

// Per-entity, per-day result cache
pub mod cache;

// Market-statistics worker
pub mod market;

// Text-sentiment worker
pub mod sentiment;

// Chat platform port
pub mod chat;
