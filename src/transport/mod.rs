//! Transport abstraction for the pub/sub bus.
//!
//! The broker client is consumed as a black box behind the [`Transport`]
//! trait: connect with a last-will registration, subscribe to topics,
//! publish payloads (optionally retained), and receive inbound messages on
//! a handle the bridge's router drains. Delivery is assumed at-least-once;
//! per-topic inbound ordering is preserved by implementations.
//!
//! # Architecture
//!
//! ```text
//! Transport (trait)
//!     │
//!     └── memory::LoopbackTransport
//!         └── In-process broker for tests and the demo binary
//! ```
//!
//! Incoming messages surface through a receiver obtained once via
//! [`Transport::take_incoming`]; whatever task drains it is the "receive
//! callback context" of the concurrency model, and must not touch the live
//! model directly.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Session options passed to [`Transport::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Broker address (scheme and meaning are implementation-defined).
    pub address: String,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Topic the broker publishes on ungraceful disconnect.
    pub last_will_topic: String,
    /// Payload of the last-will message.
    pub last_will_payload: String,
    /// Whether the last-will message is retained.
    pub last_will_retain: bool,
}

/// A message received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Topic the message arrived on.
    pub topic: String,
    /// Raw payload.
    pub payload: String,
}

/// Errors that can occur during transport operations.
#[derive(Debug)]
pub enum TransportError {
    /// Failed to establish the session.
    ConnectionFailed(String),
    /// Failed to subscribe.
    SubscribeFailed(String),
    /// Failed to publish.
    PublishFailed(String),
    /// Operation attempted without a connected session.
    NotConnected,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed(msg) => write!(f, "connection failed: {msg}"),
            Self::SubscribeFailed(msg) => write!(f, "subscribe failed: {msg}"),
            Self::PublishFailed(msg) => write!(f, "publish failed: {msg}"),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

impl std::error::Error for TransportError {}

/// A black-box pub/sub client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the session, registering the last-will message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionFailed`] if the session cannot
    /// be established.
    async fn connect(&self, options: ConnectOptions) -> Result<(), TransportError>;

    /// Subscribe to the given topics.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::SubscribeFailed`] or
    /// [`TransportError::NotConnected`].
    async fn subscribe(&self, topics: &[String]) -> Result<(), TransportError>;

    /// Publish a payload on a topic.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::PublishFailed`] or
    /// [`TransportError::NotConnected`].
    async fn publish(&self, topic: &str, payload: &str, retain: bool)
        -> Result<(), TransportError>;

    /// Whether a session is currently established.
    fn is_connected(&self) -> bool;

    /// Take the inbound message receiver.
    ///
    /// Yields `Some` exactly once; the caller owns the receive side from
    /// then on.
    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<IncomingMessage>>;
}
