// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Notification Messaging
//!
//! Outbound broker plumbing for ledger notifications.
//!
//! - [`reconnecting::ReconnectingPublisher`] owns the process-wide connection
//!   and a background supervisor that rebuilds it with [`backoff`].
//! - [`amqp::AmqpConnector`] declares the exchange/queue topology and opens
//!   confirm-mode channels on a RabbitMQ-compatible broker.
//!
//! The connector/link split keeps the reconnect state machine independent of
//! the wire protocol, so tests drive it with in-process fakes.

pub mod amqp;
pub mod backoff;
pub mod reconnecting;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub use amqp::AmqpConnector;
pub use backoff::{BackoffPolicy, ExponentialBackoff};
pub use reconnecting::{ConnectionStatus, ReconnectingPublisher};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to serialize notification: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No broker connection available after waiting {0:?}")]
    NotConnected(Duration),

    #[error("Broker reconnect campaign exhausted; a new campaign has been started")]
    ReconnectExhausted,

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Broker did not confirm the message within {0:?}")]
    SendTimeout(Duration),

    #[error("Broker negatively acknowledged the message")]
    Nacked,

    #[error("Publisher is closed")]
    Closed,
}

impl PublishError {
    /// Whether the failure means the connection itself is gone
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, PublishError::Broker(_) | PublishError::SendTimeout(_))
    }
}

/// Opens links to the broker.
///
/// `lost` must be notified by the implementation when an established link
/// dies outside of a `send` call (heartbeat timeout, broker shutdown).
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(&self, lost: Arc<Notify>) -> Result<Arc<dyn BrokerLink>, PublishError>;
}

/// One established broker connection ready to publish
#[async_trait]
pub trait BrokerLink: Send + Sync {
    /// Send a payload and wait for the broker to accept it
    async fn send(&self, payload: &[u8]) -> Result<(), PublishError>;

    fn is_open(&self) -> bool;

    async fn close(&self);
}
