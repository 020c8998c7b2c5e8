//! Transport seam consumed by the subscription engine.
//!
//! The engine needs exactly three capabilities from the underlying
//! at-most-once pub/sub layer: an inbound listener bound to a private
//! address, a request/reply exchange with a bounded timeout, and a
//! fire-and-forget publish. [`NatsTransport`] is the production adapter;
//! tests drive the engine through an in-memory implementation.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SubscriptionResult;

pub mod nats;

#[cfg(test)]
pub(crate) mod mock;

pub use nats::NatsTransport;

/// A raw inbound message delivered to a subscribed address.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Address the message was delivered to.
    pub subject: String,
    /// Undecoded payload bytes.
    pub payload: Vec<u8>,
}

/// A transport-level listener bound to one address.
///
/// Owned exclusively by one subscription's delivery task; dropping it or
/// calling [`unsubscribe`](InboundListener::unsubscribe) stops delivery.
#[async_trait]
pub trait InboundListener: Send {
    /// Next message for this listener, or `None` once delivery has ended.
    async fn next(&mut self) -> Option<RawMessage>;

    /// Stop delivery for this listener at the transport level.
    async fn unsubscribe(&mut self) -> SubscriptionResult<()>;
}

/// The at-most-once pub/sub transport under the streaming protocol.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Register a listener for all messages delivered to `address`.
    async fn subscribe(&self, address: &str) -> SubscriptionResult<Box<dyn InboundListener>>;

    /// Send a request and wait for a reply, failing after `timeout`.
    async fn request(
        &self,
        address: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> SubscriptionResult<Vec<u8>>;

    /// Publish a message without expecting a reply.
    async fn publish(&self, address: &str, payload: Vec<u8>) -> SubscriptionResult<()>;
}
