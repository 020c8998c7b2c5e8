//! NATS adapter for the transport seam.
//!
//! Wraps `async-nats` behind the [`Transport`] trait. Reconnection is
//! handled by async-nats internally; request timeouts are enforced here so
//! every caller gets the same typed `Timeout` error.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::error::{SubscriptionError, SubscriptionResult};
use crate::transport::{InboundListener, RawMessage, Transport};

/// Production transport backed by an `async-nats` client.
#[derive(Debug, Clone)]
pub struct NatsTransport {
    client: async_nats::Client,
}

impl NatsTransport {
    /// Wrap an already-connected NATS client.
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }

    /// Connect to a NATS server and wrap the resulting client.
    pub async fn connect(url: &str) -> SubscriptionResult<Self> {
        let client = async_nats::connect(url).await.map_err(|e| {
            SubscriptionError::Transport(format!("NATS connect to '{url}' failed: {e}"))
        })?;
        Ok(Self::new(client))
    }

    /// Returns a reference to the underlying NATS client.
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn subscribe(&self, address: &str) -> SubscriptionResult<Box<dyn InboundListener>> {
        let subscriber = self.client.subscribe(address.to_string()).await.map_err(|e| {
            SubscriptionError::Transport(format!("subscribe to '{address}' failed: {e}"))
        })?;
        debug!(address, "transport listener registered");
        Ok(Box::new(NatsListener { subscriber }))
    }

    async fn request(
        &self,
        address: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> SubscriptionResult<Vec<u8>> {
        let response = tokio::time::timeout(
            timeout,
            self.client.request(address.to_string(), payload.into()),
        )
        .await
        .map_err(|_| {
            SubscriptionError::Timeout(format!(
                "request to '{address}' timed out after {timeout:?}"
            ))
        })?
        .map_err(|e| SubscriptionError::Transport(format!("request to '{address}' failed: {e}")))?;

        Ok(response.payload.to_vec())
    }

    async fn publish(&self, address: &str, payload: Vec<u8>) -> SubscriptionResult<()> {
        self.client
            .publish(address.to_string(), payload.into())
            .await
            .map_err(|e| {
                SubscriptionError::Transport(format!("publish to '{address}' failed: {e}"))
            })
    }
}

struct NatsListener {
    subscriber: async_nats::Subscriber,
}

#[async_trait]
impl InboundListener for NatsListener {
    async fn next(&mut self) -> Option<RawMessage> {
        self.subscriber.next().await.map(|msg| RawMessage {
            subject: msg.subject.to_string(),
            payload: msg.payload.to_vec(),
        })
    }

    async fn unsubscribe(&mut self) -> SubscriptionResult<()> {
        self.subscriber.unsubscribe().await.map_err(|e| {
            SubscriptionError::Transport(format!("listener unsubscribe failed: {e}"))
        })
    }
}
