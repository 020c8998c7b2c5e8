//! In-memory transport used by the engine tests.
//!
//! Requests are answered by scripted responders keyed by address, publishes
//! are recorded for inspection, and listeners are backed by unbounded
//! channels so tests can inject deliveries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{SubscriptionError, SubscriptionResult};
use crate::transport::{InboundListener, RawMessage, Transport};

type Responder = Box<dyn Fn(Vec<u8>) -> SubscriptionResult<Vec<u8>> + Send + Sync>;
type ListenerMap = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<RawMessage>>>>;

pub(crate) struct MockTransport {
    listeners: ListenerMap,
    responders: Mutex<HashMap<String, Responder>>,
    request_log: Mutex<Vec<String>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
    fail_publish: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: Arc::new(Mutex::new(HashMap::new())),
            responders: Mutex::new(HashMap::new()),
            request_log: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            fail_publish: AtomicBool::new(false),
        })
    }

    /// Script the reply for requests to `address`.
    pub(crate) fn respond_with(
        &self,
        address: &str,
        responder: impl Fn(Vec<u8>) -> SubscriptionResult<Vec<u8>> + Send + Sync + 'static,
    ) {
        self.responders
            .lock()
            .unwrap()
            .insert(address.to_string(), Box::new(responder));
    }

    /// Inject a delivery for the listener bound to `address`.
    /// Returns false if no listener is bound.
    pub(crate) fn deliver(&self, address: &str, payload: Vec<u8>) -> bool {
        let listeners = self.listeners.lock().unwrap();
        match listeners.get(address) {
            Some(sender) => sender
                .send(RawMessage {
                    subject: address.to_string(),
                    payload,
                })
                .is_ok(),
            None => false,
        }
    }

    /// Snapshot of all recorded publishes as (address, payload) pairs.
    pub(crate) fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    /// Number of requests issued to `address`.
    pub(crate) fn requests_to(&self, address: &str) -> usize {
        self.request_log
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.as_str() == address)
            .count()
    }

    /// Make subsequent publishes fail with a transport error.
    pub(crate) fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Returns true while a listener is bound to `address`.
    pub(crate) fn has_listener(&self, address: &str) -> bool {
        self.listeners.lock().unwrap().contains_key(address)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn subscribe(&self, address: &str) -> SubscriptionResult<Box<dyn InboundListener>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .unwrap()
            .insert(address.to_string(), sender);
        Ok(Box::new(MockListener {
            address: address.to_string(),
            receiver,
            listeners: Arc::clone(&self.listeners),
        }))
    }

    async fn request(
        &self,
        address: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> SubscriptionResult<Vec<u8>> {
        self.request_log.lock().unwrap().push(address.to_string());
        let responders = self.responders.lock().unwrap();
        match responders.get(address) {
            Some(responder) => responder(payload),
            None => Err(SubscriptionError::Timeout(format!(
                "request to '{address}' timed out after {timeout:?}"
            ))),
        }
    }

    async fn publish(&self, address: &str, payload: Vec<u8>) -> SubscriptionResult<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(SubscriptionError::Transport(format!(
                "publish to '{address}' failed (mock)"
            )));
        }
        self.published
            .lock()
            .unwrap()
            .push((address.to_string(), payload));
        Ok(())
    }
}

struct MockListener {
    address: String,
    receiver: mpsc::UnboundedReceiver<RawMessage>,
    listeners: ListenerMap,
}

#[async_trait]
impl InboundListener for MockListener {
    async fn next(&mut self) -> Option<RawMessage> {
        self.receiver.recv().await
    }

    async fn unsubscribe(&mut self) -> SubscriptionResult<()> {
        self.listeners.lock().unwrap().remove(&self.address);
        self.receiver.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_reaches_listener() {
        let transport = MockTransport::new();
        let mut listener = transport.subscribe("inbox.1").await.unwrap();

        assert!(transport.deliver("inbox.1", b"hello".to_vec()));
        let msg = listener.next().await.unwrap();
        assert_eq!(msg.subject, "inbox.1");
        assert_eq!(msg.payload, b"hello");
    }

    #[tokio::test]
    async fn test_unsubscribe_unbinds_listener() {
        let transport = MockTransport::new();
        let mut listener = transport.subscribe("inbox.2").await.unwrap();
        assert!(transport.has_listener("inbox.2"));

        listener.unsubscribe().await.unwrap();
        assert!(!transport.has_listener("inbox.2"));
        assert!(!transport.deliver("inbox.2", b"late".to_vec()));
    }

    #[tokio::test]
    async fn test_unscripted_request_times_out() {
        let transport = MockTransport::new();
        let err = transport
            .request("nowhere", vec![], Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(transport.requests_to("nowhere"), 1);
    }

    #[tokio::test]
    async fn test_publish_recording_and_failure() {
        let transport = MockTransport::new();
        transport.publish("acks", b"ok".to_vec()).await.unwrap();
        assert_eq!(transport.published().len(), 1);

        transport.fail_publishes(true);
        let err = transport.publish("acks", b"no".to_vec()).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::Transport(_)));
        assert_eq!(transport.published().len(), 1);
    }
}
