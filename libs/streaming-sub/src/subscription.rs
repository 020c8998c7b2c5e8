//! Subscription lifecycle, inbound dispatch, and acknowledgment.
//!
//! A subscription coordinates three actors: the delivery task feeding
//! inbound messages to user handlers, callers performing manual acks, and
//! explicit unsubscribe/dispose calls. Two synchronization domains keep
//! them apart:
//!
//! - a read/write lock over the hot per-message fields (handlers, ack
//!   inbox, connection reference, state), taken on the read side by every
//!   dispatch and manual ack and on the write side only by the handshake;
//! - a separate mutex guarding the close transition, so teardown runs at
//!   most once even when unsubscribe and dispose race.
//!
//! Neither lock is ever held across a handler invocation or a network
//! call: readers capture one consistent snapshot and release the lock
//! before doing I/O.

use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, RwLock, oneshot};
use tracing::{debug, warn};

use streaming_wire as wire;

use crate::config::{AckMode, StartAt, SubscriptionConfig};
use crate::connection::ConnectionHandle;
use crate::error::{SubscriptionError, SubscriptionResult};
use crate::message::StreamMessage;
use crate::subjects::Channel;
use crate::transport::{InboundListener, RawMessage};

/// User message handler. Handlers registered on one subscription are
/// invoked in registration order for every delivery.
pub type MessageHandler = Arc<dyn Fn(StreamMessage) -> BoxFuture<'static, ()> + Send + Sync>;

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Constructed but the handshake has not succeeded yet.
    Created,
    /// Handshake succeeded; deliveries flow and acks are legal.
    Active,
    /// Torn down; terminal.
    Closed,
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionState::Created => write!(f, "created"),
            SubscriptionState::Active => write!(f, "active"),
            SubscriptionState::Closed => write!(f, "closed"),
        }
    }
}

/// Hot fields read on every dispatch and manual ack.
///
/// Invariants: `ack_inbox` is non-empty iff `state` is `Active`;
/// `connection` is `Some` iff `state` is not `Closed`.
struct HotState {
    state: SubscriptionState,
    subject: String,
    queue_group: Option<String>,
    handlers: Vec<MessageHandler>,
    ack_inbox: String,
    connection: Option<Arc<ConnectionHandle>>,
    stop_delivery: Option<oneshot::Sender<()>>,
}

/// State shared between the public handle, the delivery task, and
/// in-flight message views.
pub(crate) struct SubscriptionShared {
    inbox: String,
    config: SubscriptionConfig,
    hot: RwLock<HotState>,
    /// Guards the close transition only; never held across the remote
    /// unsubscribe exchange.
    close_lock: Mutex<()>,
}

/// A live subscription to one logical subject.
///
/// Obtained from [`ConnectionHandle::subscribe`]. Dropping the handle of a
/// durable subscription triggers the same best-effort teardown as
/// [`dispose`](Subscription::dispose); plain subscriptions are left for
/// the owning connection and transport to reap.
pub struct Subscription {
    shared: Arc<SubscriptionShared>,
}

impl Subscription {
    pub(crate) fn new(connection: Arc<ConnectionHandle>, config: SubscriptionConfig) -> Self {
        let inbox = connection.new_inbox();
        Self {
            shared: Arc::new(SubscriptionShared {
                inbox,
                config,
                hot: RwLock::new(HotState {
                    state: SubscriptionState::Created,
                    subject: String::new(),
                    queue_group: None,
                    handlers: Vec::new(),
                    ack_inbox: String::new(),
                    connection: Some(connection),
                    stop_delivery: None,
                }),
                close_lock: Mutex::new(()),
            }),
        }
    }

    /// Drive the subscribe handshake with the remote coordinator.
    ///
    /// On success the subscription transitions to `Active`. On any failure
    /// the transport listener registered for the inbox is torn down before
    /// the error surfaces, and the subscription remains `Created`.
    pub(crate) async fn open(
        &self,
        subject: &str,
        queue_group: Option<&str>,
        handler: MessageHandler,
    ) -> SubscriptionResult<()> {
        let shared = &self.shared;

        // Register the handler and capture the connection in one write
        // epoch; the lock is released before any transport call below.
        let connection = {
            let mut hot = shared.hot.write().await;
            let Some(connection) = hot.connection.clone() else {
                return Err(SubscriptionError::ConnectionClosed);
            };
            if hot.state != SubscriptionState::Created {
                return Err(SubscriptionError::BadSubscription);
            }
            hot.subject = subject.to_string();
            hot.queue_group = queue_group.map(str::to_string);
            hot.handlers.push(handler);
            connection
        };

        // Listen for actual deliveries before the handshake, so nothing
        // the coordinator sends right after replying is lost.
        let listener = connection.transport().subscribe(&shared.inbox).await?;
        let (stop_tx, stop_rx) = oneshot::channel();
        spawn_delivery_task(Arc::downgrade(shared), listener, stop_rx);

        let request = build_subscribe_request(&connection, shared, subject, queue_group);
        let payload = match wire::encode(&request) {
            Ok(payload) => payload,
            Err(e) => {
                let _ = stop_tx.send(());
                return Err(e.into());
            }
        };

        let address = connection
            .resolver()
            .resolve(Channel::SubscribeRequest)
            .to_string();
        let reply = match connection
            .transport()
            .request(&address, payload, connection.handshake_timeout())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                let _ = stop_tx.send(());
                return Err(e);
            }
        };

        let response: wire::SubscriptionResponse = match wire::decode(&reply) {
            Ok(response) => response,
            Err(e) => {
                let _ = stop_tx.send(());
                return Err(e.into());
            }
        };
        if response.is_error() {
            let _ = stop_tx.send(());
            return Err(SubscriptionError::Protocol(response.error));
        }

        {
            let mut hot = shared.hot.write().await;
            hot.ack_inbox = response.ack_inbox;
            hot.stop_delivery = Some(stop_tx);
            hot.state = SubscriptionState::Active;
        }
        debug!(subject, inbox = %shared.inbox, "subscribe handshake succeeded");
        Ok(())
    }

    /// Register an additional handler; invoked after all earlier ones.
    pub async fn add_handler(&self, handler: MessageHandler) -> SubscriptionResult<()> {
        let mut hot = self.shared.hot.write().await;
        if hot.state == SubscriptionState::Closed {
            return Err(SubscriptionError::BadSubscription);
        }
        hot.handlers.push(handler);
        Ok(())
    }

    /// Close the subscription and remove it from the remote coordinator.
    ///
    /// Fails with `BadSubscription` if it was never active or is already
    /// closed. The remote exchange is attempted exactly once across all
    /// concurrent callers; its failure is surfaced but cannot undo the
    /// local teardown, which has already happened.
    pub async fn unsubscribe(&self) -> SubscriptionResult<()> {
        self.shared.unsubscribe().await
    }

    /// Best-effort teardown for a handle being discarded.
    ///
    /// No-op unless the subscription is durable: durables must explicitly
    /// unsubscribe or the coordinator keeps them alive forever. Never
    /// fails; any error from the underlying exchange is swallowed.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    /// The private inbox address deliveries are routed to.
    pub fn inbox(&self) -> &str {
        &self.shared.inbox
    }

    /// The effective configuration, frozen at creation.
    pub fn config(&self) -> &SubscriptionConfig {
        &self.shared.config
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SubscriptionState {
        self.shared.hot.read().await.state
    }

    /// Returns true while the subscription is active.
    pub async fn is_active(&self) -> bool {
        self.state().await == SubscriptionState::Active
    }

    /// The coordinator-assigned ack inbox; `None` unless active.
    pub async fn ack_inbox(&self) -> Option<String> {
        let hot = self.shared.hot.read().await;
        if hot.ack_inbox.is_empty() {
            None
        } else {
            Some(hot.ack_inbox.clone())
        }
    }

    /// The subject passed at open time.
    pub async fn subject(&self) -> String {
        self.shared.hot.read().await.subject.clone()
    }

    /// The queue group passed at open time, if any.
    pub async fn queue_group(&self) -> Option<String> {
        self.shared.hot.read().await.queue_group.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("inbox", &self.shared.inbox)
            .field("durable", &self.shared.config.is_durable())
            .finish_non_exhaustive()
    }
}

impl SubscriptionShared {
    /// Dispatch a single inbound delivery.
    ///
    /// Captures one consistent snapshot of the hot fields, invokes the
    /// handlers in order, then auto-acks if configured. A failure to
    /// publish the ack is swallowed: the coordinator's redelivery timer is
    /// the recovery mechanism, not the client.
    pub(crate) async fn dispatch(self: &Arc<Self>, raw: RawMessage) {
        let proto: wire::MsgProto = match wire::decode(&raw.payload) {
            Ok(proto) => proto,
            Err(e) => {
                warn!(inbox = %self.inbox, error = %e, "dropping undecodable delivery");
                return;
            }
        };

        let (handlers, ack_inbox, connection) = {
            let hot = self.hot.read().await;
            if hot.state != SubscriptionState::Active {
                debug!(inbox = %self.inbox, state = %hot.state, "delivery ignored");
                return;
            }
            (
                hot.handlers.clone(),
                hot.ack_inbox.clone(),
                hot.connection.clone(),
            )
        };
        let Some(connection) = connection else { return };

        let message = StreamMessage::new(Arc::new(proto), Arc::downgrade(self));
        for handler in &handlers {
            handler(message.clone()).await;
        }

        if self.config.ack_mode == AckMode::Automatic {
            let ack = wire::Ack::for_message(message.proto());
            match wire::encode(&ack) {
                Ok(payload) => {
                    if let Err(e) = connection.transport().publish(&ack_inbox, payload).await {
                        debug!(
                            sequence = message.sequence(),
                            error = %e,
                            "auto-ack publish failed"
                        );
                    }
                }
                Err(e) => debug!(error = %e, "auto-ack encode failed"),
            }
        }
    }

    /// Publish a manual acknowledgment for `proto`.
    pub(crate) async fn manual_ack(&self, proto: &wire::MsgProto) -> SubscriptionResult<()> {
        let (ack_inbox, connection) = {
            let hot = self.hot.read().await;
            (hot.ack_inbox.clone(), hot.connection.clone())
        };

        if !self.config.ack_mode.is_manual() {
            return Err(SubscriptionError::ManualAckNotEnabled);
        }
        let Some(connection) = connection else {
            return Err(SubscriptionError::BadSubscription);
        };

        let payload = wire::encode(&wire::Ack::for_message(proto))?;
        connection.transport().publish(&ack_inbox, payload).await
    }

    async fn unsubscribe(&self) -> SubscriptionResult<()> {
        let (connection, subject, ack_inbox) = {
            let _guard = self.close_lock.lock().await;
            let mut hot = self.hot.write().await;
            if hot.state != SubscriptionState::Active {
                return Err(SubscriptionError::BadSubscription);
            }
            let Some(connection) = hot.connection.take() else {
                return Err(SubscriptionError::BadSubscription);
            };
            hot.state = SubscriptionState::Closed;
            if let Some(stop) = hot.stop_delivery.take() {
                let _ = stop.send(());
            }
            hot.handlers.clear();
            let ack_inbox = std::mem::take(&mut hot.ack_inbox);
            (connection, hot.subject.clone(), ack_inbox)
        };

        // Local resources are released; the remote exchange runs outside
        // both locks so a concurrent caller cannot repeat it.
        debug!(subject, inbox = %self.inbox, "subscription closed");
        let durable = self.config.durable_name.as_deref().unwrap_or("");
        connection
            .unsubscribe_exchange(&subject, &ack_inbox, durable)
            .await
    }

    fn dispose(self: &Arc<Self>) {
        if !self.config.is_durable() {
            return;
        }
        let shared = Arc::clone(self);
        // Outside a runtime there is nothing to drive the exchange;
        // the coordinator's durable state survives either way.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = shared.unsubscribe().await {
                    debug!(inbox = %shared.inbox, error = %e, "durable teardown on dispose failed");
                }
            });
        }
    }
}

fn build_subscribe_request(
    connection: &ConnectionHandle,
    shared: &SubscriptionShared,
    subject: &str,
    queue_group: Option<&str>,
) -> wire::SubscriptionRequest {
    let (start_position, start_sequence, start_time_delta) = match shared.config.start {
        StartAt::NewOnly => (wire::StartPosition::NewOnly, None, None),
        StartAt::LastReceived => (wire::StartPosition::LastReceived, None, None),
        StartAt::TimeDelta(ago) => (
            wire::StartPosition::TimeDeltaStart,
            None,
            Some(ago.as_nanos().min(i64::MAX as u128) as i64),
        ),
        StartAt::Time(when) => {
            let delta = (Utc::now() - when).num_nanoseconds().unwrap_or(i64::MAX);
            (
                wire::StartPosition::TimeDeltaStart,
                None,
                Some(delta.max(0)),
            )
        }
        StartAt::Sequence(sequence) => {
            (wire::StartPosition::SequenceStart, Some(sequence), None)
        }
        StartAt::First => (wire::StartPosition::First, None, None),
    };

    wire::SubscriptionRequest {
        client_id: connection.client_id().to_string(),
        subject: subject.to_string(),
        queue_group: queue_group.unwrap_or_default().to_string(),
        inbox: shared.inbox.clone(),
        max_in_flight: shared.config.max_in_flight,
        ack_wait_secs: shared.config.ack_wait.as_secs() as i64,
        start_position,
        start_sequence,
        start_time_delta,
        durable_name: shared.config.durable_name.clone().unwrap_or_default(),
    }
}

/// The delivery task exclusively owns the transport listener. It exits on
/// the stop signal (unsubscribing the listener), when the transport ends
/// delivery, or when the subscription itself is gone.
fn spawn_delivery_task(
    shared: std::sync::Weak<SubscriptionShared>,
    mut listener: Box<dyn InboundListener>,
    mut stop: oneshot::Receiver<()>,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop => {
                    if let Err(e) = listener.unsubscribe().await {
                        debug!(error = %e, "transport listener teardown failed");
                    }
                    break;
                }
                delivery = listener.next() => {
                    let Some(raw) = delivery else { break };
                    let Some(shared) = shared.upgrade() else { break };
                    shared.dispatch(raw).await;
                }
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
