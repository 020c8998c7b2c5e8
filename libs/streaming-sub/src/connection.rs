//! Connection handle shared by subscriptions.
//!
//! Stands in for the owning streaming connection: it carries the client
//! identity, generates private inbox addresses, and performs the
//! subscribe/unsubscribe request/reply exchanges against the resolved
//! coordinator subjects. It does not manage the transport connection
//! itself; reconnect behavior belongs to the transport adapter.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use streaming_wire as wire;

use crate::config::SubscriptionConfig;
use crate::error::{SubscriptionError, SubscriptionResult};
use crate::subjects::{Channel, SubjectResolver};
use crate::subscription::{MessageHandler, Subscription};
use crate::transport::Transport;

/// Default timeout for the subscribe/unsubscribe request exchanges.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Prefix for generated private inbox addresses.
const INBOX_PREFIX: &str = "_INBOX";

/// Handle to the streaming connection, shared read-only by the
/// subscriptions it creates.
pub struct ConnectionHandle {
    client_id: String,
    transport: Arc<dyn Transport>,
    resolver: SubjectResolver,
    handshake_timeout: Duration,
}

impl ConnectionHandle {
    /// Create a handle over an established transport.
    ///
    /// Fails with a `Config` error if the client id is empty.
    pub fn new(
        client_id: impl Into<String>,
        transport: Arc<dyn Transport>,
        resolver: SubjectResolver,
    ) -> SubscriptionResult<Self> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(SubscriptionError::Config("client_id is empty".into()));
        }
        Ok(Self {
            client_id,
            transport,
            resolver,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Override the handshake request timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the client identity sent in every coordinator exchange.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the configured handshake timeout.
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Generate a unique private inbox address.
    pub fn new_inbox(&self) -> String {
        format!("{INBOX_PREFIX}.{}", Uuid::new_v4().simple())
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn resolver(&self) -> &SubjectResolver {
        &self.resolver
    }

    /// Open a subscription on `subject`.
    ///
    /// Drives the subscribe handshake with the remote coordinator. On
    /// success the returned subscription is active and `handler` receives
    /// every delivery; on failure no transport listener is left behind.
    pub async fn subscribe(
        self: &Arc<Self>,
        subject: &str,
        queue_group: Option<&str>,
        config: SubscriptionConfig,
        handler: MessageHandler,
    ) -> SubscriptionResult<Subscription> {
        let subscription = Subscription::new(Arc::clone(self), config);
        subscription.open(subject, queue_group, handler).await?;
        info!(
            subject,
            queue_group = queue_group.unwrap_or(""),
            inbox = %subscription.inbox(),
            "subscription established"
        );
        Ok(subscription)
    }

    /// Perform the unsubscribe request/reply exchange for a subscription.
    ///
    /// The caller has already released local resources; a failure here is
    /// surfaced for logging but cannot undo the local teardown.
    pub(crate) async fn unsubscribe_exchange(
        &self,
        subject: &str,
        ack_inbox: &str,
        durable_name: &str,
    ) -> SubscriptionResult<()> {
        let request = wire::UnsubscribeRequest {
            client_id: self.client_id.clone(),
            subject: subject.to_string(),
            inbox: ack_inbox.to_string(),
            durable_name: durable_name.to_string(),
        };
        let payload = wire::encode(&request)?;

        let address = self.resolver.resolve(Channel::UnsubscribeRequest);
        let reply = self
            .transport
            .request(address, payload, self.handshake_timeout)
            .await?;

        let response: wire::SubscriptionResponse = wire::decode(&reply)?;
        if response.is_error() {
            return Err(SubscriptionError::Protocol(response.error));
        }
        debug!(subject, ack_inbox, "unsubscribe exchange completed");
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("client_id", &self.client_id)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}
