//! Message view handed to subscription handlers.

use std::sync::{Arc, Weak};

use streaming_wire as wire;

use crate::error::{SubscriptionError, SubscriptionResult};
use crate::subscription::SubscriptionShared;

/// A delivered message, wrapping the raw protocol record together with a
/// back-reference to its subscription for manual acknowledgment.
///
/// Cheap to clone; clones share the underlying record.
#[derive(Clone)]
pub struct StreamMessage {
    proto: Arc<wire::MsgProto>,
    subscription: Weak<SubscriptionShared>,
}

impl StreamMessage {
    pub(crate) fn new(proto: Arc<wire::MsgProto>, subscription: Weak<SubscriptionShared>) -> Self {
        Self {
            proto,
            subscription,
        }
    }

    /// Logical topic the message was published to.
    pub fn subject(&self) -> &str {
        &self.proto.subject
    }

    /// Coordinator-assigned sequence number.
    pub fn sequence(&self) -> u64 {
        self.proto.sequence
    }

    /// Message body.
    pub fn data(&self) -> &[u8] {
        &self.proto.data
    }

    /// Publish timestamp, nanoseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.proto.timestamp
    }

    /// True when the coordinator redelivered after an ack-wait expiry.
    pub fn redelivered(&self) -> bool {
        self.proto.redelivered
    }

    pub(crate) fn proto(&self) -> &wire::MsgProto {
        &self.proto
    }

    /// Manually acknowledge this message.
    ///
    /// Legal only on subscriptions opened in manual ack mode while they are
    /// still live; a message that outlives its subscription fails with
    /// `BadSubscription`.
    pub async fn ack(&self) -> SubscriptionResult<()> {
        let Some(subscription) = self.subscription.upgrade() else {
            return Err(SubscriptionError::BadSubscription);
        };
        subscription.manual_ack(&self.proto).await
    }
}

impl std::fmt::Debug for StreamMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamMessage")
            .field("subject", &self.proto.subject)
            .field("sequence", &self.proto.sequence)
            .field("data_len", &self.proto.data.len())
            .field("redelivered", &self.proto.redelivered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ack_after_subscription_dropped_is_bad_subscription() {
        let proto = Arc::new(wire::MsgProto {
            sequence: 1,
            subject: "orders".into(),
            data: vec![],
            timestamp: 0,
            redelivered: false,
        });
        let message = StreamMessage::new(proto, Weak::new());
        let err = message.ack().await.unwrap_err();
        assert!(matches!(err, SubscriptionError::BadSubscription));
    }

    #[test]
    fn test_accessors() {
        let proto = Arc::new(wire::MsgProto {
            sequence: 7,
            subject: "orders".into(),
            data: b"body".to_vec(),
            timestamp: 99,
            redelivered: true,
        });
        let message = StreamMessage::new(proto, Weak::new());
        assert_eq!(message.subject(), "orders");
        assert_eq!(message.sequence(), 7);
        assert_eq!(message.data(), b"body");
        assert_eq!(message.timestamp(), 99);
        assert!(message.redelivered());
    }
}
