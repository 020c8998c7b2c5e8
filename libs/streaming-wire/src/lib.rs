//! Typed payloads and codec for the streaming subscription protocol.
//!
//! These structures describe every message exchanged with the remote
//! streaming coordinator: the subscribe/unsubscribe request/reply pairs,
//! delivered messages, and acknowledgments. Serialization is JSON; the
//! [`encode`]/[`decode`] helpers map failures to a typed [`WireError`] so
//! consumers never see raw serde errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codec error for wire payloads.
#[derive(Debug, Error)]
pub enum WireError {
    /// Serialization or deserialization failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// A payload failed structural validation.
    #[error("invalid payload: {0}")]
    Invalid(String),
}

/// Shorthand result alias for wire operations.
pub type WireResult<T> = Result<T, WireError>;

// ---------------------------------------------------------------------------
// Start position
// ---------------------------------------------------------------------------

/// Replay position for a newly opened subscription.
///
/// `TimeDeltaStart` and `SequenceStart` require the matching payload field
/// (`start_time_delta` / `start_sequence`) on the [`SubscriptionRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPosition {
    /// Deliver only messages published after the subscription opens.
    NewOnly,
    /// Start with the last message received on the subject.
    LastReceived,
    /// Start at a point in time expressed as a delta before now.
    TimeDeltaStart,
    /// Start at an explicit sequence number.
    SequenceStart,
    /// Deliver everything available, from the earliest message.
    First,
}

impl std::fmt::Display for StartPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartPosition::NewOnly => write!(f, "new_only"),
            StartPosition::LastReceived => write!(f, "last_received"),
            StartPosition::TimeDeltaStart => write!(f, "time_delta_start"),
            StartPosition::SequenceStart => write!(f, "sequence_start"),
            StartPosition::First => write!(f, "first"),
        }
    }
}

// ---------------------------------------------------------------------------
// Subscribe handshake
// ---------------------------------------------------------------------------

/// Subscribe request sent to the coordinator's subscribe-request subject.
///
/// Optional strings (`queue_group`, `durable_name`) travel as empty strings
/// rather than being omitted, matching the coordinator contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// Identity of the connecting client.
    pub client_id: String,
    /// Logical topic to subscribe to.
    pub subject: String,
    /// Queue group for load-shared delivery; empty when none.
    #[serde(default)]
    pub queue_group: String,
    /// Private inbox address deliveries are routed to.
    pub inbox: String,
    /// Upper bound on unacknowledged messages outstanding.
    pub max_in_flight: i32,
    /// Redelivery timeout, in whole seconds.
    pub ack_wait_secs: i64,
    /// Replay position for the new subscription.
    pub start_position: StartPosition,
    /// Sequence payload; present iff `start_position` is `SequenceStart`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_sequence: Option<u64>,
    /// Time-delta payload in nanoseconds before now; present iff
    /// `start_position` is `TimeDeltaStart`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_delta: Option<i64>,
    /// Durable subscription name; empty when the subscription is plain.
    #[serde(default)]
    pub durable_name: String,
}

impl SubscriptionRequest {
    /// Validate that the start-position payload matches the position kind.
    pub fn validate(&self) -> WireResult<()> {
        match self.start_position {
            StartPosition::SequenceStart => {
                if self.start_sequence.is_none() {
                    return Err(WireError::Invalid(
                        "sequence_start requires start_sequence".into(),
                    ));
                }
            }
            StartPosition::TimeDeltaStart => {
                if self.start_time_delta.is_none() {
                    return Err(WireError::Invalid(
                        "time_delta_start requires start_time_delta".into(),
                    ));
                }
            }
            _ => {
                if self.start_sequence.is_some() || self.start_time_delta.is_some() {
                    return Err(WireError::Invalid(format!(
                        "start position '{}' takes no payload",
                        self.start_position
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Reply to both subscribe and unsubscribe requests.
///
/// An empty `error` field signals success; anything else is the remote
/// coordinator's rejection text, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    /// Coordinator-assigned address for outgoing acknowledgments.
    #[serde(default)]
    pub ack_inbox: String,
    /// Remote error text; empty on success.
    #[serde(default)]
    pub error: String,
}

impl SubscriptionResponse {
    /// Returns true if the reply carries a rejection.
    pub fn is_error(&self) -> bool {
        !self.error.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Unsubscribe
// ---------------------------------------------------------------------------

/// Unsubscribe request sent to the coordinator's unsubscribe subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
    /// Identity of the closing client.
    pub client_id: String,
    /// Logical topic being unsubscribed.
    pub subject: String,
    /// The subscription's ack inbox, identifying it to the coordinator.
    pub inbox: String,
    /// Durable name; empty for plain subscriptions.
    #[serde(default)]
    pub durable_name: String,
}

// ---------------------------------------------------------------------------
// Message flow
// ---------------------------------------------------------------------------

/// A message delivered to a subscription's private inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgProto {
    /// Coordinator-assigned sequence number on the subject.
    pub sequence: u64,
    /// Logical topic the message was published to.
    pub subject: String,
    /// Opaque message body.
    #[serde(default)]
    pub data: Vec<u8>,
    /// Publish timestamp, nanoseconds since the Unix epoch.
    pub timestamp: i64,
    /// True when the coordinator redelivered after an ack-wait expiry.
    #[serde(default)]
    pub redelivered: bool,
}

/// Acknowledgment published to a subscription's ack inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Subject of the acknowledged message.
    pub subject: String,
    /// Sequence of the acknowledged message.
    pub sequence: u64,
}

impl Ack {
    /// Build the acknowledgment for a delivered message.
    pub fn for_message(msg: &MsgProto) -> Self {
        Self {
            subject: msg.subject.clone(),
            sequence: msg.sequence,
        }
    }
}

// ---------------------------------------------------------------------------
// Codec helpers
// ---------------------------------------------------------------------------

/// Encode a payload to JSON bytes for transport.
pub fn encode<T: Serialize>(value: &T) -> WireResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| WireError::Codec(e.to_string()))
}

/// Decode JSON bytes from transport into a typed payload.
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> WireResult<T> {
    serde_json::from_slice(data).map_err(|e| WireError::Codec(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
