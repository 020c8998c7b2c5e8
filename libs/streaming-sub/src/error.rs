//! Error types for the subscription engine.
//!
//! Provides typed variants so callers can distinguish liveness failures,
//! remote protocol rejections, mode errors, and transport problems without
//! leaking transport internals.

use thiserror::Error;

/// Top-level error type for the streaming-sub crate.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Transport-level failure (subscribe, publish, or request plumbing).
    #[error("transport error: {0}")]
    Transport(String),

    /// A request/reply exchange timed out.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Payload serialization or deserialization failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// Configuration error (e.g. empty client id, bad subject template).
    #[error("configuration error: {0}")]
    Config(String),

    /// The owning connection was closed before the operation started.
    #[error("connection closed")]
    ConnectionClosed,

    /// Operation attempted on a closed or never-opened subscription.
    #[error("bad subscription")]
    BadSubscription,

    /// Manual acknowledgment attempted without manual ack mode.
    #[error("manual ack not enabled")]
    ManualAckNotEnabled,

    /// The remote coordinator rejected an exchange; carries its text verbatim.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SubscriptionError {
    /// Returns true if this error indicates a transient failure that may
    /// succeed on retry (transport or timeout).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubscriptionError::Transport(_) | SubscriptionError::Timeout(_)
        )
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SubscriptionError::Timeout(_))
    }

    /// Returns true for liveness errors: the subscription or its connection
    /// is gone, and retrying the same call cannot succeed.
    pub fn is_liveness(&self) -> bool {
        matches!(
            self,
            SubscriptionError::ConnectionClosed | SubscriptionError::BadSubscription
        )
    }
}

impl From<streaming_wire::WireError> for SubscriptionError {
    fn from(err: streaming_wire::WireError) -> Self {
        SubscriptionError::Codec(err.to_string())
    }
}

/// Shorthand result alias for subscription operations.
pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let transport = SubscriptionError::Transport("conn reset".into());
        assert!(transport.is_retryable());
        assert!(!transport.is_timeout());
        assert!(!transport.is_liveness());

        let timeout = SubscriptionError::Timeout("deadline exceeded".into());
        assert!(timeout.is_retryable());
        assert!(timeout.is_timeout());

        let closed = SubscriptionError::ConnectionClosed;
        assert!(!closed.is_retryable());
        assert!(closed.is_liveness());

        let bad = SubscriptionError::BadSubscription;
        assert!(bad.is_liveness());

        let manual = SubscriptionError::ManualAckNotEnabled;
        assert!(!manual.is_retryable());
        assert!(!manual.is_liveness());

        let protocol = SubscriptionError::Protocol("unknown durable".into());
        assert!(!protocol.is_retryable());
    }

    #[test]
    fn test_protocol_error_carries_remote_text() {
        let err = SubscriptionError::Protocol("invalid start sequence".into());
        assert!(format!("{err}").contains("invalid start sequence"));
    }

    #[test]
    fn test_wire_error_maps_to_codec() {
        let wire_err = streaming_wire::WireError::Codec("bad json".into());
        let err: SubscriptionError = wire_err.into();
        assert!(matches!(err, SubscriptionError::Codec(_)));
        assert!(format!("{err}").contains("bad json"));
    }
}
