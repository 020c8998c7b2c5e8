//! Subscription configuration.
//!
//! A [`SubscriptionConfig`] is a plain value object. The engine clones it
//! when a subscription is created, so mutating a shared template afterwards
//! never affects a subscription that is already open. Semantic validation
//! (e.g. a durable name the coordinator dislikes) is the remote
//! coordinator's job and surfaces as a handshake rejection.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default redelivery timeout.
pub const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(30);

/// Default cap on unacknowledged messages outstanding.
pub const DEFAULT_MAX_IN_FLIGHT: i32 = 1024;

/// Acknowledgment mode for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// The engine acknowledges each message after the handlers return.
    Automatic,
    /// The caller acknowledges via [`crate::StreamMessage::ack`].
    Manual,
}

impl AckMode {
    /// Returns true for manual acknowledgment mode.
    pub fn is_manual(&self) -> bool {
        matches!(self, AckMode::Manual)
    }
}

/// Replay position for a newly opened subscription.
///
/// Variants carrying a payload are converted to the wire representation
/// (position kind plus a separate payload field) at handshake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAt {
    /// Only messages published after the subscription opens.
    NewOnly,
    /// Begin with the last message received on the subject.
    LastReceived,
    /// Begin this far in the past, relative to the moment of the handshake.
    TimeDelta(Duration),
    /// Begin at an absolute instant; sent as a delta before now.
    Time(DateTime<Utc>),
    /// Begin at an explicit sequence number.
    Sequence(u64),
    /// Everything available, from the earliest message.
    First,
}

/// Options for one subscription, frozen at open time.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Automatic or manual acknowledgment.
    pub ack_mode: AckMode,
    /// Remote redelivery timeout; sent as whole seconds.
    pub ack_wait: Duration,
    /// Upper bound on unacknowledged messages the coordinator will deliver.
    pub max_in_flight: i32,
    /// Replay position.
    pub start: StartAt,
    /// Durable subscription name; `Some` marks the subscription durable.
    pub durable_name: Option<String>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            ack_mode: AckMode::Automatic,
            ack_wait: DEFAULT_ACK_WAIT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            start: StartAt::NewOnly,
            durable_name: None,
        }
    }
}

impl SubscriptionConfig {
    /// Switch the subscription to manual acknowledgment.
    pub fn manual_acks(mut self) -> Self {
        self.ack_mode = AckMode::Manual;
        self
    }

    /// Set the remote redelivery timeout.
    pub fn ack_wait(mut self, wait: Duration) -> Self {
        self.ack_wait = wait;
        self
    }

    /// Set the cap on unacknowledged messages outstanding.
    pub fn max_in_flight(mut self, max: i32) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Set the replay position.
    pub fn start_at(mut self, start: StartAt) -> Self {
        self.start = start;
        self
    }

    /// Name the subscription durable.
    pub fn durable(mut self, name: impl Into<String>) -> Self {
        self.durable_name = Some(name.into());
        self
    }

    /// Returns true if a non-empty durable name is set.
    pub fn is_durable(&self) -> bool {
        self.durable_name
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SubscriptionConfig::default();
        assert_eq!(config.ack_mode, AckMode::Automatic);
        assert_eq!(config.ack_wait, DEFAULT_ACK_WAIT);
        assert_eq!(config.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
        assert_eq!(config.start, StartAt::NewOnly);
        assert!(config.durable_name.is_none());
        assert!(!config.is_durable());
    }

    #[test]
    fn test_builder_chain() {
        let config = SubscriptionConfig::default()
            .manual_acks()
            .ack_wait(Duration::from_secs(5))
            .max_in_flight(16)
            .start_at(StartAt::Sequence(100))
            .durable("audit");
        assert!(config.ack_mode.is_manual());
        assert_eq!(config.ack_wait, Duration::from_secs(5));
        assert_eq!(config.max_in_flight, 16);
        assert_eq!(config.start, StartAt::Sequence(100));
        assert!(config.is_durable());
    }

    #[test]
    fn test_empty_durable_name_is_not_durable() {
        let config = SubscriptionConfig::default().durable("");
        assert!(!config.is_durable());
    }

    #[test]
    fn test_clone_is_an_independent_snapshot() {
        let mut template = SubscriptionConfig::default().max_in_flight(8);
        let snapshot = template.clone();

        template.max_in_flight = 1;
        template.ack_mode = AckMode::Manual;

        assert_eq!(snapshot.max_in_flight, 8);
        assert_eq!(snapshot.ack_mode, AckMode::Automatic);
    }
}
