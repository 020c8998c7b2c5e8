//! Subject resolver for the coordinator request exchanges.
//!
//! Subject names are configurable per deployment. The resolver is a pure,
//! stateless translator from logical channel to concrete subject string;
//! no hard-coded subjects appear in the handshake or teardown paths.

use crate::error::{SubscriptionError, SubscriptionResult};

/// Default prefix for the coordinator's request subjects.
pub const DEFAULT_SUBJECT_PREFIX: &str = "streaming.cluster";

/// Logical request channels used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    SubscribeRequest,
    UnsubscribeRequest,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::SubscribeRequest => write!(f, "subscribe_request"),
            Channel::UnsubscribeRequest => write!(f, "unsubscribe_request"),
        }
    }
}

/// All logical channels, for iteration.
pub const ALL_CHANNELS: &[Channel] = &[Channel::SubscribeRequest, Channel::UnsubscribeRequest];

/// Concrete subject strings for the coordinator request channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subjects {
    pub subscribe_requests: String,
    pub unsubscribe_requests: String,
}

impl Default for Subjects {
    fn default() -> Self {
        Self {
            subscribe_requests: format!("{DEFAULT_SUBJECT_PREFIX}.sub.request"),
            unsubscribe_requests: format!("{DEFAULT_SUBJECT_PREFIX}.unsub.request"),
        }
    }
}

/// Pure subject resolver: maps logical channels to concrete subject strings.
///
/// Constructed from configuration. Validates that all subjects are non-empty
/// and contain no unresolved placeholders.
#[derive(Debug, Clone)]
pub struct SubjectResolver {
    subjects: Subjects,
}

impl SubjectResolver {
    /// Create a resolver from explicit subject configuration.
    ///
    /// Returns an error if any subject is empty or contains unresolved
    /// `{…}` placeholders.
    pub fn new(subjects: Subjects) -> SubscriptionResult<Self> {
        let resolver = Self { subjects };
        resolver.validate()?;
        Ok(resolver)
    }

    /// Create a resolver using all defaults.
    pub fn with_defaults() -> Self {
        Self {
            subjects: Subjects::default(),
        }
    }

    /// Create a resolver with a custom prefix, generating default subject
    /// templates from that prefix.
    pub fn with_prefix(prefix: &str) -> SubscriptionResult<Self> {
        let subjects = Subjects {
            subscribe_requests: format!("{prefix}.sub.request"),
            unsubscribe_requests: format!("{prefix}.unsub.request"),
        };
        Self::new(subjects)
    }

    /// Resolve a logical channel to its concrete subject string.
    pub fn resolve(&self, channel: Channel) -> &str {
        match channel {
            Channel::SubscribeRequest => &self.subjects.subscribe_requests,
            Channel::UnsubscribeRequest => &self.subjects.unsubscribe_requests,
        }
    }

    /// Returns the underlying subjects configuration.
    pub fn subjects(&self) -> &Subjects {
        &self.subjects
    }

    fn validate(&self) -> SubscriptionResult<()> {
        for channel in ALL_CHANNELS {
            let subject = self.resolve(*channel);
            if subject.trim().is_empty() {
                return Err(SubscriptionError::Config(format!(
                    "subject for channel '{channel}' is empty"
                )));
            }
            if subject.contains('{') || subject.contains('}') {
                return Err(SubscriptionError::Config(format!(
                    "subject for channel '{channel}' contains unresolved placeholder: {subject}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for SubjectResolver {
    fn default() -> Self {
        Self::with_defaults()
    }
}
