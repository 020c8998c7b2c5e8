//! # streaming-sub
//!
//! Client-side subscription engine for the persistent streaming protocol.
//! Layered over a plain at-most-once pub/sub transport (NATS core in
//! production), it drives the subscribe handshake against the remote
//! streaming coordinator, dispatches deliveries arriving on each
//! subscription's private inbox, and acknowledges messages so the
//! coordinator's redelivery timer can provide at-least-once semantics.
//!
//! ## Design Principles
//!
//! - **Snapshot, then act**: every delivery and every manual ack captures
//!   one consistent view of the subscription's hot state under a read
//!   lock, then releases the lock before invoking handlers or touching
//!   the network. No lock is ever held across user code or I/O.
//! - **Teardown happens at most once**: a dedicated close mutex
//!   serializes unsubscribe and dispose, so exactly one caller performs
//!   the remote exchange and the rest observe a closed subscription.
//! - **The transport is a seam**: the engine sees only the
//!   [`Transport`] trait. [`NatsTransport`] adapts async-nats; tests use
//!   an in-memory transport with scripted request/reply behavior.
//! - **Failures where they belong**: handshake failures tear down the
//!   partially-registered listener and surface a typed error; a failed
//!   automatic ack is swallowed, because redelivery after the ack-wait
//!   expiry is the protocol's own recovery path.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use streaming_sub::{
//!     ConnectionHandle, MessageHandler, NatsTransport, StartAt, SubjectResolver,
//!     SubscriptionConfig,
//! };
//!
//! # async fn run() -> streaming_sub::SubscriptionResult<()> {
//! let transport = Arc::new(NatsTransport::connect("nats://localhost:4222").await?);
//! let connection = Arc::new(ConnectionHandle::new(
//!     "order-worker",
//!     transport,
//!     SubjectResolver::with_defaults(),
//! )?);
//!
//! let handler: MessageHandler = Arc::new(|msg| {
//!     Box::pin(async move {
//!         println!("seq {} on {}", msg.sequence(), msg.subject());
//!     })
//! });
//!
//! let subscription = connection
//!     .subscribe(
//!         "orders.created",
//!         Some("workers"),
//!         SubscriptionConfig::default().start_at(StartAt::LastReceived),
//!         handler,
//!     )
//!     .await?;
//!
//! // ... later
//! subscription.unsubscribe().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod subjects;
pub mod subscription;
pub mod transport;

pub use config::{AckMode, DEFAULT_ACK_WAIT, DEFAULT_MAX_IN_FLIGHT, StartAt, SubscriptionConfig};
pub use connection::{ConnectionHandle, DEFAULT_HANDSHAKE_TIMEOUT};
pub use error::{SubscriptionError, SubscriptionResult};
pub use message::StreamMessage;
pub use subjects::{Channel, SubjectResolver, Subjects};
pub use subscription::{MessageHandler, Subscription, SubscriptionState};
pub use transport::{InboundListener, NatsTransport, RawMessage, Transport};
