//! Streaming connectivity for cexlink.
//!
//! Provides a long-lived WebSocket session with:
//! - Fixed-delay reconnection until shutdown
//! - Subscription tracking and resubscription on every open
//! - Application heartbeat replies where the variant requires them
//! - In-order dispatch of canonical events to the price cache and strategies

pub mod error;
pub mod message;
pub mod session;
pub mod subscription;

pub use error::{WsError, WsResult};
pub use message::Inbound;
pub use session::{SessionConfig, SessionState, StreamingSession, SubscribeOutcome};
pub use subscription::{SubscriptionKey, SubscriptionRegistry, DEFAULT_BATCH_LIMIT};
