//! Integration tests for cexlink-ws.
//!
//! These tests run a `StreamingSession` against a local WebSocket server:
//! - Subscription replay on every open
//! - Reconnection after server-side drops
//! - Frame dispatch and heartbeat replies

pub mod common;
