//! cexlink connector application.
//!
//! Wires the connector components together:
//! - REST gateway with request signing
//! - Contract catalog and order lifecycle
//! - Streaming session feeding the price cache and strategies

pub mod app;
pub mod config;
pub mod error;

pub use app::Connector;
pub use config::{AppConfig, StreamConfig};
pub use error::{AppError, AppResult};
