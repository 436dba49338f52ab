//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("REST error: {0}")]
    Rest(#[from] cexlink_rest::RestError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] cexlink_ws::WsError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] cexlink_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
