//! REST connectivity for cexlink.
//!
//! - `SignatureEngine`: HMAC-SHA256 request signing
//! - `RestGateway`: signed/unsigned requests with error mapping
//! - `ContractCatalog`: instrument list with granularity rules
//! - `OrderManager`: order placement, cancellation, status and account
//!   queries with average-price reconciliation

pub mod account;
pub mod catalog;
pub mod error;
pub mod gateway;
pub mod orders;
pub mod signer;

pub use catalog::ContractCatalog;
pub use error::{RestError, RestResult};
pub use gateway::RestGateway;
pub use orders::OrderManager;
pub use signer::{encode_params, SignatureEngine};
