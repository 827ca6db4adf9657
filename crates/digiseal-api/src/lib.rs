//! DigiSeal API - REST backend for product registration and verification.
//!
//! Marshals HTTP requests into calls on the `ProductVerification` contract
//! through the [`product_contract::ProductRegistry`] port. The contract is the
//! only source of truth; this server keeps no state of its own.
//!
//! # Architecture
//!
//! ```text
//! HTTP ──► CORS → Tracing → Timeout → Body limit ──► routes/{products,users}
//!                                                          │
//!                                               Arc<dyn ProductRegistry>
//!                                                          │
//!                                  RpcProductRegistry ──► Ethereum node (JSON-RPC)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use digiseal_api::{ApiService, ServerConfig};
//!
//! let config = ServerConfig::load()?;
//! ApiService::from_config(config)?.start().await?;
//! ```

pub mod domain;
pub mod middleware;
pub mod routes;
pub mod service;

pub use domain::config::ServerConfig;
pub use domain::error::{ApiError, ApiResult, ServiceError};
pub use routes::AppState;
pub use service::{build_router, ApiService, ShutdownHandle};
