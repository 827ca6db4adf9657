//! Configuration and error handling for the API server.

pub mod config;
pub mod error;

pub use config::{
    BlockchainConfig, ConfigError, CorsConfig, HttpConfig, LimitsConfig, ServerConfig,
    TimeoutConfig,
};
pub use error::{ApiError, ApiResult, ServiceError};
