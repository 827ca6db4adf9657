//! # Error Types
//!
//! Conversion errors raised while interpreting contract data or user input.

use thiserror::Error;

/// Errors converting raw values into domain types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Address is not 20 bytes of hex.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Status discriminant outside the known range.
    #[error("Unknown product status: {0}")]
    UnknownStatus(u8),

    /// Role name not recognised.
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}
