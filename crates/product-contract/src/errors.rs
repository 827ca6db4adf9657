//! # Error Types
//!
//! Failures of contract calls, from transport up to decoding.

use crate::abi::AbiError;
use digiseal_types::{Hash, TypeError};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`crate::ports::ProductRegistry`] implementations.
#[derive(Debug, Error)]
pub enum ContractError {
    /// HTTP transport failure talking to the node.
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON-RPC error object returned by the node.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The contract reverted the call or transaction.
    #[error("execution reverted{}", .reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default())]
    Reverted { reason: Option<String> },

    /// ABI encoding or decoding failed.
    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    /// The node exposes no unlocked account to send from.
    #[error("no unlocked accounts available on the node")]
    NoAccounts,

    /// Transaction was not mined within the configured wait.
    #[error("timed out after {waited:?} waiting for receipt of {tx_hash:?}")]
    ReceiptTimeout { tx_hash: Hash, waited: Duration },

    /// Node answered with something we cannot interpret.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Decoded value is not a legal domain value.
    #[error("invalid contract data: {0}")]
    Type(#[from] TypeError),
}

impl ContractError {
    pub fn reverted(reason: impl Into<String>) -> Self {
        ContractError::Reverted {
            reason: Some(reason.into()),
        }
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, ContractError::Reverted { .. })
    }

    /// Revert reason, when the node reported one.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            ContractError::Reverted { reason } => reason.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ContractError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ContractError::MalformedResponse(e.to_string())
        } else {
            ContractError::Transport(e.to_string())
        }
    }
}
