//! Response bodies of the DigiSeal API.

use digiseal_types::{Product, TransferRecord, VerificationRecord};
use serde::{Deserialize, Serialize};

/// Failure envelope `{ success: false, error }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

/// Verification verdict for a product id the chain does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisteredProduct {
    pub product_id: String,
    pub registered: bool,
    pub is_authentic: bool,
    pub error: String,
}

impl UnregisteredProduct {
    pub fn new(product_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            registered: false,
            is_authentic: false,
            error: error.into(),
        }
    }
}

/// GET /api/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    #[serde(default)]
    pub blockchain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductEnvelope {
    pub product: Product,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub product_id: String,
    pub is_authentic: bool,
    pub product: Product,
    pub transaction_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOutcome {
    pub message: String,
    pub product_id: String,
    pub transaction_hash: String,
}

/// Outcome of a write with no other payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutcome {
    pub message: String,
    pub transaction_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductHistory {
    pub product_id: String,
    pub transfer_history: Vec<TransferRecord>,
    pub verification_history: Vec<VerificationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductList {
    pub address: String,
    pub products: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFlags {
    pub manufacturer: bool,
    pub seller: bool,
    pub admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRoles {
    pub address: String,
    pub roles: RoleFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCheck {
    pub address: String,
    pub role: String,
    pub has_role: bool,
}
