//! # Driven Port
//!
//! The interface the API layer depends on. Adapters implement it against a
//! live node ([`crate::registry::RpcProductRegistry`]) or in memory for tests.

use crate::errors::ContractError;
use async_trait::async_trait;
use digiseal_types::{
    Address, Hash, Product, ProductRegistration, Role, TransferRecord, VerificationRecord, U256,
};
use serde::Serialize;

/// Outcome of a mined state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: Hash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<U256>,
}

/// Access to the ProductVerification contract.
///
/// Every method is a single contract call; the contract enforces all roles
/// and state transitions and reports violations as reverts.
#[async_trait]
pub trait ProductRegistry: Send + Sync {
    /// `registerProduct`: caller becomes manufacturer and first owner.
    async fn register_product(
        &self,
        registration: &ProductRegistration,
    ) -> Result<TxReceipt, ContractError>;

    /// `verifyProduct`: records a verification by the caller.
    async fn verify_product(&self, product_id: &str) -> Result<TxReceipt, ContractError>;

    /// `transferOwnership`
    async fn transfer_ownership(
        &self,
        product_id: &str,
        new_owner: Address,
    ) -> Result<TxReceipt, ContractError>;

    /// `reportCounterfeit`
    async fn report_counterfeit(
        &self,
        product_id: &str,
        reason: &str,
    ) -> Result<TxReceipt, ContractError>;

    /// `registerSeller`: grants the seller role.
    async fn register_seller(&self, seller: Address) -> Result<TxReceipt, ContractError>;

    /// `getProductDetails`
    async fn get_product_details(&self, product_id: &str) -> Result<Product, ContractError>;

    /// `getTransferHistory`
    async fn get_transfer_history(
        &self,
        product_id: &str,
    ) -> Result<Vec<TransferRecord>, ContractError>;

    /// `getVerificationHistory`
    async fn get_verification_history(
        &self,
        product_id: &str,
    ) -> Result<Vec<VerificationRecord>, ContractError>;

    /// `getProductsOwned`
    async fn get_products_owned(&self, owner: Address) -> Result<Vec<String>, ContractError>;

    /// `getProductsManufactured`
    async fn get_products_manufactured(
        &self,
        manufacturer: Address,
    ) -> Result<Vec<String>, ContractError>;

    /// `hasSpecificRole`
    async fn has_specific_role(&self, role: Role, account: Address) -> Result<bool, ContractError>;

    /// Cheap liveness probe of the backing chain.
    async fn ping(&self) -> Result<(), ContractError> {
        Ok(())
    }
}
