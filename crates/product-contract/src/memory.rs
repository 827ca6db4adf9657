//! In-memory [`ProductRegistry`] for tests.
//!
//! Not a model of the contract: it keeps just enough state to answer reads
//! consistently with the writes a test performed, and reverts on unknown
//! products the way the deployed contract does.

use crate::errors::ContractError;
use crate::ports::{ProductRegistry, TxReceipt};
use async_trait::async_trait;
use digiseal_types::{
    Address, Hash, Product, ProductRegistration, ProductStatus, Role, TransferRecord,
    VerificationRecord,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

const NOT_FOUND: &str = "Product does not exist";

#[derive(Default)]
struct State {
    products: HashMap<String, Product>,
    transfers: HashMap<String, Vec<TransferRecord>>,
    verifications: HashMap<String, Vec<VerificationRecord>>,
    roles: HashSet<(Role, Address)>,
    calls: Vec<String>,
    block: u64,
    offline: bool,
    /// Contract function name to revert reason.
    forced_reverts: HashMap<String, String>,
}

impl State {
    fn enter(&mut self, call: String) -> Result<(), ContractError> {
        let forced = self.forced_reverts.get(&call).cloned();
        self.calls.push(call);
        if self.offline {
            return Err(ContractError::Transport("node offline".into()));
        }
        match forced {
            Some(reason) => Err(ContractError::reverted(reason)),
            None => Ok(()),
        }
    }

    fn mine(&mut self) -> TxReceipt {
        self.block += 1;
        TxReceipt {
            transaction_hash: Hash::from_low_u64_be(self.block),
            block_number: Some(self.block),
            gas_used: None,
        }
    }

    fn product_mut(&mut self, product_id: &str) -> Result<&mut Product, ContractError> {
        self.products
            .get_mut(product_id)
            .ok_or_else(|| ContractError::reverted(NOT_FOUND))
    }
}

/// Registry double acting on behalf of a single caller account.
pub struct MockProductRegistry {
    caller: Address,
    state: Mutex<State>,
}

impl MockProductRegistry {
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            state: Mutex::new(State::default()),
        }
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    pub fn grant_role(&self, role: Role, account: Address) {
        self.state.lock().roles.insert((role, account));
    }

    /// Makes every subsequent call fail with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Makes every later call to `function` revert with `reason`.
    pub fn revert_on(&self, function: &str, reason: &str) {
        self.state
            .lock()
            .forced_reverts
            .insert(function.to_string(), reason.to_string());
    }

    /// Contract function names invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl ProductRegistry for MockProductRegistry {
    async fn register_product(
        &self,
        registration: &ProductRegistration,
    ) -> Result<TxReceipt, ContractError> {
        let mut state = self.state.lock();
        state.enter("registerProduct".into())?;

        if state.products.contains_key(&registration.product_id) {
            return Err(ContractError::reverted("Product already exists"));
        }

        let receipt = state.mine();
        let product = Product {
            product_id: registration.product_id.clone(),
            manufacturer: self.caller,
            current_owner: self.caller,
            manufacture_date: state.block,
            manufacturer_name: registration.manufacturer_name.clone(),
            product_details: registration.product_details.clone(),
            manufacturing_location: registration.manufacturing_location.clone(),
            status: ProductStatus::Created,
            is_authentic: true,
        };
        state.products.insert(product.product_id.clone(), product);
        Ok(receipt)
    }

    async fn verify_product(&self, product_id: &str) -> Result<TxReceipt, ContractError> {
        let mut state = self.state.lock();
        state.enter("verifyProduct".into())?;

        let is_authentic = state.product_mut(product_id)?.is_authentic;
        let receipt = state.mine();
        let record = VerificationRecord {
            verifier: self.caller,
            timestamp: state.block,
            is_authentic,
        };
        state
            .verifications
            .entry(product_id.to_string())
            .or_default()
            .push(record);
        Ok(receipt)
    }

    async fn transfer_ownership(
        &self,
        product_id: &str,
        new_owner: Address,
    ) -> Result<TxReceipt, ContractError> {
        let mut state = self.state.lock();
        state.enter("transferOwnership".into())?;

        let to_seller = state.roles.contains(&(Role::Seller, new_owner));
        let caller = self.caller;
        let product = state.product_mut(product_id)?;
        if product.current_owner != caller {
            return Err(ContractError::reverted("Only the current owner can transfer"));
        }

        let from = product.current_owner;
        product.current_owner = new_owner;
        product.status = match (product.status, to_seller) {
            (ProductStatus::WithSeller, _) => ProductStatus::Sold,
            (_, true) => ProductStatus::WithSeller,
            _ => ProductStatus::InTransit,
        };

        let receipt = state.mine();
        let record = TransferRecord {
            from,
            to: new_owner,
            timestamp: state.block,
        };
        state
            .transfers
            .entry(product_id.to_string())
            .or_default()
            .push(record);
        Ok(receipt)
    }

    async fn report_counterfeit(
        &self,
        product_id: &str,
        _reason: &str,
    ) -> Result<TxReceipt, ContractError> {
        let mut state = self.state.lock();
        state.enter("reportCounterfeit".into())?;

        let product = state.product_mut(product_id)?;
        product.status = ProductStatus::Reported;
        product.is_authentic = false;
        Ok(state.mine())
    }

    async fn register_seller(&self, seller: Address) -> Result<TxReceipt, ContractError> {
        let mut state = self.state.lock();
        state.enter("registerSeller".into())?;

        state.roles.insert((Role::Seller, seller));
        Ok(state.mine())
    }

    async fn get_product_details(&self, product_id: &str) -> Result<Product, ContractError> {
        let mut state = self.state.lock();
        state.enter("getProductDetails".into())?;
        state.product_mut(product_id).map(|p| p.clone())
    }

    async fn get_transfer_history(
        &self,
        product_id: &str,
    ) -> Result<Vec<TransferRecord>, ContractError> {
        let mut state = self.state.lock();
        state.enter("getTransferHistory".into())?;
        state.product_mut(product_id)?;
        Ok(state.transfers.get(product_id).cloned().unwrap_or_default())
    }

    async fn get_verification_history(
        &self,
        product_id: &str,
    ) -> Result<Vec<VerificationRecord>, ContractError> {
        let mut state = self.state.lock();
        state.enter("getVerificationHistory".into())?;
        state.product_mut(product_id)?;
        Ok(state.verifications.get(product_id).cloned().unwrap_or_default())
    }

    async fn get_products_owned(&self, owner: Address) -> Result<Vec<String>, ContractError> {
        let mut state = self.state.lock();
        state.enter("getProductsOwned".into())?;
        let mut ids: Vec<String> = state
            .products
            .values()
            .filter(|p| p.current_owner == owner)
            .map(|p| p.product_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn get_products_manufactured(
        &self,
        manufacturer: Address,
    ) -> Result<Vec<String>, ContractError> {
        let mut state = self.state.lock();
        state.enter("getProductsManufactured".into())?;
        let mut ids: Vec<String> = state
            .products
            .values()
            .filter(|p| p.manufacturer == manufacturer)
            .map(|p| p.product_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn has_specific_role(&self, role: Role, account: Address) -> Result<bool, ContractError> {
        let mut state = self.state.lock();
        state.enter("hasSpecificRole".into())?;
        Ok(state.roles.contains(&(role, account)))
    }

    async fn ping(&self) -> Result<(), ContractError> {
        if self.state.lock().offline {
            return Err(ContractError::Transport("node offline".into()));
        }
        Ok(())
    }
}
