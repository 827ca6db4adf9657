//! # JSON-RPC registry adapter
//!
//! Implements [`ProductRegistry`] against a node that holds unlocked
//! accounts (Ganache, Hardhat, a dev Geth). Writes go out through
//! `eth_sendTransaction` and are awaited until mined; reads use `eth_call`.

use crate::abi::{Function, Token};
use crate::binding;
use crate::errors::ContractError;
use crate::ports::{ProductRegistry, TxReceipt};
use crate::rpc::{CallRequest, JsonRpcClient, TransactionReceipt};
use async_trait::async_trait;
use digiseal_types::{
    format_address, Address, Hash, Product, ProductRegistration, Role, TransferRecord,
    VerificationRecord, U256,
};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Settings for [`RpcProductRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Deployed ProductVerification address.
    pub contract_address: Address,
    /// Sending account. `None` uses the node's first unlocked account.
    pub from: Option<Address>,
    /// Gas limit attached to every transaction.
    pub gas_limit: u64,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Maximum wait for a transaction to be mined.
    pub receipt_timeout: Duration,
    /// Delay between receipt polls.
    pub receipt_poll_interval: Duration,
}

impl RegistryConfig {
    pub fn new(contract_address: Address) -> Self {
        Self {
            contract_address,
            from: None,
            gas_limit: 3_000_000,
            request_timeout: Duration::from_secs(30),
            receipt_timeout: Duration::from_secs(60),
            receipt_poll_interval: Duration::from_millis(500),
        }
    }
}

/// ProductVerification binding over Ethereum JSON-RPC.
pub struct RpcProductRegistry {
    rpc: JsonRpcClient,
    config: RegistryConfig,
    sender: OnceCell<Address>,
}

impl RpcProductRegistry {
    pub fn new(url: impl Into<String>, config: RegistryConfig) -> Result<Self, ContractError> {
        let rpc = JsonRpcClient::new(url, config.request_timeout)?;
        info!(
            url = rpc.url(),
            contract = %format_address(&config.contract_address),
            "ProductVerification binding created"
        );
        Ok(Self {
            rpc,
            config,
            sender: OnceCell::new(),
        })
    }

    pub fn contract_address(&self) -> Address {
        self.config.contract_address
    }

    /// Account transactions are sent from, resolved once per registry.
    pub async fn sender(&self) -> Result<Address, ContractError> {
        if let Some(from) = self.config.from {
            return Ok(from);
        }

        self.sender
            .get_or_try_init(|| async {
                let accounts = self.rpc.accounts().await?;
                let first = accounts.first().copied().ok_or(ContractError::NoAccounts)?;
                info!(account = %format_address(&first), "Using first unlocked account");
                Ok(first)
            })
            .await
            .copied()
    }

    async fn transact(&self, function: Function, args: Vec<Token>) -> Result<TxReceipt, ContractError> {
        let data = function.encode_input(&args)?;
        let from = self.sender().await?;

        let tx = CallRequest {
            from: Some(from),
            to: self.config.contract_address,
            data: data.into(),
            gas: Some(U256::from(self.config.gas_limit)),
        };

        let tx_hash = self.rpc.send_transaction(&tx).await?;
        debug!(function = function.name, tx_hash = ?tx_hash, "Transaction submitted");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.is_success() {
            warn!(function = function.name, tx_hash = ?tx_hash, "Transaction reverted");
            return Err(ContractError::Reverted { reason: None });
        }

        info!(
            function = function.name,
            tx_hash = ?tx_hash,
            block = ?receipt.block_number,
            "Transaction mined"
        );

        Ok(TxReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|b| b.low_u64()),
            gas_used: receipt.gas_used,
        })
    }

    async fn wait_for_receipt(&self, tx_hash: Hash) -> Result<TransactionReceipt, ContractError> {
        let deadline = Instant::now() + self.config.receipt_timeout;

        loop {
            if let Some(receipt) = self.rpc.transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            if Instant::now() >= deadline {
                return Err(ContractError::ReceiptTimeout {
                    tx_hash,
                    waited: self.config.receipt_timeout,
                });
            }
            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }

    async fn query(&self, function: Function, args: Vec<Token>) -> Result<Vec<Token>, ContractError> {
        let data = function.encode_input(&args)?;
        let call = CallRequest {
            from: self.config.from,
            to: self.config.contract_address,
            data: data.into(),
            gas: None,
        };

        let output = self.rpc.call(&call).await?;
        if output.is_empty() && !function.outputs.is_empty() {
            return Err(ContractError::MalformedResponse(format!(
                "{}: empty return data (is the contract deployed at {}?)",
                function.name,
                format_address(&self.config.contract_address)
            )));
        }

        Ok(function.decode_output(output.as_slice())?)
    }
}

#[async_trait]
impl ProductRegistry for RpcProductRegistry {
    #[instrument(skip(self, registration), fields(product_id = %registration.product_id))]
    async fn register_product(
        &self,
        registration: &ProductRegistration,
    ) -> Result<TxReceipt, ContractError> {
        self.transact(
            binding::register_product(),
            binding::registration_tokens(registration),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn verify_product(&self, product_id: &str) -> Result<TxReceipt, ContractError> {
        self.transact(
            binding::verify_product(),
            vec![Token::String(product_id.to_string())],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn transfer_ownership(
        &self,
        product_id: &str,
        new_owner: Address,
    ) -> Result<TxReceipt, ContractError> {
        self.transact(
            binding::transfer_ownership(),
            vec![Token::String(product_id.to_string()), Token::Address(new_owner)],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn report_counterfeit(
        &self,
        product_id: &str,
        reason: &str,
    ) -> Result<TxReceipt, ContractError> {
        self.transact(
            binding::report_counterfeit(),
            vec![
                Token::String(product_id.to_string()),
                Token::String(reason.to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn register_seller(&self, seller: Address) -> Result<TxReceipt, ContractError> {
        self.transact(binding::register_seller(), vec![Token::Address(seller)])
            .await
    }

    #[instrument(skip(self))]
    async fn get_product_details(&self, product_id: &str) -> Result<Product, ContractError> {
        let tokens = self
            .query(
                binding::get_product_details(),
                vec![Token::String(product_id.to_string())],
            )
            .await?;
        binding::product_from_tokens(tokens)
    }

    #[instrument(skip(self))]
    async fn get_transfer_history(
        &self,
        product_id: &str,
    ) -> Result<Vec<TransferRecord>, ContractError> {
        let tokens = self
            .query(
                binding::get_transfer_history(),
                vec![Token::String(product_id.to_string())],
            )
            .await?;
        binding::transfer_history_from_tokens(tokens)
    }

    #[instrument(skip(self))]
    async fn get_verification_history(
        &self,
        product_id: &str,
    ) -> Result<Vec<VerificationRecord>, ContractError> {
        let tokens = self
            .query(
                binding::get_verification_history(),
                vec![Token::String(product_id.to_string())],
            )
            .await?;
        binding::verification_history_from_tokens(tokens)
    }

    #[instrument(skip(self))]
    async fn get_products_owned(&self, owner: Address) -> Result<Vec<String>, ContractError> {
        let tokens = self
            .query(binding::get_products_owned(), vec![Token::Address(owner)])
            .await?;
        binding::product_ids_from_tokens(tokens, "getProductsOwned")
    }

    #[instrument(skip(self))]
    async fn get_products_manufactured(
        &self,
        manufacturer: Address,
    ) -> Result<Vec<String>, ContractError> {
        let tokens = self
            .query(
                binding::get_products_manufactured(),
                vec![Token::Address(manufacturer)],
            )
            .await?;
        binding::product_ids_from_tokens(tokens, "getProductsManufactured")
    }

    #[instrument(skip(self))]
    async fn has_specific_role(&self, role: Role, account: Address) -> Result<bool, ContractError> {
        let tokens = self
            .query(
                binding::has_specific_role(),
                vec![
                    Token::FixedBytes(role.role_id().as_bytes().to_vec()),
                    Token::Address(account),
                ],
            )
            .await?;
        binding::bool_from_tokens(tokens, "hasSpecificRole")
    }

    async fn ping(&self) -> Result<(), ContractError> {
        self.rpc.block_number().await.map(|_| ())
    }
}
