//! # Product Contract - ProductVerification binding
//!
//! Client side of the `ProductVerification` smart contract. The contract
//! owns all product, ownership and role state; this crate only encodes
//! calls, ships them to a node and decodes what comes back.
//!
//! ## Layout
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | ABI codec | `abi.rs` | Solidity head/tail encoding, selectors, revert data |
//! | Contract surface | `binding.rs` | Function descriptions, token to entity conversion |
//! | Transport | `rpc.rs` | `eth_*` JSON-RPC over HTTP |
//! | Port | `ports.rs` | `ProductRegistry` trait used by the API |
//! | Adapter | `registry.rs` | `RpcProductRegistry`, transaction send and receipt wait |
//! | Test double | `memory.rs` | `MockProductRegistry` (feature `test-utils`) |
//!
//! ## Usage
//!
//! ```ignore
//! use product_contract::{ProductRegistry, RegistryConfig, RpcProductRegistry};
//!
//! let config = RegistryConfig::new(contract_address);
//! let registry = RpcProductRegistry::new("http://127.0.0.1:7545", config)?;
//! let product = registry.get_product_details("SKU-42").await?;
//! ```

#![allow(missing_docs)]

pub mod abi;
pub mod binding;
pub mod errors;
pub mod ports;
pub mod registry;
pub mod rpc;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use errors::ContractError;
pub use ports::{ProductRegistry, TxReceipt};
pub use registry::{RegistryConfig, RpcProductRegistry};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MockProductRegistry;
