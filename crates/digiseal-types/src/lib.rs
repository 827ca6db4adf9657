//! # DigiSeal Types
//!
//! Domain entities as exposed by the `ProductVerification` contract.
//!
//! ## Design Principles
//!
//! - **Contract is authoritative**: these types mirror what the contract
//!   returns for display. No ownership or lifecycle rule is enforced here.
//! - **Stable JSON shape**: all entities serialize in camelCase, matching the
//!   shapes the web frontend renders.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
