//! # Domain Entities
//!
//! Products, ownership transfers, verifications and access-control roles.

use crate::errors::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

pub use primitive_types::{H160 as Address, H256 as Hash, U256};

// =============================================================================
// ADDRESSES
// =============================================================================

/// Parses an account address from `0x`-prefixed or bare hex.
pub fn parse_address(s: &str) -> Result<Address, TypeError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 40 {
        return Err(TypeError::InvalidAddress(s.to_string()));
    }

    let bytes = hex::decode(digits).map_err(|_| TypeError::InvalidAddress(s.to_string()))?;
    Ok(Address::from_slice(&bytes))
}

/// Formats an address as full lowercase `0x` hex.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

// =============================================================================
// PRODUCT
// =============================================================================

/// Lifecycle state of a product as tracked by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ProductStatus {
    #[default]
    Created = 0,
    InTransit = 1,
    WithSeller = 2,
    Sold = 3,
    Reported = 4,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Created => "Created",
            ProductStatus::InTransit => "InTransit",
            ProductStatus::WithSeller => "WithSeller",
            ProductStatus::Sold => "Sold",
            ProductStatus::Reported => "Reported",
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for ProductStatus {
    type Error = TypeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ProductStatus::Created),
            1 => Ok(ProductStatus::InTransit),
            2 => Ok(ProductStatus::WithSeller),
            3 => Ok(ProductStatus::Sold),
            4 => Ok(ProductStatus::Reported),
            other => Err(TypeError::UnknownStatus(other)),
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProductStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProductStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "Created" => Ok(ProductStatus::Created),
            "InTransit" => Ok(ProductStatus::InTransit),
            "WithSeller" => Ok(ProductStatus::WithSeller),
            "Sold" => Ok(ProductStatus::Sold),
            "Reported" => Ok(ProductStatus::Reported),
            other => Err(serde::de::Error::custom(format!(
                "unknown product status: {}",
                other
            ))),
        }
    }
}

/// A registered product as returned by `getProductDetails`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: String,
    pub manufacturer: Address,
    pub current_owner: Address,
    /// Unix seconds of registration.
    pub manufacture_date: u64,
    pub manufacturer_name: String,
    pub product_details: String,
    pub manufacturing_location: String,
    pub status: ProductStatus,
    pub is_authentic: bool,
}

/// Input of `registerProduct`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRegistration {
    pub product_id: String,
    pub manufacturer_name: String,
    pub product_details: String,
    pub manufacturing_location: String,
}

/// One hop in a product's ownership chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub timestamp: u64,
}

/// A verification performed against a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub verifier: Address,
    pub timestamp: u64,
    pub is_authentic: bool,
}

// =============================================================================
// ROLES
// =============================================================================

/// Access-control roles granted inside the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Manufacturer,
    Seller,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Manufacturer, Role::Seller, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manufacturer => "manufacturer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }

    /// Name of the role constant in the contract.
    pub fn constant_name(&self) -> &'static str {
        match self {
            Role::Manufacturer => "MANUFACTURER_ROLE",
            Role::Seller => "SELLER_ROLE",
            Role::Admin => "DEFAULT_ADMIN_ROLE",
        }
    }

    /// AccessControl role identifier (`bytes32`).
    ///
    /// `DEFAULT_ADMIN_ROLE` is the zero hash; all other roles are the
    /// keccak256 of their constant name.
    pub fn role_id(&self) -> Hash {
        match self {
            Role::Admin => Hash::zero(),
            other => {
                let digest = Keccak256::digest(other.constant_name().as_bytes());
                Hash::from_slice(&digest)
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manufacturer" => Ok(Role::Manufacturer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            _ => Err(TypeError::UnknownRole(s.to_string())),
        }
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
