//! # ProductVerification ABI surface
//!
//! Function descriptions for every contract entry point this project calls,
//! plus conversions from decoded tokens to domain entities.

use crate::abi::{Function, ParamType, Token};
use crate::errors::ContractError;
use digiseal_types::{
    Address, Product, ProductRegistration, ProductStatus, TransferRecord, VerificationRecord, U256,
};

fn transfer_record_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Address,
        ParamType::Address,
        ParamType::Uint(256),
    ])
}

fn verification_record_type() -> ParamType {
    ParamType::Tuple(vec![ParamType::Address, ParamType::Uint(256), ParamType::Bool])
}

fn string_array() -> ParamType {
    ParamType::Array(Box::new(ParamType::String))
}

pub fn register_product() -> Function {
    Function::new(
        "registerProduct",
        vec![
            ParamType::String,
            ParamType::String,
            ParamType::String,
            ParamType::String,
        ],
        vec![],
    )
}

pub fn verify_product() -> Function {
    Function::new("verifyProduct", vec![ParamType::String], vec![ParamType::Bool])
}

pub fn transfer_ownership() -> Function {
    Function::new(
        "transferOwnership",
        vec![ParamType::String, ParamType::Address],
        vec![],
    )
}

pub fn report_counterfeit() -> Function {
    Function::new(
        "reportCounterfeit",
        vec![ParamType::String, ParamType::String],
        vec![],
    )
}

pub fn register_seller() -> Function {
    Function::new("registerSeller", vec![ParamType::Address], vec![])
}

pub fn get_product_details() -> Function {
    Function::new(
        "getProductDetails",
        vec![ParamType::String],
        vec![
            ParamType::String,
            ParamType::Address,
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::String,
            ParamType::String,
            ParamType::String,
            ParamType::Uint(8),
            ParamType::Bool,
        ],
    )
}

pub fn get_transfer_history() -> Function {
    Function::new(
        "getTransferHistory",
        vec![ParamType::String],
        vec![ParamType::Array(Box::new(transfer_record_type()))],
    )
}

pub fn get_verification_history() -> Function {
    Function::new(
        "getVerificationHistory",
        vec![ParamType::String],
        vec![ParamType::Array(Box::new(verification_record_type()))],
    )
}

pub fn get_products_owned() -> Function {
    Function::new("getProductsOwned", vec![ParamType::Address], vec![string_array()])
}

pub fn get_products_manufactured() -> Function {
    Function::new(
        "getProductsManufactured",
        vec![ParamType::Address],
        vec![string_array()],
    )
}

pub fn has_specific_role() -> Function {
    Function::new(
        "hasSpecificRole",
        vec![ParamType::FixedBytes(32), ParamType::Address],
        vec![ParamType::Bool],
    )
}

// =============================================================================
// ARGUMENTS
// =============================================================================

pub fn registration_tokens(registration: &ProductRegistration) -> Vec<Token> {
    vec![
        Token::String(registration.product_id.clone()),
        Token::String(registration.manufacturer_name.clone()),
        Token::String(registration.product_details.clone()),
        Token::String(registration.manufacturing_location.clone()),
    ]
}

// =============================================================================
// RESULTS
// =============================================================================

/// Sequential reader over decoded output tokens.
struct TokenReader<I: Iterator<Item = Token>> {
    tokens: I,
    context: &'static str,
}

impl<I: Iterator<Item = Token>> TokenReader<I> {
    fn new(tokens: impl IntoIterator<Item = Token, IntoIter = I>, context: &'static str) -> Self {
        Self {
            tokens: tokens.into_iter(),
            context,
        }
    }

    fn malformed(&self, expected: &str) -> ContractError {
        ContractError::MalformedResponse(format!("{}: expected {}", self.context, expected))
    }

    fn next(&mut self) -> Result<Token, ContractError> {
        self.tokens.next().ok_or_else(|| self.malformed("more values"))
    }

    fn string(&mut self) -> Result<String, ContractError> {
        let token = self.next()?;
        token.into_string().ok_or_else(|| self.malformed("string"))
    }

    fn address(&mut self) -> Result<Address, ContractError> {
        let token = self.next()?;
        token.into_address().ok_or_else(|| self.malformed("address"))
    }

    fn uint(&mut self) -> Result<U256, ContractError> {
        let token = self.next()?;
        token.into_uint().ok_or_else(|| self.malformed("uint"))
    }

    fn u64(&mut self) -> Result<u64, ContractError> {
        let value = self.uint()?;
        if value > U256::from(u64::MAX) {
            return Err(self.malformed("uint64-sized value"));
        }
        Ok(value.as_u64())
    }

    fn bool(&mut self) -> Result<bool, ContractError> {
        let token = self.next()?;
        token.into_bool().ok_or_else(|| self.malformed("bool"))
    }

    fn array(&mut self) -> Result<Vec<Token>, ContractError> {
        let token = self.next()?;
        token.into_array().ok_or_else(|| self.malformed("array"))
    }
}

pub fn product_from_tokens(tokens: Vec<Token>) -> Result<Product, ContractError> {
    let mut reader = TokenReader::new(tokens, "getProductDetails");

    let product_id = reader.string()?;
    let manufacturer = reader.address()?;
    let current_owner = reader.address()?;
    let manufacture_date = reader.u64()?;
    let manufacturer_name = reader.string()?;
    let product_details = reader.string()?;
    let manufacturing_location = reader.string()?;
    let status_code = reader.uint()?;
    let is_authentic = reader.bool()?;

    if status_code > U256::from(u8::MAX) {
        return Err(ContractError::MalformedResponse(format!(
            "getProductDetails: status out of range: {}",
            status_code
        )));
    }
    let status = ProductStatus::try_from(status_code.as_u32() as u8)?;

    Ok(Product {
        product_id,
        manufacturer,
        current_owner,
        manufacture_date,
        manufacturer_name,
        product_details,
        manufacturing_location,
        status,
        is_authentic,
    })
}

pub fn transfer_history_from_tokens(tokens: Vec<Token>) -> Result<Vec<TransferRecord>, ContractError> {
    let mut reader = TokenReader::new(tokens, "getTransferHistory");
    reader
        .array()?
        .into_iter()
        .map(|entry| {
            let fields = entry.into_tuple().ok_or_else(|| {
                ContractError::MalformedResponse("getTransferHistory: expected tuple".into())
            })?;
            let mut record = TokenReader::new(fields, "getTransferHistory");
            Ok(TransferRecord {
                from: record.address()?,
                to: record.address()?,
                timestamp: record.u64()?,
            })
        })
        .collect()
}

pub fn verification_history_from_tokens(
    tokens: Vec<Token>,
) -> Result<Vec<VerificationRecord>, ContractError> {
    let mut reader = TokenReader::new(tokens, "getVerificationHistory");
    reader
        .array()?
        .into_iter()
        .map(|entry| {
            let fields = entry.into_tuple().ok_or_else(|| {
                ContractError::MalformedResponse("getVerificationHistory: expected tuple".into())
            })?;
            let mut record = TokenReader::new(fields, "getVerificationHistory");
            Ok(VerificationRecord {
                verifier: record.address()?,
                timestamp: record.u64()?,
                is_authentic: record.bool()?,
            })
        })
        .collect()
}

pub fn product_ids_from_tokens(
    tokens: Vec<Token>,
    context: &'static str,
) -> Result<Vec<String>, ContractError> {
    let mut reader = TokenReader::new(tokens, context);
    reader
        .array()?
        .into_iter()
        .map(|token| {
            token
                .into_string()
                .ok_or_else(|| ContractError::MalformedResponse(format!("{}: expected string", context)))
        })
        .collect()
}

pub fn bool_from_tokens(tokens: Vec<Token>, context: &'static str) -> Result<bool, ContractError> {
    TokenReader::new(tokens, context).bool()
}
