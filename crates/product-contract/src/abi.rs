//! # Solidity ABI Codec
//!
//! Head/tail encoding of contract call arguments and return values, covering
//! the types the ProductVerification interface uses: addresses, unsigned
//! integers, booleans, strings, fixed bytes, dynamic arrays and tuples.
//!
//! Decoding treats the input as untrusted: every offset and length is bounds
//! checked against the input before any allocation.

use digiseal_types::Address;
use primitive_types::U256;
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// ABI word size in bytes.
pub const WORD: usize = 32;

/// `Error(string)` revert selector.
pub const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

// =============================================================================
// ERRORS
// =============================================================================

/// Errors raised while encoding or decoding ABI data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Read past the end of the input.
    #[error("data too short: need {needed} bytes at offset {offset}, have {available}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Word does not hold a legal value for its type.
    #[error("invalid {kind} value")]
    InvalidValue { kind: &'static str },

    /// Wrong number of call arguments.
    #[error("argument count mismatch: expected {expected}, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// Call argument does not match the declared parameter type.
    #[error("argument {index} does not match type {expected}")]
    TypeMismatch { index: usize, expected: String },

    /// String payload is not UTF-8.
    #[error("invalid utf-8 in string")]
    InvalidUtf8,
}

// =============================================================================
// TYPES AND TOKENS
// =============================================================================

/// Declared parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Address,
    /// Unsigned integer of the given bit width.
    Uint(usize),
    Bool,
    String,
    /// `bytesN` for N in 1..=32.
    FixedBytes(usize),
    /// Dynamic array `T[]`.
    Array(Box<ParamType>),
    Tuple(Vec<ParamType>),
}

impl ParamType {
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::String | ParamType::Array(_) => true,
            ParamType::Tuple(types) => types.iter().any(ParamType::is_dynamic),
            _ => false,
        }
    }

    /// Bytes occupied in the head of an enclosing tuple.
    fn head_size(&self) -> usize {
        match self {
            ParamType::Tuple(types) if !self.is_dynamic() => {
                types.iter().map(ParamType::head_size).sum()
            }
            _ => WORD,
        }
    }

    /// Canonical type name as used in function signatures.
    pub fn canonical(&self) -> String {
        match self {
            ParamType::Address => "address".to_string(),
            ParamType::Uint(bits) => format!("uint{}", bits),
            ParamType::Bool => "bool".to_string(),
            ParamType::String => "string".to_string(),
            ParamType::FixedBytes(n) => format!("bytes{}", n),
            ParamType::Array(inner) => format!("{}[]", inner.canonical()),
            ParamType::Tuple(types) => format!(
                "({})",
                types
                    .iter()
                    .map(ParamType::canonical)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }
}

/// Encoded or decoded ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
    FixedBytes(Vec<u8>),
    Array(Vec<Token>),
    Tuple(Vec<Token>),
}

impl Token {
    pub fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) | Token::Array(_) => true,
            Token::Tuple(tokens) => tokens.iter().any(Token::is_dynamic),
            _ => false,
        }
    }

    fn head_size(&self) -> usize {
        match self {
            Token::Tuple(tokens) if !self.is_dynamic() => tokens.iter().map(Token::head_size).sum(),
            _ => WORD,
        }
    }

    /// Whether this value can be encoded as `ty`.
    pub fn matches(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (Token::Address(_), ParamType::Address) => true,
            (Token::Uint(_), ParamType::Uint(_)) => true,
            (Token::Bool(_), ParamType::Bool) => true,
            (Token::String(_), ParamType::String) => true,
            (Token::FixedBytes(bytes), ParamType::FixedBytes(n)) => bytes.len() == *n,
            (Token::Array(items), ParamType::Array(inner)) => {
                items.iter().all(|item| item.matches(inner))
            }
            (Token::Tuple(tokens), ParamType::Tuple(types)) => {
                tokens.len() == types.len()
                    && tokens.iter().zip(types).all(|(t, ty)| t.matches(ty))
            }
            _ => false,
        }
    }

    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_uint(self) -> Option<U256> {
        match self {
            Token::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Token>> {
        match self {
            Token::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_tuple(self) -> Option<Vec<Token>> {
        match self {
            Token::Tuple(tokens) => Some(tokens),
            _ => None,
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// First four bytes of the keccak256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Encodes a sequence of values as an ABI tuple.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let mut out = Vec::new();
    encode_tuple(tokens, &mut out);
    out
}

fn encode_tuple(tokens: &[Token], out: &mut Vec<u8>) {
    let head_len: usize = tokens.iter().map(Token::head_size).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            encode_token(token, &mut tail);
        } else {
            encode_token(token, &mut head);
        }
    }

    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
}

fn encode_token(token: &Token, out: &mut Vec<u8>) {
    match token {
        Token::Address(address) => {
            out.extend_from_slice(&[0u8; 12]);
            out.extend_from_slice(address.as_bytes());
        }
        Token::Uint(value) => out.extend_from_slice(&uint_word(*value)),
        Token::Bool(flag) => out.extend_from_slice(&usize_word(usize::from(*flag))),
        Token::FixedBytes(bytes) => {
            let mut word = [0u8; WORD];
            let n = bytes.len().min(WORD);
            word[..n].copy_from_slice(&bytes[..n]);
            out.extend_from_slice(&word);
        }
        Token::String(s) => {
            let bytes = s.as_bytes();
            out.extend_from_slice(&usize_word(bytes.len()));
            out.extend_from_slice(bytes);
            let padding = (WORD - bytes.len() % WORD) % WORD;
            out.extend(std::iter::repeat(0u8).take(padding));
        }
        Token::Array(items) => {
            out.extend_from_slice(&usize_word(items.len()));
            encode_tuple(items, out);
        }
        Token::Tuple(tokens) => encode_tuple(tokens, out),
    }
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn usize_word(value: usize) -> [u8; WORD] {
    uint_word(U256::from(value))
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes ABI data laid out as a tuple of `types`.
///
/// Decoded strings and array elements together may not exceed the input
/// size, so offsets shared between elements cannot amplify a reply.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    Decoder::new(data).tuple(types, 0)
}

struct Decoder<'a> {
    data: &'a [u8],
    /// Bytes of output still allowed.
    budget: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            budget: data.len(),
        }
    }

    fn charge(&mut self, bytes: usize) -> Result<(), AbiError> {
        self.budget = self
            .budget
            .checked_sub(bytes)
            .ok_or(AbiError::InvalidValue { kind: "length" })?;
        Ok(())
    }

    fn tuple(&mut self, types: &[ParamType], base: usize) -> Result<Vec<Token>, AbiError> {
        let mut tokens = Vec::with_capacity(types.len());
        let mut cursor = base;

        for ty in types {
            if ty.is_dynamic() {
                let offset = read_usize(self.data, cursor)?;
                let position = base
                    .checked_add(offset)
                    .ok_or(AbiError::InvalidValue { kind: "offset" })?;
                tokens.push(self.dynamic(ty, position)?);
                cursor += WORD;
            } else {
                tokens.push(self.fixed(ty, cursor)?);
                cursor += ty.head_size();
            }
        }

        Ok(tokens)
    }

    fn fixed(&mut self, ty: &ParamType, position: usize) -> Result<Token, AbiError> {
        let data = self.data;
        match ty {
            ParamType::Address => {
                let word = read_word(data, position)?;
                Ok(Token::Address(Address::from_slice(&word[12..])))
            }
            ParamType::Uint(_) => {
                let word = read_word(data, position)?;
                Ok(Token::Uint(U256::from_big_endian(word)))
            }
            ParamType::Bool => {
                let value = U256::from_big_endian(read_word(data, position)?);
                if value.is_zero() {
                    Ok(Token::Bool(false))
                } else if value == U256::one() {
                    Ok(Token::Bool(true))
                } else {
                    Err(AbiError::InvalidValue { kind: "bool" })
                }
            }
            ParamType::FixedBytes(n) => {
                if *n == 0 || *n > WORD {
                    return Err(AbiError::InvalidValue { kind: "bytes length" });
                }
                let word = read_word(data, position)?;
                Ok(Token::FixedBytes(word[..*n].to_vec()))
            }
            ParamType::Tuple(types) => Ok(Token::Tuple(self.tuple(types, position)?)),
            ParamType::String | ParamType::Array(_) => self.dynamic(ty, position),
        }
    }

    fn dynamic(&mut self, ty: &ParamType, position: usize) -> Result<Token, AbiError> {
        let data = self.data;
        match ty {
            ParamType::String => {
                let len = read_usize(data, position)?;
                let bytes = read_slice(data, position + WORD, len)?;
                self.charge(len)?;
                String::from_utf8(bytes.to_vec())
                    .map(Token::String)
                    .map_err(|_| AbiError::InvalidUtf8)
            }
            ParamType::Array(inner) => {
                let len = read_usize(data, position)?;
                let start = position + WORD;
                // Every element needs at least its head in the input.
                let min_len = len
                    .checked_mul(inner.head_size())
                    .ok_or(AbiError::InvalidValue { kind: "array length" })?;
                read_slice(data, start, min_len)?;
                self.charge(len.saturating_mul(WORD))?;

                let types = vec![(**inner).clone(); len];
                Ok(Token::Array(self.tuple(&types, start)?))
            }
            ParamType::Tuple(types) => Ok(Token::Tuple(self.tuple(types, position)?)),
            other => self.fixed(other, position),
        }
    }
}

fn read_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], AbiError> {
    let out_of_bounds = AbiError::OutOfBounds {
        offset,
        needed: len,
        available: data.len(),
    };
    let end = offset.checked_add(len).ok_or_else(|| out_of_bounds.clone())?;
    data.get(offset..end).ok_or(out_of_bounds)
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    read_slice(data, offset, WORD)
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(read_word(data, offset)?);
    if value > U256::from(u32::MAX) {
        return Err(AbiError::InvalidValue { kind: "offset" });
    }
    Ok(value.as_usize())
}

/// Attempts to decode a revert reason from `Error(string)` output data.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if data.len() < 4 || data[..4] != REVERT_SELECTOR {
        return None;
    }

    decode(&[ParamType::String], &data[4..])
        .ok()?
        .into_iter()
        .next()?
        .into_string()
}

// =============================================================================
// FUNCTIONS
// =============================================================================

/// A contract function description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: &'static str,
    pub inputs: Vec<ParamType>,
    pub outputs: Vec<ParamType>,
}

impl Function {
    pub fn new(name: &'static str, inputs: Vec<ParamType>, outputs: Vec<ParamType>) -> Self {
        Self {
            name,
            inputs,
            outputs,
        }
    }

    /// Canonical signature, e.g. `transferOwnership(string,address)`.
    pub fn signature(&self) -> String {
        format!(
            "{}({})",
            self.name,
            self.inputs
                .iter()
                .map(ParamType::canonical)
                .collect::<Vec<_>>()
                .join(",")
        )
    }

    pub fn selector(&self) -> [u8; 4] {
        selector(&self.signature())
    }

    /// Builds calldata: selector followed by the encoded arguments.
    pub fn encode_input(&self, tokens: &[Token]) -> Result<Vec<u8>, AbiError> {
        if tokens.len() != self.inputs.len() {
            return Err(AbiError::ArityMismatch {
                expected: self.inputs.len(),
                actual: tokens.len(),
            });
        }

        for (index, (token, ty)) in tokens.iter().zip(&self.inputs).enumerate() {
            if !token.matches(ty) {
                return Err(AbiError::TypeMismatch {
                    index,
                    expected: ty.canonical(),
                });
            }
        }

        let mut data = self.selector().to_vec();
        data.extend_from_slice(&encode(tokens));
        Ok(data)
    }

    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, AbiError> {
        decode(&self.outputs, data)
    }
}
