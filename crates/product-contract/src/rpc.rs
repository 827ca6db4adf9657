//! # Ethereum JSON-RPC transport
//!
//! Minimal HTTP JSON-RPC 2.0 client for the handful of `eth_*` methods a
//! contract binding needs.

use crate::abi::decode_revert_reason;
use crate::errors::ContractError;
use digiseal_types::{Address, Hash, U256};
use reqwest::Client;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Bytes with `0x` hex serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl Serialize for Bytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s)
            .map(Bytes)
            .map_err(|_| de::Error::custom("invalid hex bytes"))
    }
}

/// Call object for `eth_call` and `eth_sendTransaction`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
}

/// Subset of `eth_getTransactionReceipt` this binding uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: Hash,
    #[serde(default)]
    pub block_number: Option<U256>,
    #[serde(default)]
    pub gas_used: Option<U256>,
    /// `0x1` success, `0x0` failure. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U256>,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status.map(|s| !s.is_zero()).unwrap_or(true)
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse<R> {
    #[serde(default = "Option::default")]
    result: Option<R>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RpcErrorObject {
    /// Classifies the error, lifting contract reverts out of generic failures.
    pub fn into_contract_error(self) -> ContractError {
        let lowered = self.message.to_lowercase();
        if !lowered.contains("revert") {
            return ContractError::Rpc {
                code: self.code,
                message: self.message,
            };
        }

        let reason = self
            .data
            .as_ref()
            .and_then(reason_from_data)
            .or_else(|| reason_from_message(&self.message));
        ContractError::Reverted { reason }
    }
}

/// Extracts a revert reason from the `data` member of an error object.
///
/// Geth-style nodes put the raw `Error(string)` payload here as a hex
/// string; Ganache nests an object carrying a `reason` field.
fn reason_from_data(data: &serde_json::Value) -> Option<String> {
    match data {
        serde_json::Value::String(s) => {
            let raw = hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()?;
            decode_revert_reason(&raw)
        }
        serde_json::Value::Object(map) => {
            if let Some(reason) = map.get("reason").and_then(|r| r.as_str()) {
                return Some(reason.to_string());
            }
            map.values().find_map(reason_from_data)
        }
        _ => None,
    }
}

/// Parses the text after the revert keyword, as in
/// `"VM Exception while processing transaction: revert Product does not exist"`
/// or `"execution reverted: Product does not exist"`.
fn reason_from_message(message: &str) -> Option<String> {
    let lowered = message.to_lowercase();
    let (keyword, index) = ["reverted:", "reverted", "revert"]
        .iter()
        .find_map(|k| lowered.find(k).map(|i| (*k, i)))?;
    let reason = message.get(index + keyword.len()..)?.trim();
    if reason.is_empty() {
        None
    } else {
        Some(reason.to_string())
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP JSON-RPC client for an Ethereum node.
pub struct JsonRpcClient {
    client: Client,
    url: String,
    request_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ContractError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Sends a request; `Ok(None)` when the node answered with a null result.
    async fn request<P, R>(&self, method: &str, params: P) -> Result<Option<R>, ContractError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id();
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        debug!(method, id, url = %self.url, "JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ContractError::Transport(format!("cannot connect to {}", self.url))
                } else {
                    ContractError::from(e)
                }
            })?;

        let status = response.status();
        let body: JsonRpcResponse<R> = response.json().await.map_err(|e| {
            ContractError::MalformedResponse(format!("{} (HTTP {}): {}", method, status, e))
        })?;

        if let Some(error) = body.error {
            let error = error.into_contract_error();
            warn!(method, id, error = %error, "JSON-RPC call failed");
            return Err(error);
        }

        Ok(body.result)
    }

    async fn call_required<P, R>(&self, method: &str, params: P) -> Result<R, ContractError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.request(method, params)
            .await?
            .ok_or_else(|| ContractError::MalformedResponse(format!("{}: missing result", method)))
    }

    /// `eth_accounts`
    pub async fn accounts(&self) -> Result<Vec<Address>, ContractError> {
        self.call_required("eth_accounts", [(); 0]).await
    }

    /// `eth_blockNumber`
    pub async fn block_number(&self) -> Result<U256, ContractError> {
        self.call_required("eth_blockNumber", [(); 0]).await
    }

    /// `eth_call` against the latest block.
    pub async fn call(&self, call: &CallRequest) -> Result<Bytes, ContractError> {
        let output: Bytes = self
            .call_required("eth_call", (call, "latest"))
            .await?;

        // Some nodes report reverts as a successful call returning Error(string).
        if let Some(reason) = decode_revert_reason(output.as_slice()) {
            return Err(ContractError::reverted(reason));
        }
        Ok(output)
    }

    /// `eth_sendTransaction`, signed by the node.
    pub async fn send_transaction(&self, tx: &CallRequest) -> Result<Hash, ContractError> {
        self.call_required("eth_sendTransaction", [tx]).await
    }

    /// `eth_getTransactionReceipt`; `None` while the transaction is pending.
    pub async fn transaction_receipt(
        &self,
        tx_hash: Hash,
    ) -> Result<Option<TransactionReceipt>, ContractError> {
        self.request("eth_getTransactionReceipt", [tx_hash]).await
    }
}
