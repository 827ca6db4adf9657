//! # In-process Ethereum node
//!
//! Serves the `eth_*` JSON-RPC methods the contract binding uses and runs
//! ProductVerification calls against [`MockProductRegistry`]. Calldata and
//! return data go through the real ABI codec, so the full wire path of
//! `RpcProductRegistry` is exercised.
//!
//! Reverts are reported the way the common dev nodes do it: Ganache-style
//! messages for `eth_sendTransaction`, Geth-style `data` payloads for
//! `eth_call`.

use axum::{extract::State, routing::post, Json, Router};
use digiseal_types::{format_address, Address, Hash, Product, Role, U256};
use parking_lot::Mutex;
use product_contract::abi::{self, Function, Token, REVERT_SELECTOR};
use product_contract::{binding, ContractError, MockProductRegistry, ProductRegistry};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

struct NodeState {
    registry: MockProductRegistry,
    contract: Address,
    account: Address,
    receipts: Mutex<HashMap<Hash, Value>>,
    pending_polls: AtomicUsize,
    tx_count: AtomicU64,
    methods: Mutex<Vec<String>>,
}

/// Running fake node; the server task stops when this is dropped.
pub struct FakeNode {
    url: String,
    state: Arc<NodeState>,
    task: JoinHandle<()>,
}

impl FakeNode {
    pub async fn spawn() -> std::io::Result<Self> {
        let account = Address::repeat_byte(0xa1);
        let state = Arc::new(NodeState {
            registry: MockProductRegistry::new(account),
            contract: Address::repeat_byte(0xc0),
            account,
            receipts: Mutex::new(HashMap::new()),
            pending_polls: AtomicUsize::new(0),
            tx_count: AtomicU64::new(0),
            methods: Mutex::new(Vec::new()),
        });
        state.registry.grant_role(Role::Admin, account);
        state.registry.grant_role(Role::Manufacturer, account);

        let app = Router::new()
            .route("/", post(handle_rpc))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { url, state, task })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Address the contract is "deployed" at.
    pub fn contract(&self) -> Address {
        self.state.contract
    }

    /// The single unlocked account.
    pub fn account(&self) -> Address {
        self.state.account
    }

    /// Contract state behind the node.
    pub fn registry(&self) -> &MockProductRegistry {
        &self.state.registry
    }

    /// Receipt lookups answer `null` this many times before a receipt appears.
    pub fn delay_receipts(&self, polls: usize) {
        self.state.pending_polls.store(polls, Ordering::SeqCst);
    }

    /// JSON-RPC methods received so far.
    pub fn methods(&self) -> Vec<String> {
        self.state.methods.lock().clone()
    }
}

impl Drop for FakeNode {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_rpc(State(state): State<Arc<NodeState>>, Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let method = req["method"].as_str().unwrap_or_default().to_string();
    state.methods.lock().push(method.clone());

    let outcome = match method.as_str() {
        "eth_accounts" => Ok(json!([format_address(&state.account)])),
        "eth_blockNumber" => Ok(json!(format!("{:#x}", state.tx_count.load(Ordering::SeqCst)))),
        "eth_call" => eth_call(&state, &req["params"][0]).await,
        "eth_sendTransaction" => send_transaction(&state, &req["params"][0]).await,
        "eth_getTransactionReceipt" => Ok(receipt(&state, &req["params"][0])),
        other => Err(json!({ "code": -32601, "message": format!("the method {} does not exist", other) })),
    };

    Json(match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(error) => json!({ "jsonrpc": "2.0", "id": id, "error": error }),
    })
}

async fn eth_call(state: &NodeState, call: &Value) -> Result<Value, Value> {
    if !targets_contract(state, call) {
        return Ok(json!("0x"));
    }
    match execute(state, call).await {
        Ok(output) => Ok(json!(format!("0x{}", hex::encode(output)))),
        Err(ContractError::Reverted { reason }) => {
            let reason = reason.unwrap_or_default();
            let mut data = REVERT_SELECTOR.to_vec();
            data.extend(abi::encode(&[Token::String(reason.clone())]));
            Err(json!({
                "code": 3,
                "message": format!("execution reverted: {}", reason),
                "data": format!("0x{}", hex::encode(data)),
            }))
        }
        Err(other) => Err(json!({ "code": -32000, "message": other.to_string() })),
    }
}

async fn send_transaction(state: &NodeState, tx: &Value) -> Result<Value, Value> {
    if !targets_contract(state, tx) {
        return Err(json!({ "code": -32000, "message": "transaction target is not a contract" }));
    }
    match execute(state, tx).await {
        Ok(_) => {
            let n = state.tx_count.fetch_add(1, Ordering::SeqCst) + 1;
            let hash = Hash::from_low_u64_be(0xd15e_0000 + n);
            state.receipts.lock().insert(
                hash,
                json!({
                    "transactionHash": hash,
                    "blockNumber": format!("{:#x}", n),
                    "gasUsed": "0x5208",
                    "status": "0x1",
                }),
            );
            Ok(json!(hash))
        }
        Err(ContractError::Reverted { reason }) => Err(json!({
            "code": -32000,
            "message": format!(
                "VM Exception while processing transaction: revert {}",
                reason.unwrap_or_default()
            ),
        })),
        Err(other) => Err(json!({ "code": -32000, "message": other.to_string() })),
    }
}

fn receipt(state: &NodeState, hash: &Value) -> Value {
    let pending = state
        .pending_polls
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if pending {
        return Value::Null;
    }

    serde_json::from_value::<Hash>(hash.clone())
        .ok()
        .and_then(|h| state.receipts.lock().get(&h).cloned())
        .unwrap_or(Value::Null)
}

fn targets_contract(state: &NodeState, call: &Value) -> bool {
    serde_json::from_value::<Address>(call["to"].clone())
        .map(|to| to == state.contract)
        .unwrap_or(false)
}

fn surface() -> Vec<Function> {
    vec![
        binding::register_product(),
        binding::verify_product(),
        binding::transfer_ownership(),
        binding::report_counterfeit(),
        binding::register_seller(),
        binding::get_product_details(),
        binding::get_transfer_history(),
        binding::get_verification_history(),
        binding::get_products_owned(),
        binding::get_products_manufactured(),
        binding::has_specific_role(),
    ]
}

/// Decodes calldata, runs it against the registry, encodes the result.
async fn execute(state: &NodeState, call: &Value) -> Result<Vec<u8>, ContractError> {
    let raw = call["data"].as_str().unwrap_or_default();
    let data = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| ContractError::MalformedResponse(e.to_string()))?;
    if data.len() < 4 {
        return Err(ContractError::Reverted { reason: None });
    }

    let function = surface()
        .into_iter()
        .find(|f| f.selector()[..] == data[..4])
        .ok_or(ContractError::Reverted { reason: None })?;
    let args = abi::decode(&function.inputs, &data[4..])?;
    let registry = &state.registry;

    let output = match (function.name, args.as_slice()) {
        ("registerProduct", [Token::String(id), Token::String(name), Token::String(details), Token::String(location)]) => {
            let registration = digiseal_types::ProductRegistration {
                product_id: id.clone(),
                manufacturer_name: name.clone(),
                product_details: details.clone(),
                manufacturing_location: location.clone(),
            };
            registry.register_product(&registration).await?;
            vec![]
        }
        ("verifyProduct", [Token::String(id)]) => {
            registry.verify_product(id).await?;
            let product = registry.get_product_details(id).await?;
            vec![Token::Bool(product.is_authentic)]
        }
        ("transferOwnership", [Token::String(id), Token::Address(to)]) => {
            registry.transfer_ownership(id, *to).await?;
            vec![]
        }
        ("reportCounterfeit", [Token::String(id), Token::String(reason)]) => {
            registry.report_counterfeit(id, reason).await?;
            vec![]
        }
        ("registerSeller", [Token::Address(seller)]) => {
            registry.register_seller(*seller).await?;
            vec![]
        }
        ("getProductDetails", [Token::String(id)]) => {
            product_tokens(registry.get_product_details(id).await?)
        }
        ("getTransferHistory", [Token::String(id)]) => {
            let records = registry.get_transfer_history(id).await?;
            vec![Token::Array(
                records
                    .into_iter()
                    .map(|r| {
                        Token::Tuple(vec![
                            Token::Address(r.from),
                            Token::Address(r.to),
                            Token::Uint(U256::from(r.timestamp)),
                        ])
                    })
                    .collect(),
            )]
        }
        ("getVerificationHistory", [Token::String(id)]) => {
            let records = registry.get_verification_history(id).await?;
            vec![Token::Array(
                records
                    .into_iter()
                    .map(|r| {
                        Token::Tuple(vec![
                            Token::Address(r.verifier),
                            Token::Uint(U256::from(r.timestamp)),
                            Token::Bool(r.is_authentic),
                        ])
                    })
                    .collect(),
            )]
        }
        ("getProductsOwned", [Token::Address(owner)]) => {
            string_array(registry.get_products_owned(*owner).await?)
        }
        ("getProductsManufactured", [Token::Address(maker)]) => {
            string_array(registry.get_products_manufactured(*maker).await?)
        }
        ("hasSpecificRole", [Token::FixedBytes(role_id), Token::Address(account)]) => {
            let role = Role::ALL
                .into_iter()
                .find(|r| r.role_id().as_bytes() == role_id.as_slice());
            let granted = match role {
                Some(role) => registry.has_specific_role(role, *account).await?,
                None => false,
            };
            vec![Token::Bool(granted)]
        }
        _ => return Err(ContractError::Reverted { reason: None }),
    };

    Ok(abi::encode(&output))
}

fn product_tokens(product: Product) -> Vec<Token> {
    vec![
        Token::String(product.product_id),
        Token::Address(product.manufacturer),
        Token::Address(product.current_owner),
        Token::Uint(U256::from(product.manufacture_date)),
        Token::String(product.manufacturer_name),
        Token::String(product.product_details),
        Token::String(product.manufacturing_location),
        Token::Uint(U256::from(product.status.code())),
        Token::Bool(product.is_authentic),
    ]
}

fn string_array(ids: Vec<String>) -> Vec<Token> {
    vec![Token::Array(ids.into_iter().map(Token::String).collect())]
}
