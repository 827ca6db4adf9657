//! HTTP client for the DigiSeal REST API.

use std::time::Duration;

use digiseal_types::{ProductRegistration, Role};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use super::types::*;

/// Errors that can occur when talking to the API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("{message} (HTTP {status})")]
    Api { status: StatusCode, message: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// HTTP status of an API-level failure.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// DigiSeal API client.
pub struct DigiSealClient {
    client: Client,
    base_url: Url,
}

impl DigiSealClient {
    /// Create a new client. Writes wait for mining, so the timeout is generous.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(ClientError::Http)?;

        let raw = base_url.into();
        let base_url = Url::parse(&raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(raw));
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint URL from raw path segments; each is percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, ClientError> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ClientError::Connection(format!("Cannot connect to {}", self.base_url))
            } else {
                ClientError::Http(e)
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(status = status.as_u16(), len = bytes.len(), "API response");

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
                .map(|envelope| envelope.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ClientError::Api { status, message });
        }

        serde_json::from_slice(&bytes).map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn get<R: DeserializeOwned>(&self, segments: &[&str]) -> Result<R, ClientError> {
        self.send(self.client.get(self.url(segments))).await
    }

    async fn post<R: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: serde_json::Value,
    ) -> Result<R, ClientError> {
        self.send(self.client.post(self.url(segments)).json(&body)).await
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.get(&["api", "health"]).await
    }

    pub async fn product(&self, product_id: &str) -> Result<ProductEnvelope, ClientError> {
        self.get(&["api", "products", product_id]).await
    }

    pub async fn verify(&self, product_id: &str) -> Result<VerifyOutcome, ClientError> {
        self.post(&["api", "products", "verify"], json!({ "productId": product_id }))
            .await
    }

    pub async fn register(
        &self,
        registration: &ProductRegistration,
    ) -> Result<RegisterOutcome, ClientError> {
        let body = serde_json::to_value(registration).map_err(|e| ClientError::Parse(e.to_string()))?;
        self.post(&["api", "products", "register"], body).await
    }

    pub async fn transfer(&self, product_id: &str, new_owner: &str) -> Result<TxOutcome, ClientError> {
        self.post(
            &["api", "products", "transfer"],
            json!({ "productId": product_id, "newOwner": new_owner }),
        )
        .await
    }

    pub async fn report(&self, product_id: &str, reason: &str) -> Result<TxOutcome, ClientError> {
        self.post(
            &["api", "products", "report"],
            json!({ "productId": product_id, "reason": reason }),
        )
        .await
    }

    pub async fn history(&self, product_id: &str) -> Result<ProductHistory, ClientError> {
        self.get(&["api", "products", product_id, "history"])
            .await
    }

    pub async fn register_seller(&self, seller: &str) -> Result<TxOutcome, ClientError> {
        self.post(
            &["api", "users", "register-seller"],
            json!({ "sellerAddress": seller }),
        )
        .await
    }

    pub async fn owned(&self, address: &str) -> Result<ProductList, ClientError> {
        self.get(&["api", "users", address, "products", "owned"])
            .await
    }

    pub async fn manufactured(&self, address: &str) -> Result<ProductList, ClientError> {
        self.get(&["api", "users", address, "products", "manufactured"])
            .await
    }

    pub async fn roles(&self, address: &str) -> Result<AccountRoles, ClientError> {
        self.get(&["api", "users", address, "roles"]).await
    }

    pub async fn has_role(&self, address: &str, role: Role) -> Result<RoleCheck, ClientError> {
        self.get(&["api", "users", address, "roles", role.as_str()])
            .await
    }

    /// Check if the API is reachable.
    pub async fn is_connected(&self) -> bool {
        self.health().await.is_ok()
    }
}
