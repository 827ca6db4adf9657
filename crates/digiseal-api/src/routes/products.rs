//! `/api/products` handlers.

use super::{json_body, AppState, RequiredFields};
use crate::domain::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use digiseal_types::{
    parse_address, Hash, Product, ProductRegistration, TransferRecord, VerificationRecord,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub product_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub product_id: Option<String>,
    pub manufacturer_name: Option<String>,
    pub product_details: Option<String>,
    pub manufacturing_location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub product_id: Option<String>,
    pub new_owner: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub product_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub success: bool,
    pub product: Product,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub product_id: String,
    pub is_authentic: bool,
    pub product: Product,
    pub transaction_hash: Hash,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub product_id: String,
    pub transaction_hash: Hash,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub success: bool,
    pub message: &'static str,
    pub transaction_hash: Hash,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub success: bool,
    pub product_id: String,
    pub transfer_history: Vec<TransferRecord>,
    pub verification_history: Vec<VerificationRecord>,
}

/// GET /api/products/:productId
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<ProductResponse>> {
    let product = state
        .registry
        .get_product_details(&product_id)
        .await
        .map_err(|e| ApiError::lookup_failed("fetch product", e))?;

    Ok(Json(ProductResponse {
        success: true,
        product,
    }))
}

/// POST /api/products/verify
///
/// Looks the product up, records the verification on chain, then reads the
/// product back to report its authenticity. Only an unknown product is a 404;
/// a failed verification transaction is a 500 carrying the revert reason.
pub async fn verify_product(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<Json<VerifyResponse>> {
    let body = json_body(payload)?;
    let mut fields = RequiredFields::new();
    let product_id = fields.take("productId", body.product_id);
    fields.check()?;

    state
        .registry
        .get_product_details(&product_id)
        .await
        .map_err(|e| ApiError::lookup_failed("fetch product", e))?;

    let receipt = state
        .registry
        .verify_product(&product_id)
        .await
        .map_err(|e| ApiError::contract_failed("verify product", e))?;

    let product = state
        .registry
        .get_product_details(&product_id)
        .await
        .map_err(|e| ApiError::contract_failed("fetch product", e))?;

    info!(
        product_id = %product_id,
        authentic = product.is_authentic,
        tx_hash = ?receipt.transaction_hash,
        "Product verified"
    );

    Ok(Json(VerifyResponse {
        success: true,
        is_authentic: product.is_authentic,
        product_id,
        product,
        transaction_hash: receipt.transaction_hash,
    }))
}

/// POST /api/products/register
pub async fn register_product(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterResponse>> {
    let body = json_body(payload)?;
    let mut fields = RequiredFields::new();
    let registration = ProductRegistration {
        product_id: fields.take("productId", body.product_id),
        manufacturer_name: fields.take("manufacturerName", body.manufacturer_name),
        product_details: fields.take("productDetails", body.product_details),
        manufacturing_location: fields.take("manufacturingLocation", body.manufacturing_location),
    };
    fields.check()?;

    let receipt = state
        .registry
        .register_product(&registration)
        .await
        .map_err(|e| ApiError::contract_failed("register product", e))?;

    info!(product_id = %registration.product_id, tx_hash = ?receipt.transaction_hash, "Product registered");

    Ok(Json(RegisterResponse {
        success: true,
        message: "Product registered successfully",
        product_id: registration.product_id,
        transaction_hash: receipt.transaction_hash,
    }))
}

/// POST /api/products/transfer
pub async fn transfer_ownership(
    State(state): State<AppState>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<Json<TransactionResponse>> {
    let body = json_body(payload)?;
    let mut fields = RequiredFields::new();
    let product_id = fields.take("productId", body.product_id);
    let new_owner = fields.take("newOwner", body.new_owner);
    fields.check()?;

    let new_owner = parse_address(&new_owner)?;

    let receipt = state
        .registry
        .transfer_ownership(&product_id, new_owner)
        .await
        .map_err(|e| ApiError::contract_failed("transfer ownership", e))?;

    info!(product_id = %product_id, new_owner = ?new_owner, "Ownership transferred");

    Ok(Json(TransactionResponse {
        success: true,
        message: "Ownership transferred successfully",
        transaction_hash: receipt.transaction_hash,
    }))
}

/// GET /api/products/:productId/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let transfer_history = state
        .registry
        .get_transfer_history(&product_id)
        .await
        .map_err(|e| ApiError::lookup_failed("fetch product history", e))?;

    let verification_history = state
        .registry
        .get_verification_history(&product_id)
        .await
        .map_err(|e| ApiError::lookup_failed("fetch product history", e))?;

    Ok(Json(HistoryResponse {
        success: true,
        product_id,
        transfer_history,
        verification_history,
    }))
}

/// POST /api/products/report
pub async fn report_counterfeit(
    State(state): State<AppState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> ApiResult<Json<TransactionResponse>> {
    let body = json_body(payload)?;
    let mut fields = RequiredFields::new();
    let product_id = fields.take("productId", body.product_id);
    let reason = fields.take("reason", body.reason);
    fields.check()?;

    let receipt = state
        .registry
        .report_counterfeit(&product_id, &reason)
        .await
        .map_err(|e| ApiError::contract_failed("report counterfeit", e))?;

    info!(product_id = %product_id, "Counterfeit reported");

    Ok(Json(TransactionResponse {
        success: true,
        message: "Counterfeit report submitted successfully",
        transaction_hash: receipt.transaction_hash,
    }))
}
