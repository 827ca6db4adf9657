//! `/api/users` handlers.

use super::{json_body, AppState, RequiredFields};
use crate::domain::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use digiseal_types::{format_address, parse_address, Hash, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSellerRequest {
    pub seller_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSellerResponse {
    pub success: bool,
    pub message: &'static str,
    pub transaction_hash: Hash,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub success: bool,
    pub address: String,
    pub products: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RoleFlags {
    pub manufacturer: bool,
    pub seller: bool,
    pub admin: bool,
}

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub success: bool,
    pub address: String,
    pub roles: RoleFlags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HasRoleResponse {
    pub success: bool,
    pub address: String,
    pub role: Role,
    pub has_role: bool,
}

/// POST /api/users/register-seller
pub async fn register_seller(
    State(state): State<AppState>,
    payload: Result<Json<RegisterSellerRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterSellerResponse>> {
    let body = json_body(payload)?;
    let mut fields = RequiredFields::new();
    let seller = fields.take("sellerAddress", body.seller_address);
    fields.check()?;

    let seller = parse_address(&seller)?;

    let receipt = state
        .registry
        .register_seller(seller)
        .await
        .map_err(|e| ApiError::contract_failed("register seller", e))?;

    info!(seller = %format_address(&seller), "Seller registered");

    Ok(Json(RegisterSellerResponse {
        success: true,
        message: "Seller registered successfully",
        transaction_hash: receipt.transaction_hash,
    }))
}

/// GET /api/users/:address/products/owned
pub async fn products_owned(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<ProductListResponse>> {
    let owner = parse_address(&address)?;
    let products = state
        .registry
        .get_products_owned(owner)
        .await
        .map_err(|e| ApiError::contract_failed("fetch owned products", e))?;

    Ok(Json(ProductListResponse {
        success: true,
        address: format_address(&owner),
        products,
    }))
}

/// GET /api/users/:address/products/manufactured
pub async fn products_manufactured(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<ProductListResponse>> {
    let manufacturer = parse_address(&address)?;
    let products = state
        .registry
        .get_products_manufactured(manufacturer)
        .await
        .map_err(|e| ApiError::contract_failed("fetch manufactured products", e))?;

    Ok(Json(ProductListResponse {
        success: true,
        address: format_address(&manufacturer),
        products,
    }))
}

/// GET /api/users/:address/roles
pub async fn roles(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<RolesResponse>> {
    let account = parse_address(&address)?;

    let mut flags = [false; 3];
    for (flag, role) in flags.iter_mut().zip(Role::ALL) {
        *flag = state
            .registry
            .has_specific_role(role, account)
            .await
            .map_err(|e| ApiError::contract_failed("fetch roles", e))?;
    }
    let [manufacturer, seller, admin] = flags;

    Ok(Json(RolesResponse {
        success: true,
        address: format_address(&account),
        roles: RoleFlags {
            manufacturer,
            seller,
            admin,
        },
    }))
}

/// GET /api/users/:address/roles/:role
pub async fn has_role(
    State(state): State<AppState>,
    Path((address, role)): Path<(String, String)>,
) -> ApiResult<Json<HasRoleResponse>> {
    let account = parse_address(&address)?;
    let role: Role = role.parse()?;

    let has_role = state
        .registry
        .has_specific_role(role, account)
        .await
        .map_err(|e| ApiError::contract_failed("check role", e))?;

    Ok(Json(HasRoleResponse {
        success: true,
        address: format_address(&account),
        role,
        has_role,
    }))
}
