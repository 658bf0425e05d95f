use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
};
use std::sync::Arc;

use super::auth::{CurrentUser, bearer_token};
use super::{ApiError, ApiResponse, AppState};
use crate::models::order::OrderGroup;
use crate::services::OrderItemInput;

/// POST /orders
/// Checkout works for guests too; a bearer token, when present, ties the
/// order to the account (and must be valid).
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(items): Json<Vec<OrderItemInput>>,
) -> Result<Json<ApiResponse<OrderGroup>>, ApiError> {
    let user_id = match bearer_token(&headers) {
        Some(token) => Some(state.auth_service().authenticate(&token).await?.id),
        None => None,
    };

    let group = state.order_service().checkout(user_id, &items).await?;

    Ok(Json(ApiResponse::success(group)))
}

/// GET /orders (admin)
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<OrderGroup>>>, ApiError> {
    let orders = state.store().list_orders().await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// GET /orders/{code} (admin)
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<OrderGroup>>, ApiError> {
    let order = state
        .store()
        .get_order_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &code))?;

    Ok(Json(ApiResponse::success(order)))
}

/// GET /orders/mine
pub async fn my_orders(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<OrderGroup>>>, ApiError> {
    let orders = state.store().list_orders_for_user(user.id).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// GET /orders/mine/{code}
/// The code matches case-insensitively so customers can read it back from
/// a receipt however it was written down.
pub async fn my_order_by_code(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<OrderGroup>>, ApiError> {
    let order = state
        .store()
        .get_order_for_user_by_code(user.id, &code)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", code.trim().to_uppercase()))?;

    Ok(Json(ApiResponse::success(order)))
}

/// PATCH /orders/{code}/collected (admin)
/// Marks every item row under the code as handed over.
pub async fn mark_collected(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<OrderGroup>>, ApiError> {
    let updated = state.store().mark_order_collected(&code).await?;
    if updated == 0 {
        return Err(ApiError::not_found("Order", &code));
    }

    let order = state
        .store()
        .get_order_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::internal(format!("Order {code} missing after update")))?;

    Ok(Json(ApiResponse::success(order)))
}
