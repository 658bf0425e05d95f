use axum::{
    Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, TokenResponse, UserDto};
use crate::db::User;

/// Authenticated user attached to the request by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Requires a valid (non-revoked) bearer access token and attaches the
/// resolved user to the request.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let user = state.auth_service().authenticate(&token).await?;

    tracing::Span::current().record("user_id", user.id);
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Layered after [`auth_middleware`] on admin-only routes.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    if !user.0.is_admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .auth_service()
        .register(&payload.username, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let (user, pair) = state
        .auth_service()
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "bearer",
        user: UserDto::from(user),
    })))
}

/// POST /auth/refresh
/// Rotates the refresh token: the presented one is revoked and a new pair
/// is issued.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let (user, pair) = state.auth_service().refresh(&payload.refresh_token).await?;

    Ok(Json(ApiResponse::success(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "bearer",
        user: UserDto::from(user),
    })))
}

/// POST /auth/logout
/// Revokes the presented access token, plus the refresh token when the
/// client includes it in the body.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Option<Json<LogoutRequest>>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let refresh_token = payload.and_then(|Json(p)| p.refresh_token);

    state
        .auth_service()
        .logout(&token, refresh_token.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    })))
}

/// GET /auth/me
pub async fn get_current_user(
    axum::Extension(CurrentUser(user)): axum::Extension<CurrentUser>,
) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto::from(user)))
}
