use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse, UserDto, validation};
use crate::auth::{ActorContext, Identity, api_key, password};

pub const SESSION_USER_KEY: &str = "user_id";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware. Resolves identity once per request:
/// 1. Session cookie (from login)
/// 2. `Authorization: Bearer <api key>` header
///
/// The normalized [`ActorContext`] lands in request extensions for
/// handlers to authorize against. Both missing and invalid credentials
/// produce the same 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_KEY).await
        && let Ok(Some(user)) = state.store().get_user(user_id).await
        && user.active
    {
        tracing::Span::current().record("user_id", user.id);
        let actor = ActorContext::resolve(Identity::Session { user });
        request.extensions_mut().insert(actor);
        return Ok(next.run(request).await);
    }

    if let Some(secret) = extract_bearer_token(&headers)
        && let Ok(Some(key)) = api_key::validate(state.store(), &secret).await
    {
        tracing::Span::current().record("api_key_id", key.id);
        let actor = ActorContext::resolve(Identity::ApiKey { key });
        request.extensions_mut().insert(actor);
        return Ok(next.run(request).await);
    }

    Err(ApiError::unauthenticated())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?;
    Some(token.trim().to_string())
}

/// Source IP for usage accounting, taken from the forwarded header when
/// a proxy supplies one.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with email and password, establishes a session cookie
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let credentials = state
        .store()
        .get_user_credentials(&payload.email)
        .await
        .map_err(|e| ApiError::internal(format!("Authentication error: {e}")))?;

    // Same rejection whether the account is unknown, inactive, or the
    // password is wrong
    let Some((user, password_hash)) = credentials else {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    let is_valid = password::verify_password_blocking(&payload.password, &password_hash)
        .await
        .map_err(|e| ApiError::internal(format!("Password verification error: {e}")))?;

    if !is_valid || !user.active {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    if let Err(e) = session.insert(SESSION_USER_KEY, user.id).await {
        return Err(ApiError::internal(format!("Failed to create session: {e}")));
    }

    tracing::info!("User {} logged in", user.id);

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/me
/// Current user profile (session actors only)
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user_id = actor.user_id.ok_or_else(ApiError::unauthenticated)?;

    let user = state
        .store()
        .get_user(user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PUT /auth/password
/// Change own password (requires current password verification)
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = actor.user_id.ok_or_else(ApiError::unauthenticated)?;

    validation::validate_password(&payload.new_password)?;

    if payload.current_password == payload.new_password {
        return Err(ApiError::validation(
            "New password must be different from current password",
        ));
    }

    let user = state
        .store()
        .get_user(user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    let credentials = state
        .store()
        .get_user_credentials(&user.email)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get credentials: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    let is_valid =
        password::verify_password_blocking(&payload.current_password, &credentials.1)
            .await
            .map_err(|e| ApiError::internal(format!("Password verification error: {e}")))?;

    if !is_valid {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    let security = state.config().read().await.security.clone();
    let new_hash = password::hash_password_blocking(&payload.new_password, Some(&security))
        .await
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    state
        .store()
        .update_user_password(user_id, &new_hash)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update password: {e}")))?;

    tracing::info!("Password changed for user {}", user_id);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}
