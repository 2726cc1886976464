use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, UserDto, validation};
use crate::auth::{ActorContext, Role, password};
use crate::db::UserUpdate;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

fn require_admin(actor: &ActorContext) -> Result<(), ApiError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin role required"))
    }
}

fn parse_role(raw: &str) -> Result<&'static str, ApiError> {
    match raw {
        "admin" => Ok(Role::Admin.as_str()),
        "user" => Ok(Role::User.as_str()),
        other => Err(ApiError::validation(format!("Invalid role: {}", other))),
    }
}

/// GET /users (admin only)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    require_admin(&actor)?;

    let users = state.store().list_users().await?;
    let dtos: Vec<UserDto> = users.into_iter().map(UserDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /users (admin only)
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&actor)?;

    let email = validation::validate_email(&payload.email)?.to_string();
    let name = validation::validate_name(&payload.name, "User")?.to_string();
    validation::validate_password(&payload.password)?;

    let role = match payload.role.as_deref() {
        Some(raw) => parse_role(raw)?,
        None => Role::User.as_str(),
    };

    // Pre-check so a duplicate reads as a validation problem, not a
    // unique-constraint error bubbling out of the store
    if state.store().get_user_by_email(&email).await?.is_some() {
        return Err(ApiError::validation("Email is already taken"));
    }

    let security = state.config().read().await.security.clone();
    let password_hash = password::hash_password_blocking(&payload.password, Some(&security))
        .await
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    let user = state
        .store()
        .create_user(&email, &name, &password_hash, role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}

/// GET /users/{id} (admin, or the user themselves)
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    validation::validate_id(id, "user")?;

    if !actor.is_admin() && actor.user_id != Some(id) {
        return Err(ApiError::forbidden("Cannot view other users"));
    }

    let user = state
        .store()
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PUT /users/{id} (admin only)
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    require_admin(&actor)?;
    validation::validate_id(id, "user")?;

    let name = match payload.name.as_deref() {
        Some(raw) => Some(validation::validate_name(raw, "User")?.to_string()),
        None => None,
    };
    let role = match payload.role.as_deref() {
        Some(raw) => Some(parse_role(raw)?.to_string()),
        None => None,
    };

    let update = UserUpdate {
        name,
        role,
        active: payload.active,
    };

    let user = state
        .store()
        .update_user(id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// DELETE /users/{id} (admin only)
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    require_admin(&actor)?;
    validation::validate_id(id, "user")?;

    if actor.user_id == Some(id) {
        return Err(ApiError::validation("Cannot delete your own account"));
    }

    let deleted = state.store().remove_user(id).await?;
    if deleted {
        Ok(Json(ApiResponse::success(true)))
    } else {
        Err(ApiError::not_found("User", id))
    }
}
