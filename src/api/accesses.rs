use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{AccessDto, ApiError, ApiResponse, AppState, validation};
use crate::auth::ActorContext;

#[derive(Debug, Deserialize)]
pub struct CreateAccessRequest {
    /// Exactly one of `team_id` / `user_id` must be set.
    #[serde(default)]
    pub team_id: Option<i32>,
    #[serde(default)]
    pub user_id: Option<i32>,
    pub database_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct ListAccessQuery {
    #[serde(default)]
    pub database_id: Option<i32>,
}

fn require_admin(actor: &ActorContext) -> Result<(), ApiError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin role required"))
    }
}

/// GET /accesses (admin only), optionally filtered by database
pub async fn list_accesses(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<ListAccessQuery>,
) -> Result<Json<ApiResponse<Vec<AccessDto>>>, ApiError> {
    require_admin(&actor)?;

    let accesses = match query.database_id {
        Some(database_id) => {
            validation::validate_id(database_id, "database")?;
            state.store().list_accesses_for_database(database_id).await?
        }
        None => state.store().list_accesses().await?,
    };

    let dtos: Vec<AccessDto> = accesses.into_iter().map(AccessDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /accesses (admin only)
pub async fn create_access(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<CreateAccessRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&actor)?;
    validation::validate_id(payload.database_id, "database")?;

    let (access_type, team_id, user_id) = match (payload.team_id, payload.user_id) {
        (Some(team_id), None) => {
            validation::validate_id(team_id, "team")?;
            if state.store().get_team(team_id).await?.is_none() {
                return Err(ApiError::not_found("Team", team_id));
            }
            ("team", Some(team_id), None)
        }
        (None, Some(user_id)) => {
            validation::validate_id(user_id, "user")?;
            if state.store().get_user(user_id).await?.is_none() {
                return Err(ApiError::not_found("User", user_id));
            }
            ("user", None, Some(user_id))
        }
        _ => {
            return Err(ApiError::validation(
                "Exactly one of team_id or user_id must be provided",
            ));
        }
    };

    if state
        .store()
        .get_database(payload.database_id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Database", payload.database_id));
    }

    let created_by = actor.user_id.ok_or_else(ApiError::unauthenticated)?;
    let access = state
        .store()
        .create_access(access_type, team_id, user_id, payload.database_id, created_by)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AccessDto::from(access))),
    ))
}

/// DELETE /accesses/{id} (admin only)
pub async fn delete_access(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    require_admin(&actor)?;
    validation::validate_id(id, "access grant")?;

    let deleted = state.store().remove_access(id).await?;
    if deleted {
        Ok(Json(ApiResponse::success(true)))
    } else {
        Err(ApiError::not_found("Access grant", id))
    }
}
