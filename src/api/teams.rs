use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, TeamDto, validation};
use crate::auth::ActorContext;

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "member_ids")]
    pub members: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "member_ids")]
    pub members: Option<Vec<i32>>,
}

fn require_admin(actor: &ActorContext) -> Result<(), ApiError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin role required"))
    }
}

async fn validate_member_ids(state: &AppState, member_ids: &[i32]) -> Result<(), ApiError> {
    for id in member_ids {
        validation::validate_id(*id, "user")?;
    }
    let found = state.store().get_users_by_ids(member_ids).await?;
    if found.len() != member_ids.len() {
        return Err(ApiError::validation(
            "One or more member IDs do not exist",
        ));
    }
    Ok(())
}

/// GET /teams (admin only)
pub async fn list_teams(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<ApiResponse<Vec<TeamDto>>>, ApiError> {
    require_admin(&actor)?;

    let teams = state.store().list_teams().await?;
    let dtos: Vec<TeamDto> = teams.into_iter().map(TeamDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /teams (admin only), 201 on success, 409 on duplicate name
pub async fn create_team(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<CreateTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&actor)?;

    let name = validation::validate_name(&payload.name, "Team")?.to_string();

    if state.store().get_team_by_name(&name).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "Team '{}' already exists",
            name
        )));
    }

    validate_member_ids(&state, &payload.members).await?;

    let created_by = actor.user_id.ok_or_else(ApiError::unauthenticated)?;
    let team_id = state
        .store()
        .create_team(
            &name,
            payload.description.as_deref(),
            &payload.members,
            created_by,
        )
        .await?;

    let team = state
        .store()
        .get_team(team_id)
        .await?
        .ok_or_else(|| ApiError::internal("Team vanished after creation"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TeamDto::from(team))),
    ))
}

/// GET /teams/{id} (admin, or a member of the team)
pub async fn get_team(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TeamDto>>, ApiError> {
    validation::validate_id(id, "team")?;

    if !actor.is_admin() {
        let allowed = match (actor.user_id, actor.team_id) {
            (Some(user_id), _) => state.store().is_team_member(id, user_id).await?,
            (None, Some(team_id)) => team_id == id,
            (None, None) => false,
        };
        if !allowed {
            return Err(ApiError::forbidden("Not a member of this team"));
        }
    }

    let team = state
        .store()
        .get_team(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team", id))?;

    Ok(Json(ApiResponse::success(TeamDto::from(team))))
}

/// PUT /teams/{id} (admin only)
pub async fn update_team(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTeamRequest>,
) -> Result<Json<ApiResponse<TeamDto>>, ApiError> {
    require_admin(&actor)?;
    validation::validate_id(id, "team")?;

    let name = match payload.name.as_deref() {
        Some(raw) => {
            let name = validation::validate_name(raw, "Team")?.to_string();
            if let Some(existing) = state.store().get_team_by_name(&name).await?
                && existing.id != id
            {
                return Err(ApiError::Conflict(format!(
                    "Team '{}' already exists",
                    name
                )));
            }
            Some(name)
        }
        None => None,
    };

    if let Some(member_ids) = &payload.members {
        validate_member_ids(&state, member_ids).await?;
    }

    let team = state
        .store()
        .update_team(
            id,
            name.as_deref(),
            payload.description.as_deref(),
            payload.members.as_deref(),
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Team", id))?;

    Ok(Json(ApiResponse::success(TeamDto::from(team))))
}

/// DELETE /teams/{id} (admin only)
pub async fn delete_team(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    require_admin(&actor)?;
    validation::validate_id(id, "team")?;

    let deleted = state.store().remove_team(id).await?;
    if deleted {
        Ok(Json(ApiResponse::success(true)))
    } else {
        Err(ApiError::not_found("Team", id))
    }
}
