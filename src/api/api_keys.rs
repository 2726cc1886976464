use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiKeyDto, ApiResponse, AppState, CreatedApiKeyDto, validation};
use crate::auth::{ActorContext, api_key};

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub permissions: Vec<String>,
    /// Days until expiry; falls back to the configured default.
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

/// Key management is a session-holder concern: admins manage any team's
/// keys, users manage keys of teams they belong to. Key actors cannot
/// mint or revoke keys.
async fn authorize_key_management(
    state: &AppState,
    actor: &ActorContext,
    team_id: i32,
) -> Result<i32, ApiError> {
    let user_id = actor
        .user_id
        .ok_or_else(|| ApiError::forbidden("API keys cannot manage API keys"))?;

    if actor.is_admin() || state.store().is_team_member(team_id, user_id).await? {
        Ok(user_id)
    } else {
        Err(ApiError::forbidden("Not a member of this team"))
    }
}

/// GET /teams/{team_id}/api-keys
pub async fn list_api_keys(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(team_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<ApiKeyDto>>>, ApiError> {
    validation::validate_id(team_id, "team")?;
    authorize_key_management(&state, &actor, team_id).await?;

    if state.store().get_team(team_id).await?.is_none() {
        return Err(ApiError::not_found("Team", team_id));
    }

    let keys = state.store().list_api_keys_for_team(team_id).await?;
    let dtos: Vec<ApiKeyDto> = keys.into_iter().map(ApiKeyDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /teams/{team_id}/api-keys
///
/// The plaintext secret appears in this response and nowhere else; only
/// its digest is stored.
pub async fn create_api_key(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(team_id): Path<i32>,
    Json(payload): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_id(team_id, "team")?;
    let created_by = authorize_key_management(&state, &actor, team_id).await?;

    let name = validation::validate_name(&payload.name, "API key")?.to_string();
    validation::validate_scopes(&payload.permissions)?;

    if state.store().get_team(team_id).await?.is_none() {
        return Err(ApiError::not_found("Team", team_id));
    }

    let expiry_days = match payload.expires_in_days {
        Some(days) if days <= 0 => {
            return Err(ApiError::validation(
                "Expiry must be a positive number of days",
            ));
        }
        Some(days) => days,
        None => {
            state
                .config()
                .read()
                .await
                .security
                .api_key_default_expiry_days
        }
    };
    // A configured default of 0 means keys never expire
    let expires_at = (expiry_days > 0)
        .then(|| (chrono::Utc::now() + chrono::Duration::days(expiry_days)).to_rfc3339());

    let secret = api_key::generate_api_key();
    let record = state
        .store()
        .create_api_key(
            team_id,
            created_by,
            &name,
            api_key::lookup_prefix(&secret),
            &api_key::hash_api_key(&secret),
            &payload.permissions,
            expires_at.as_deref(),
        )
        .await?;

    tracing::info!("API key {} created for team {}", record.id, team_id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedApiKeyDto {
            api_key: secret,
            key: ApiKeyDto::from(record),
        })),
    ))
}

/// DELETE /teams/{team_id}/api-keys/{key_id}
///
/// Deactivation, not deletion: the row stays for usage history.
pub async fn deactivate_api_key(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path((team_id, key_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    validation::validate_id(team_id, "team")?;
    validation::validate_id(key_id, "API key")?;
    authorize_key_management(&state, &actor, team_id).await?;

    let key = state
        .store()
        .get_api_key(key_id)
        .await?
        .ok_or_else(|| ApiError::not_found("API key", key_id))?;

    if key.team_id != team_id {
        return Err(ApiError::not_found("API key", key_id));
    }

    state.store().deactivate_api_key(key_id).await?;
    tracing::info!("API key {} deactivated", key_id);

    Ok(Json(ApiResponse::success(true)))
}
