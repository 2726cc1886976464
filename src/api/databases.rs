use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, DatabaseDto, validation};
use crate::auth::ActorContext;
use crate::clients::TableInfo;
use crate::db::SyncStatus;

#[derive(Debug, Deserialize)]
pub struct CreateDatabaseRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Connection string for the backing database; write-only.
    pub connection: String,
    pub engine: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDatabaseRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetSkipRequest {
    pub skipped: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetFieldDescriptionRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct SetSyncStatusRequest {
    pub sync_status: String,
    #[serde(default)]
    pub embeddings_ready: Option<bool>,
}

fn require_admin(actor: &ActorContext) -> Result<(), ApiError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin role required"))
    }
}

/// Access resolution for one connection: admins see everything, session
/// users need a direct or team grant, key actors need a grant for their
/// owning team.
pub async fn actor_can_access_database(
    state: &AppState,
    actor: &ActorContext,
    database_id: i32,
) -> Result<bool, ApiError> {
    if actor.is_admin() {
        return Ok(true);
    }

    if let Some(user_id) = actor.user_id {
        let team_ids = state.store().team_ids_of_user(user_id).await?;
        return Ok(state
            .store()
            .user_has_database_access(user_id, &team_ids, database_id)
            .await?);
    }

    if let Some(team_id) = actor.team_id {
        return Ok(state
            .store()
            .team_has_database_access(team_id, database_id)
            .await?);
    }

    Ok(false)
}

async fn require_database_access(
    state: &AppState,
    actor: &ActorContext,
    database_id: i32,
) -> Result<(), ApiError> {
    if actor_can_access_database(state, actor, database_id).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden("No access to this database"))
    }
}

/// GET /databases — admins see all, everyone else only granted ones
pub async fn list_databases(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<ApiResponse<Vec<DatabaseDto>>>, ApiError> {
    let databases = state.store().list_databases().await?;

    let mut dtos = Vec::with_capacity(databases.len());
    for db in databases {
        if actor_can_access_database(&state, &actor, db.id).await? {
            dtos.push(DatabaseDto::from(db));
        }
    }

    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /databases (admin only)
pub async fn create_database(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<CreateDatabaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&actor)?;

    let name = validation::validate_name(&payload.name, "Database")?.to_string();
    if payload.connection.trim().is_empty() {
        return Err(ApiError::validation("Connection string is required"));
    }
    if payload.engine.trim().is_empty() {
        return Err(ApiError::validation("Engine is required"));
    }

    let created_by = actor.user_id.ok_or_else(ApiError::unauthenticated)?;
    let db = state
        .store()
        .create_database(
            &name,
            payload.description.as_deref(),
            payload.connection.trim(),
            payload.engine.trim(),
            created_by,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DatabaseDto::from(db))),
    ))
}

/// GET /databases/{id}
pub async fn get_database(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<DatabaseDto>>, ApiError> {
    validation::validate_id(id, "database")?;
    require_database_access(&state, &actor, id).await?;

    let db = state
        .store()
        .get_database(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Database", id))?;

    Ok(Json(ApiResponse::success(DatabaseDto::from(db))))
}

/// PUT /databases/{id} (admin only) — name and description only; the
/// connection string is immutable after registration
pub async fn update_database(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateDatabaseRequest>,
) -> Result<Json<ApiResponse<DatabaseDto>>, ApiError> {
    require_admin(&actor)?;
    validation::validate_id(id, "database")?;

    let name = match payload.name.as_deref() {
        Some(raw) => Some(validation::validate_name(raw, "Database")?.to_string()),
        None => None,
    };

    let db = state
        .store()
        .update_database(id, name.as_deref(), payload.description.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("Database", id))?;

    Ok(Json(ApiResponse::success(DatabaseDto::from(db))))
}

/// DELETE /databases/{id} (admin only)
pub async fn delete_database(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    require_admin(&actor)?;
    validation::validate_id(id, "database")?;

    let deleted = state.store().remove_database(id).await?;
    if deleted {
        Ok(Json(ApiResponse::success(true)))
    } else {
        Err(ApiError::not_found("Database", id))
    }
}

/// GET /databases/{id}/tables — schema metadata proxied from the vector
/// store
pub async fn list_tables(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<TableInfo>>>, ApiError> {
    validation::validate_id(id, "database")?;
    require_database_access(&state, &actor, id).await?;

    if state.store().get_database(id).await?.is_none() {
        return Err(ApiError::not_found("Database", id));
    }

    let tables = state.shared.vector_store.list_tables(id).await?;
    Ok(Json(ApiResponse::success(tables)))
}

/// PUT /databases/{id}/tables/{table}/skip
///
/// Any metadata edit pushes a synced connection back to yet_to_sync.
pub async fn set_table_skip(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path((id, table)): Path<(i32, String)>,
    Json(payload): Json<SetSkipRequest>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    validation::validate_id(id, "database")?;
    require_database_access(&state, &actor, id).await?;

    if state.store().get_database(id).await?.is_none() {
        return Err(ApiError::not_found("Database", id));
    }

    state
        .shared
        .vector_store
        .set_table_skip(id, &table, payload.skipped)
        .await?;

    state.store().mark_database_out_of_sync(id).await?;

    Ok(Json(ApiResponse::success(true)))
}

/// PUT /databases/{id}/tables/{table}/fields/{field}
pub async fn set_field_description(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path((id, table, field)): Path<(i32, String, String)>,
    Json(payload): Json<SetFieldDescriptionRequest>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    validation::validate_id(id, "database")?;
    require_database_access(&state, &actor, id).await?;

    if state.store().get_database(id).await?.is_none() {
        return Err(ApiError::not_found("Database", id));
    }

    state
        .shared
        .vector_store
        .set_field_description(id, &table, &field, &payload.description)
        .await?;

    state.store().mark_database_out_of_sync(id).await?;

    Ok(Json(ApiResponse::success(true)))
}

/// PUT /databases/{id}/sync-status (admin only) — set by the embedding
/// pipeline once a sync run completes
pub async fn set_sync_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
    Json(payload): Json<SetSyncStatusRequest>,
) -> Result<Json<ApiResponse<DatabaseDto>>, ApiError> {
    require_admin(&actor)?;
    validation::validate_id(id, "database")?;

    let status = SyncStatus::parse(&payload.sync_status).ok_or_else(|| {
        ApiError::validation(format!("Invalid sync status: {}", payload.sync_status))
    })?;

    let updated = state
        .store()
        .set_database_sync_status(id, status, payload.embeddings_ready)
        .await?;

    if !updated {
        return Err(ApiError::not_found("Database", id));
    }

    let db = state
        .store()
        .get_database(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Database", id))?;

    Ok(Json(ApiResponse::success(DatabaseDto::from(db))))
}
