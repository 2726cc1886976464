use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;

use super::databases::actor_can_access_database;
use super::{ApiError, ApiResponse, AppState, QueryResponseDto, validation};
use crate::auth::ActorContext;
use crate::clients::ResultTable;
use crate::services::usage;

/// Scope an API key must carry to run queries.
pub const QUERY_SCOPE: &str = "query:read";

const DEFAULT_USED_BY: &str = "api-key";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub database_id: i32,
    /// Append the exchange to an existing chat (session actors only).
    #[serde(default)]
    pub chat_id: Option<i32>,
    /// Who is asking, for key-usage accounting. Ignored for sessions.
    #[serde(default)]
    pub user: Option<String>,
}

/// POST /query — run a natural-language question against one registered
/// database through the query engine.
pub async fn run_query(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    headers: HeaderMap,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<ApiResponse<QueryResponseDto>>, ApiError> {
    let question = validation::validate_question(&payload.question)?.to_string();
    validation::validate_id(payload.database_id, "database")?;

    // Key actors are scope-gated before any access resolution
    if actor.api_key_id.is_some() && !actor.has_permission(QUERY_SCOPE) {
        return Err(ApiError::forbidden(format!(
            "API key lacks the {} scope",
            QUERY_SCOPE
        )));
    }

    if !actor_can_access_database(&state, &actor, payload.database_id).await? {
        return Err(ApiError::forbidden("No access to this database"));
    }

    let database = state
        .store()
        .get_database(payload.database_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Database", payload.database_id))?;

    // Resolve the chat up front so an invalid chat_id fails before the
    // engine burns a run
    let chat = match payload.chat_id {
        Some(chat_id) => {
            validation::validate_id(chat_id, "chat")?;
            let user_id = actor
                .user_id
                .ok_or_else(|| ApiError::forbidden("Chats require an interactive session"))?;
            let chat = state
                .store()
                .get_chat(chat_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Chat", chat_id))?;
            if chat.user_id != user_id && !actor.is_admin() {
                return Err(ApiError::not_found("Chat", chat_id));
            }
            if !chat.database_ids.contains(&payload.database_id) {
                return Err(ApiError::validation(
                    "Chat does not reference this database",
                ));
            }
            Some(chat)
        }
        None => None,
    };

    let answer = state
        .shared
        .query_engine
        .execute(&database.connection, &database.engine, &question)
        .await?;

    if let Some(chat) = chat {
        state
            .store()
            .add_chat_message(
                chat.id,
                &question,
                &answer.answer,
                answer.generated_query.as_deref(),
                answer.result_object.as_deref(),
            )
            .await?;
    }

    // Accounting happens off the response path
    if let Some(key_id) = actor.api_key_id {
        let used_by = payload
            .user
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USED_BY.to_string());
        usage::record_usage(
            state.store().clone(),
            key_id,
            used_by,
            question.clone(),
            super::auth::client_ip(&headers),
        );
    }

    Ok(Json(ApiResponse::success(QueryResponseDto {
        answer: answer.answer,
        generated_query: answer.generated_query,
        result_object: answer.result_object,
    })))
}

/// GET /query/results/{key} — fetch a persisted result set from the
/// object store and decode it for display.
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<ResultTable>>, ApiError> {
    if actor.api_key_id.is_some() && !actor.has_permission(QUERY_SCOPE) {
        return Err(ApiError::forbidden(format!(
            "API key lacks the {} scope",
            QUERY_SCOPE
        )));
    }

    let bytes = state
        .shared
        .object_store
        .fetch_object(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Result object '{}' not found", key)))?;

    let table = state.decoder.decode(&bytes)?;
    Ok(Json(ApiResponse::success(table)))
}
