use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::databases::actor_can_access_database;
use super::{ApiError, ApiResponse, AppState, ChatDto, MessageDto, validation};
use crate::auth::ActorContext;

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub title: String,
    pub database_ids: Vec<i32>,
}

/// Chats are personal: key actors have no user identity and therefore no
/// chat history.
fn require_user(actor: &ActorContext) -> Result<i32, ApiError> {
    actor
        .user_id
        .ok_or_else(|| ApiError::forbidden("Chats require an interactive session"))
}

async fn owned_chat(
    state: &AppState,
    actor: &ActorContext,
    chat_id: i32,
) -> Result<crate::db::Chat, ApiError> {
    let user_id = require_user(actor)?;

    let chat = state
        .store()
        .get_chat(chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat", chat_id))?;

    // Someone else's chat reads as missing rather than forbidden
    if chat.user_id != user_id && !actor.is_admin() {
        return Err(ApiError::not_found("Chat", chat_id));
    }

    Ok(chat)
}

/// GET /chats — caller's own chats
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<ApiResponse<Vec<ChatDto>>>, ApiError> {
    let user_id = require_user(&actor)?;

    let chats = state.store().list_chats_for_user(user_id).await?;
    let dtos: Vec<ChatDto> = chats.into_iter().map(ChatDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /chats
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require_user(&actor)?;

    let title = validation::validate_name(&payload.title, "Chat")?.to_string();
    if payload.database_ids.is_empty() {
        return Err(ApiError::validation(
            "A chat must reference at least one database",
        ));
    }

    for id in &payload.database_ids {
        validation::validate_id(*id, "database")?;
    }

    let found = state
        .store()
        .get_databases_by_ids(&payload.database_ids)
        .await?;
    if found.len() != payload.database_ids.len() {
        return Err(ApiError::validation(
            "One or more database IDs do not exist",
        ));
    }

    for id in &payload.database_ids {
        if !actor_can_access_database(&state, &actor, *id).await? {
            return Err(ApiError::forbidden(format!(
                "No access to database {}",
                id
            )));
        }
    }

    let chat = state
        .store()
        .create_chat(&title, user_id, &payload.database_ids)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ChatDto::from(chat))),
    ))
}

/// GET /chats/{id}
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ChatDto>>, ApiError> {
    validation::validate_id(id, "chat")?;

    let chat = owned_chat(&state, &actor, id).await?;
    Ok(Json(ApiResponse::success(ChatDto::from(chat))))
}

/// GET /chats/{id}/messages — full history, oldest first
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<MessageDto>>>, ApiError> {
    validation::validate_id(id, "chat")?;

    let chat = owned_chat(&state, &actor, id).await?;
    let messages = state.store().list_chat_messages(chat.id).await?;
    let dtos: Vec<MessageDto> = messages.into_iter().map(MessageDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// DELETE /chats/{id}
pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    validation::validate_id(id, "chat")?;

    let chat = owned_chat(&state, &actor, id).await?;
    state.store().remove_chat(chat.id).await?;
    Ok(Json(ApiResponse::success(true)))
}
