use serde::Serialize;

use crate::db::{AccessRecord, ApiKeyRecord, Chat, ChatMessage, DatabaseRecord, TeamWithMembers, User};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Member entry on a team detail: populated name/email, not a raw id.
#[derive(Debug, Serialize)]
pub struct MemberDto {
    pub id: i32,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TeamDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub member_count: usize,
    pub members: Vec<MemberDto>,
    pub created_by: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TeamWithMembers> for TeamDto {
    fn from(detail: TeamWithMembers) -> Self {
        let members: Vec<MemberDto> = detail
            .members
            .into_iter()
            .map(|m| MemberDto {
                id: m.id,
                name: m.name,
                email: m.email,
            })
            .collect();

        Self {
            id: detail.team.id,
            name: detail.team.name,
            description: detail.team.description,
            member_count: members.len(),
            members,
            created_by: detail.team.created_by,
            created_at: detail.team.created_at,
            updated_at: detail.team.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DatabaseDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub engine: String,
    pub sync_status: String,
    pub embeddings_ready: bool,
    pub created_by: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<DatabaseRecord> for DatabaseDto {
    fn from(db: DatabaseRecord) -> Self {
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            engine: db.engine,
            sync_status: db.sync_status,
            embeddings_ready: db.embeddings_ready,
            created_by: db.created_by,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessDto {
    pub id: i32,
    pub access_type: String,
    pub team_id: Option<i32>,
    pub user_id: Option<i32>,
    pub database_id: i32,
    pub created_by: i32,
    pub created_at: String,
}

impl From<AccessRecord> for AccessDto {
    fn from(access: AccessRecord) -> Self {
        Self {
            id: access.id,
            access_type: access.access_type,
            team_id: access.team_id,
            user_id: access.user_id,
            database_id: access.database_id,
            created_by: access.created_by,
            created_at: access.created_at,
        }
    }
}

/// API key listing entry. The secret digest never leaves the store layer;
/// only the public prefix is shown.
#[derive(Debug, Serialize)]
pub struct ApiKeyDto {
    pub id: i32,
    pub team_id: i32,
    pub name: String,
    pub prefix: String,
    pub permissions: Vec<String>,
    pub active: bool,
    pub expires_at: Option<String>,
    pub usage_count: i64,
    pub last_used_at: Option<String>,
    pub last_used_by: Option<String>,
    pub last_query: Option<String>,
    pub last_used_ip: Option<String>,
    pub created_at: String,
}

impl From<ApiKeyRecord> for ApiKeyDto {
    fn from(key: ApiKeyRecord) -> Self {
        Self {
            id: key.id,
            team_id: key.team_id,
            name: key.name,
            prefix: key.prefix,
            permissions: key.permissions,
            active: key.active,
            expires_at: key.expires_at,
            usage_count: key.usage_count,
            last_used_at: key.last_used_at,
            last_used_by: key.last_used_by,
            last_query: key.last_query,
            last_used_ip: key.last_used_ip,
            created_at: key.created_at,
        }
    }
}

/// Returned once, on creation only: the plaintext secret alongside the
/// stored descriptor.
#[derive(Debug, Serialize)]
pub struct CreatedApiKeyDto {
    pub api_key: String,
    #[serde(flatten)]
    pub key: ApiKeyDto,
}

#[derive(Debug, Serialize)]
pub struct ChatDto {
    pub id: i32,
    pub title: String,
    pub user_id: i32,
    pub database_ids: Vec<i32>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Chat> for ChatDto {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            title: chat.title,
            user_id: chat.user_id,
            database_ids: chat.database_ids,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageDto {
    pub id: i32,
    pub chat_id: i32,
    pub user_message: String,
    pub assistant_message: String,
    pub generated_query: Option<String>,
    pub result_object: Option<String>,
    pub created_at: String,
}

impl From<ChatMessage> for MessageDto {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            user_message: message.user_message,
            assistant_message: message.assistant_message,
            generated_query: message.generated_query,
            result_object: message.result_object,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponseDto {
    pub answer: String,
    pub generated_query: Option<String>,
    pub result_object: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub users: usize,
    pub teams: usize,
    pub databases: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
