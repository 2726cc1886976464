use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{chat_databases, chats, messages, prelude::*};

#[derive(Debug, Clone)]
pub struct Chat {
    pub id: i32,
    pub title: String,
    pub user_id: i32,
    pub database_ids: Vec<i32>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: i32,
    pub chat_id: i32,
    pub user_message: String,
    pub assistant_message: String,
    pub generated_query: Option<String>,
    pub result_object: Option<String>,
    pub created_at: String,
}

impl From<messages::Model> for ChatMessage {
    fn from(model: messages::Model) -> Self {
        Self {
            id: model.id,
            chat_id: model.chat_id,
            user_message: model.user_message,
            assistant_message: model.assistant_message,
            generated_query: model.generated_query,
            result_object: model.result_object,
            created_at: model.created_at,
        }
    }
}

pub struct ChatRepository {
    conn: DatabaseConnection,
}

impl ChatRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, title: &str, user_id: i32, database_ids: &[i32]) -> Result<Chat> {
        let now = chrono::Utc::now().to_rfc3339();

        let chat = chats::ActiveModel {
            title: Set(title.to_string()),
            user_id: Set(user_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert chat")?;

        for database_id in database_ids {
            chat_databases::ActiveModel {
                chat_id: Set(chat.id),
                database_id: Set(*database_id),
                ..Default::default()
            }
            .insert(&self.conn)
            .await
            .context("Failed to link chat database")?;
        }

        Ok(Chat {
            id: chat.id,
            title: chat.title,
            user_id: chat.user_id,
            database_ids: database_ids.to_vec(),
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        })
    }

    pub async fn get(&self, id: i32) -> Result<Option<Chat>> {
        let Some(chat) = Chats::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query chat")?
        else {
            return Ok(None);
        };

        Ok(Some(self.hydrate(chat).await?))
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<Chat>> {
        let rows = Chats::find()
            .filter(chats::Column::UserId.eq(user_id))
            .order_by_desc(chats::Column::UpdatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list chats")?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.hydrate(row).await?);
        }
        Ok(out)
    }

    pub async fn remove(&self, id: i32) -> Result<bool> {
        Messages::delete_many()
            .filter(messages::Column::ChatId.eq(id))
            .exec(&self.conn)
            .await?;
        ChatDatabases::delete_many()
            .filter(chat_databases::Column::ChatId.eq(id))
            .exec(&self.conn)
            .await?;

        let result = Chats::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn add_message(
        &self,
        chat_id: i32,
        user_message: &str,
        assistant_message: &str,
        generated_query: Option<&str>,
        result_object: Option<&str>,
    ) -> Result<ChatMessage> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = messages::ActiveModel {
            chat_id: Set(chat_id),
            user_message: Set(user_message.to_string()),
            assistant_message: Set(assistant_message.to_string()),
            generated_query: Set(generated_query.map(String::from)),
            result_object: Set(result_object.map(String::from)),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert message")?;

        // Bump the chat so listings sort by recent activity
        Chats::update_many()
            .col_expr(
                chats::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(chats::Column::Id.eq(chat_id))
            .exec(&self.conn)
            .await?;

        Ok(ChatMessage::from(model))
    }

    pub async fn list_messages(&self, chat_id: i32) -> Result<Vec<ChatMessage>> {
        let rows = Messages::find()
            .filter(messages::Column::ChatId.eq(chat_id))
            .order_by_asc(messages::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list messages")?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn hydrate(&self, chat: chats::Model) -> Result<Chat> {
        let database_ids: Vec<i32> = ChatDatabases::find()
            .filter(chat_databases::Column::ChatId.eq(chat.id))
            .all(&self.conn)
            .await
            .context("Failed to query chat databases")?
            .into_iter()
            .map(|r| r.database_id)
            .collect();

        Ok(Chat {
            id: chat.id,
            title: chat.title,
            user_id: chat.user_id,
            database_ids,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        })
    }
}
