use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::entities::{databases, prelude::*};

/// Whether a database's embeddings reflect its current schema/metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    YetToSync,
    Syncing,
    Error,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::YetToSync => "yet_to_sync",
            Self::Syncing => "syncing",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "synced" => Some(Self::Synced),
            "yet_to_sync" => Some(Self::YetToSync),
            "syncing" => Some(Self::Syncing),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseRecord {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub connection: String,
    pub engine: String,
    pub sync_status: String,
    pub embeddings_ready: bool,
    pub created_by: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<databases::Model> for DatabaseRecord {
    fn from(model: databases::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            connection: model.connection,
            engine: model.engine,
            sync_status: model.sync_status,
            embeddings_ready: model.embeddings_ready,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub struct DatabaseRepository {
    conn: DatabaseConnection,
}

impl DatabaseRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        connection: &str,
        engine: &str,
        created_by: i32,
    ) -> Result<DatabaseRecord> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = databases::ActiveModel {
            name: Set(name.to_string()),
            description: Set(description.map(String::from)),
            connection: Set(connection.to_string()),
            engine: Set(engine.to_string()),
            sync_status: Set(SyncStatus::YetToSync.as_str().to_string()),
            embeddings_ready: Set(false),
            created_by: Set(created_by),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert database")?;

        Ok(DatabaseRecord::from(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<DatabaseRecord>> {
        let row = Databases::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query database")?;

        Ok(row.map(DatabaseRecord::from))
    }

    pub async fn list(&self) -> Result<Vec<DatabaseRecord>> {
        let rows = Databases::find()
            .order_by_asc(databases::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list databases")?;

        Ok(rows.into_iter().map(DatabaseRecord::from).collect())
    }

    pub async fn get_by_ids(&self, ids: &[i32]) -> Result<Vec<DatabaseRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Databases::find()
            .filter(databases::Column::Id.is_in(ids.to_vec()))
            .all(&self.conn)
            .await
            .context("Failed to query databases by IDs")?;

        Ok(rows.into_iter().map(DatabaseRecord::from).collect())
    }

    pub async fn update(
        &self,
        id: i32,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<DatabaseRecord>> {
        let Some(row) = Databases::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query database for update")?
        else {
            return Ok(None);
        };

        let mut active: databases::ActiveModel = row.into();
        if let Some(name) = name {
            active.name = Set(name.to_string());
        }
        if let Some(description) = description {
            active.description = Set(Some(description.to_string()));
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active.update(&self.conn).await?;
        Ok(Some(DatabaseRecord::from(model)))
    }

    pub async fn remove(&self, id: i32) -> Result<bool> {
        let result = Databases::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Flip `synced` to `yet_to_sync` after a mutation that invalidates
    /// embeddings. A single guarded UPDATE: already-unsynced rows
    /// (`yet_to_sync`, `syncing`, `error`) are left untouched, and the
    /// transition never runs in reverse.
    pub async fn mark_out_of_sync(&self, id: i32) -> Result<()> {
        let result = Databases::update_many()
            .col_expr(
                databases::Column::SyncStatus,
                sea_orm::sea_query::Expr::value(SyncStatus::YetToSync.as_str()),
            )
            .col_expr(
                databases::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(databases::Column::Id.eq(id))
            .filter(databases::Column::SyncStatus.eq(SyncStatus::Synced.as_str()))
            .exec(&self.conn)
            .await?;

        if result.rows_affected > 0 {
            debug!("Database {} marked yet_to_sync", id);
        }
        Ok(())
    }

    /// Used by external sync tooling to report progress/completion.
    pub async fn set_sync_status(
        &self,
        id: i32,
        status: SyncStatus,
        embeddings_ready: Option<bool>,
    ) -> Result<bool> {
        let mut update = Databases::update_many()
            .col_expr(
                databases::Column::SyncStatus,
                sea_orm::sea_query::Expr::value(status.as_str()),
            )
            .col_expr(
                databases::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(databases::Column::Id.eq(id));

        if let Some(ready) = embeddings_ready {
            update = update.col_expr(
                databases::Column::EmbeddingsReady,
                sea_orm::sea_query::Expr::value(ready),
            );
        }

        let result = update.exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
