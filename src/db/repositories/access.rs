use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{accesses, prelude::*};

#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub id: i32,
    pub access_type: String,
    pub team_id: Option<i32>,
    pub user_id: Option<i32>,
    pub database_id: i32,
    pub created_by: i32,
    pub created_at: String,
}

impl From<accesses::Model> for AccessRecord {
    fn from(model: accesses::Model) -> Self {
        Self {
            id: model.id,
            access_type: model.access_type,
            team_id: model.team_id,
            user_id: model.user_id,
            database_id: model.database_id,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

pub struct AccessRepository {
    conn: DatabaseConnection,
}

impl AccessRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        access_type: &str,
        team_id: Option<i32>,
        user_id: Option<i32>,
        database_id: i32,
        created_by: i32,
    ) -> Result<AccessRecord> {
        let model = accesses::ActiveModel {
            access_type: Set(access_type.to_string()),
            team_id: Set(team_id),
            user_id: Set(user_id),
            database_id: Set(database_id),
            created_by: Set(created_by),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert access grant")?;

        Ok(AccessRecord::from(model))
    }

    pub async fn list(&self) -> Result<Vec<AccessRecord>> {
        let rows = Accesses::find()
            .order_by_asc(accesses::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list access grants")?;

        Ok(rows.into_iter().map(AccessRecord::from).collect())
    }

    pub async fn list_for_database(&self, database_id: i32) -> Result<Vec<AccessRecord>> {
        let rows = Accesses::find()
            .filter(accesses::Column::DatabaseId.eq(database_id))
            .all(&self.conn)
            .await
            .context("Failed to query access grants for database")?;

        Ok(rows.into_iter().map(AccessRecord::from).collect())
    }

    pub async fn remove(&self, id: i32) -> Result<bool> {
        let result = Accesses::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Whether a direct user grant or any of the caller's team grants
    /// covers this database.
    pub async fn user_has_access(
        &self,
        user_id: i32,
        team_ids: &[i32],
        database_id: i32,
    ) -> Result<bool> {
        let mut cond = Condition::any().add(
            Condition::all()
                .add(accesses::Column::AccessType.eq("user"))
                .add(accesses::Column::UserId.eq(user_id)),
        );

        if !team_ids.is_empty() {
            cond = cond.add(
                Condition::all()
                    .add(accesses::Column::AccessType.eq("team"))
                    .add(accesses::Column::TeamId.is_in(team_ids.to_vec())),
            );
        }

        let row = Accesses::find()
            .filter(accesses::Column::DatabaseId.eq(database_id))
            .filter(cond)
            .one(&self.conn)
            .await
            .context("Failed to query user access")?;

        Ok(row.is_some())
    }

    pub async fn team_has_access(&self, team_id: i32, database_id: i32) -> Result<bool> {
        let row = Accesses::find()
            .filter(accesses::Column::DatabaseId.eq(database_id))
            .filter(accesses::Column::AccessType.eq("team"))
            .filter(accesses::Column::TeamId.eq(team_id))
            .one(&self.conn)
            .await
            .context("Failed to query team access")?;

        Ok(row.is_some())
    }
}
