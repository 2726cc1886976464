use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::entities::{api_keys, prelude::*};

/// API key record with the stored digest, for verification paths.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub id: i32,
    pub team_id: i32,
    pub created_by: i32,
    pub name: String,
    pub prefix: String,
    pub key_hash: String,
    pub permissions: Vec<String>,
    pub active: bool,
    pub expires_at: Option<String>,
    pub usage_count: i64,
    pub last_used_at: Option<String>,
    pub last_used_by: Option<String>,
    pub last_query: Option<String>,
    pub last_used_ip: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ApiKeyRecord {
    /// Expiry timestamps are stored as RFC 3339; an unparseable value is
    /// treated as expired (fail closed).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match &self.expires_at {
            None => false,
            Some(raw) => chrono::DateTime::parse_from_rfc3339(raw)
                .map(|t| t < chrono::Utc::now())
                .unwrap_or(true),
        }
    }
}

impl From<api_keys::Model> for ApiKeyRecord {
    fn from(model: api_keys::Model) -> Self {
        let permissions: Vec<String> =
            serde_json::from_str(&model.permissions).unwrap_or_default();

        Self {
            id: model.id,
            team_id: model.team_id,
            created_by: model.created_by,
            name: model.name,
            prefix: model.prefix,
            key_hash: model.key_hash,
            permissions,
            active: model.active,
            expires_at: model.expires_at,
            usage_count: model.usage_count,
            last_used_at: model.last_used_at,
            last_used_by: model.last_used_by,
            last_query: model.last_query,
            last_used_ip: model.last_used_ip,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub struct ApiKeyRepository {
    conn: DatabaseConnection,
}

impl ApiKeyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        team_id: i32,
        created_by: i32,
        name: &str,
        prefix: &str,
        key_hash: &str,
        permissions: &[String],
        expires_at: Option<&str>,
    ) -> Result<ApiKeyRecord> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = api_keys::ActiveModel {
            team_id: Set(team_id),
            created_by: Set(created_by),
            name: Set(name.to_string()),
            prefix: Set(prefix.to_string()),
            key_hash: Set(key_hash.to_string()),
            permissions: Set(serde_json::to_string(permissions)?),
            active: Set(true),
            expires_at: Set(expires_at.map(String::from)),
            usage_count: Set(0),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert API key")?;

        info!("Created API key '{}' for team {}", name, team_id);
        Ok(ApiKeyRecord::from(model))
    }

    /// Candidate lookup by the public, non-secret prefix. The caller is
    /// responsible for the constant-time digest comparison.
    pub async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>> {
        let row = ApiKeys::find()
            .filter(api_keys::Column::Prefix.eq(prefix))
            .one(&self.conn)
            .await
            .context("Failed to query API key by prefix")?;

        Ok(row.map(ApiKeyRecord::from))
    }

    pub async fn get(&self, id: i32) -> Result<Option<ApiKeyRecord>> {
        let row = ApiKeys::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query API key")?;

        Ok(row.map(ApiKeyRecord::from))
    }

    pub async fn list_for_team(&self, team_id: i32) -> Result<Vec<ApiKeyRecord>> {
        let rows = ApiKeys::find()
            .filter(api_keys::Column::TeamId.eq(team_id))
            .order_by_asc(api_keys::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list API keys")?;

        Ok(rows.into_iter().map(ApiKeyRecord::from).collect())
    }

    /// Soft delete: keys are deactivated, never physically removed.
    pub async fn deactivate(&self, id: i32) -> Result<bool> {
        let result = ApiKeys::update_many()
            .col_expr(
                api_keys::Column::Active,
                sea_orm::sea_query::Expr::value(false),
            )
            .col_expr(
                api_keys::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(api_keys::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Atomic usage bump plus last-used metadata, one UPDATE. The counter
    /// increment is an in-database expression, so concurrent requests
    /// cannot lose updates.
    pub async fn record_usage(
        &self,
        id: i32,
        used_by: &str,
        query: &str,
        ip: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let snippet: String = query.chars().take(255).collect();

        ApiKeys::update_many()
            .col_expr(
                api_keys::Column::UsageCount,
                sea_orm::sea_query::Expr::col(api_keys::Column::UsageCount).add(1),
            )
            .col_expr(
                api_keys::Column::LastUsedAt,
                sea_orm::sea_query::Expr::value(now.clone()),
            )
            .col_expr(
                api_keys::Column::LastUsedBy,
                sea_orm::sea_query::Expr::value(used_by),
            )
            .col_expr(
                api_keys::Column::LastQuery,
                sea_orm::sea_query::Expr::value(snippet),
            )
            .col_expr(
                api_keys::Column::LastUsedIp,
                sea_orm::sea_query::Expr::value(ip),
            )
            .col_expr(
                api_keys::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(api_keys::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record API key usage")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires_at: Option<&str>) -> ApiKeyRecord {
        ApiKeyRecord {
            id: 1,
            team_id: 1,
            created_by: 1,
            name: "ci".to_string(),
            prefix: "qd_123456789".to_string(),
            key_hash: String::new(),
            permissions: vec![],
            active: true,
            expires_at: expires_at.map(String::from),
            usage_count: 0,
            last_used_at: None,
            last_used_by: None,
            last_query: None,
            last_used_ip: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_is_expired() {
        assert!(!record(None).is_expired());

        let future = (chrono::Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        assert!(!record(Some(&future)).is_expired());

        let past = (chrono::Utc::now() - chrono::Duration::days(1)).to_rfc3339();
        assert!(record(Some(&past)).is_expired());

        // Unparseable timestamps fail closed
        assert!(record(Some("not-a-timestamp")).is_expired());
    }
}
