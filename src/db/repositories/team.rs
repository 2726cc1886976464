use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::entities::{prelude::*, team_members, teams};

use super::user::User;

#[derive(Debug, Clone)]
pub struct Team {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_by: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<teams::Model> for Team {
    fn from(model: teams::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Team detail with its membership populated from the users table.
#[derive(Debug, Clone)]
pub struct TeamWithMembers {
    pub team: Team,
    pub members: Vec<User>,
}

pub struct TeamRepository {
    conn: DatabaseConnection,
}

impl TeamRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        member_ids: &[i32],
        created_by: i32,
    ) -> Result<i32> {
        let now = chrono::Utc::now().to_rfc3339();

        let team = teams::ActiveModel {
            name: Set(name.to_string()),
            description: Set(description.map(String::from)),
            created_by: Set(created_by),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert team")?;

        for user_id in member_ids {
            team_members::ActiveModel {
                team_id: Set(team.id),
                user_id: Set(*user_id),
                created_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(&self.conn)
            .await
            .context("Failed to insert team member")?;
        }

        info!("Created team {} with {} members", team.id, member_ids.len());
        Ok(team.id)
    }

    pub async fn get(&self, id: i32) -> Result<Option<TeamWithMembers>> {
        let Some(team) = Teams::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query team")?
        else {
            return Ok(None);
        };

        let members = self.members_of(id).await?;

        Ok(Some(TeamWithMembers {
            team: Team::from(team),
            members,
        }))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Team>> {
        let team = Teams::find()
            .filter(teams::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query team by name")?;

        Ok(team.map(Team::from))
    }

    pub async fn list(&self) -> Result<Vec<TeamWithMembers>> {
        let rows = Teams::find()
            .order_by_asc(teams::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list teams")?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let members = self.members_of(row.id).await?;
            out.push(TeamWithMembers {
                team: Team::from(row),
                members,
            });
        }
        Ok(out)
    }

    pub async fn update(
        &self,
        id: i32,
        name: Option<&str>,
        description: Option<&str>,
        member_ids: Option<&[i32]>,
    ) -> Result<Option<TeamWithMembers>> {
        let Some(team) = Teams::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query team for update")?
        else {
            return Ok(None);
        };

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: teams::ActiveModel = team.into();
        if let Some(name) = name {
            active.name = Set(name.to_string());
        }
        if let Some(description) = description {
            active.description = Set(Some(description.to_string()));
        }
        active.updated_at = Set(now.clone());
        active.update(&self.conn).await?;

        // Replace the membership wholesale when a member list is supplied
        if let Some(member_ids) = member_ids {
            TeamMembers::delete_many()
                .filter(team_members::Column::TeamId.eq(id))
                .exec(&self.conn)
                .await?;

            for user_id in member_ids {
                team_members::ActiveModel {
                    team_id: Set(id),
                    user_id: Set(*user_id),
                    created_at: Set(now.clone()),
                    ..Default::default()
                }
                .insert(&self.conn)
                .await?;
            }
        }

        self.get(id).await
    }

    pub async fn remove(&self, id: i32) -> Result<bool> {
        TeamMembers::delete_many()
            .filter(team_members::Column::TeamId.eq(id))
            .exec(&self.conn)
            .await?;

        let result = Teams::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn is_member(&self, team_id: i32, user_id: i32) -> Result<bool> {
        let row = TeamMembers::find()
            .filter(team_members::Column::TeamId.eq(team_id))
            .filter(team_members::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query team membership")?;

        Ok(row.is_some())
    }

    /// All teams a user belongs to.
    pub async fn team_ids_of_user(&self, user_id: i32) -> Result<Vec<i32>> {
        let rows = TeamMembers::find()
            .filter(team_members::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await
            .context("Failed to query user memberships")?;

        Ok(rows.into_iter().map(|r| r.team_id).collect())
    }

    async fn members_of(&self, team_id: i32) -> Result<Vec<User>> {
        let ids: Vec<i32> = TeamMembers::find()
            .filter(team_members::Column::TeamId.eq(team_id))
            .all(&self.conn)
            .await
            .context("Failed to query team members")?
            .into_iter()
            .map(|m| m.user_id)
            .collect();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = Users::find()
            .filter(crate::entities::users::Column::Id.is_in(ids))
            .all(&self.conn)
            .await
            .context("Failed to populate team members")?;

        Ok(users.into_iter().map(User::from).collect())
    }
}
