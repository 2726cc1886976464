use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub team_id: i32,

    pub created_by: i32,

    pub name: String,

    /// Public display prefix, also the lookup key (first 12 chars of the secret)
    pub prefix: String,

    /// SHA-256 hex digest of the full secret
    pub key_hash: String,

    /// JSON array of scope strings; "*" grants everything
    pub permissions: String,

    pub active: bool,

    pub expires_at: Option<String>,

    pub usage_count: i64,

    pub last_used_at: Option<String>,

    pub last_used_by: Option<String>,

    /// Truncated text of the last query issued with this key
    pub last_query: Option<String>,

    pub last_used_ip: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::teams::Entity",
        from = "Column::TeamId",
        to = "super::teams::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Teams,
}

impl Related<super::teams::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teams.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
