use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "databases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub description: Option<String>,

    /// Opaque connection reference understood by the downstream engine
    pub connection: String,

    /// Engine kind, e.g. "postgres"
    pub engine: String,

    /// "synced" | "yet_to_sync" | "syncing" | "error"
    pub sync_status: String,

    pub embeddings_ready: bool,

    pub created_by: i32,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::accesses::Entity")]
    Accesses,
}

impl Related<super::accesses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accesses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
