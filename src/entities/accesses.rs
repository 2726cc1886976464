use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accesses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// "team" or "user"; exactly one of team_id/user_id is set
    pub access_type: String,

    pub team_id: Option<i32>,

    pub user_id: Option<i32>,

    pub database_id: i32,

    pub created_by: i32,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::databases::Entity",
        from = "Column::DatabaseId",
        to = "super::databases::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Databases,
}

impl Related<super::databases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Databases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
