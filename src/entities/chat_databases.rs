use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "chat_databases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub chat_id: i32,

    pub database_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chats::Entity",
        from = "Column::ChatId",
        to = "super::chats::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Chats,
    #[sea_orm(
        belongs_to = "super::databases::Entity",
        from = "Column::DatabaseId",
        to = "super::databases::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Databases,
}

impl Related<super::chats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chats.def()
    }
}

impl Related<super::databases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Databases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
