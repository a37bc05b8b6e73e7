use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "collections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub designer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::designers::Entity",
        from = "Column::DesignerId",
        to = "super::designers::Column::Id"
    )]
    Designers,
    #[sea_orm(has_many = "super::dresses::Entity")]
    Dresses,
}

impl Related<super::designers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Designers.def()
    }
}

impl Related<super::dresses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dresses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
