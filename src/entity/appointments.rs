use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub designer_id: Uuid,
    pub scheduled_at: DateTimeWithTimeZone,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::designers::Entity",
        from = "Column::DesignerId",
        to = "super::designers::Column::Id"
    )]
    Designers,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::designers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Designers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
