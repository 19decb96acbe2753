use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Espace de travail 1:1 entre un coach et (au plus) un étudiant
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "decks")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub coach_id: i32,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CoachId",
        to = "super::users::Column::Id"
    )]
    Coach,

    #[sea_orm(has_one = "super::memberships::Entity")]
    Membership,

    #[sea_orm(has_many = "super::tickets::Entity")]
    Tickets,

    #[sea_orm(has_many = "super::documents::Entity")]
    Documents,

    #[sea_orm(has_many = "super::progress_entries::Entity")]
    Progress,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coach.def()
    }
}

impl Related<super::memberships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Membership.def()
    }
}

impl Related<super::tickets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tickets.def()
    }
}

impl Related<super::documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl Related<super::progress_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Progress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
