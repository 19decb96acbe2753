use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Suivi hebdomadaire d'un deck, rédigé par le coach (ou un admin)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "progress_entries")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub deck_id: i32,
    pub author_id: i32,
    pub week_start: Date,
    #[sea_orm(column_type = "Text")]
    pub summary: String,
    pub blockers: Option<String>,
    pub next_actions: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::decks::Entity",
        from = "Column::DeckId",
        to = "super::decks::Column::Id",
        on_delete = "Cascade"
    )]
    Deck,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id"
    )]
    Author,
}

impl Related<super::decks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deck.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
