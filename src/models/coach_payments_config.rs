use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Un enregistrement par coach: quels canaux de paiement sont visibles par les étudiants
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coach_payments_config")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub coach_id: i32,
    pub enable_bank: bool,
    pub enable_ewallet: bool,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CoachId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Coach,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coach.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
