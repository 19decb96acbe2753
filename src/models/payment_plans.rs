use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "PHP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    #[sea_orm(string_value = "ONE_TIME")]
    OneTime,
    #[sea_orm(string_value = "SUBSCRIPTION")]
    Subscription,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_plans")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub coach_id: i32,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sea_orm(column_name = "type")]
    pub plan_type: PlanType,
    pub amount: i64,      // en unités mineures (centavos pour PHP)
    pub currency: String, // 'PHP' par défaut
    pub active: bool,     // false => invisible pour les étudiants
    pub created_at: DateTimeUtc,
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
