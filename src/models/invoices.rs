// ============================================================================
// MODÈLE : INVOICES
// ============================================================================
//
// Une facture relie un étudiant à un coach, éventuellement à un plan et un
// deck.
//
// Cycle de vie (status):
//   PENDING ──upload──▶ SUBMITTED ──▶ UNDER_REVIEW ──▶ PAID | REJECTED
//   AWAITING_PROOF, CANCELED sont posés par le coach (ou un admin)
//
// Points d'attention:
//   - amount/currency sont COPIÉS depuis le plan à la création: modifier le
//     plan ensuite ne change jamais le prix d'une facture existante
//   - plan_id/deck_id peuvent être NULL (plan supprimé, pas de deck trouvé)
//   - proof_key est une clé opaque du ProofStore, proof_url l'URL de lecture
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentChannel {
    #[sea_orm(string_value = "BANK")]
    Bank,
    #[sea_orm(string_value = "E_WALLET")]
    EWallet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "AWAITING_PROOF")]
    AwaitingProof,
    #[sea_orm(string_value = "SUBMITTED")]
    Submitted,
    #[sea_orm(string_value = "UNDER_REVIEW")]
    UnderReview,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "CANCELED")]
    Canceled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub student_id: i32,
    pub coach_id: i32,
    pub plan_id: Option<i32>,
    pub deck_id: Option<i32>,
    pub title: String,
    pub description: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub channel: PaymentChannel,
    pub status: InvoiceStatus,
    #[serde(skip_serializing)]
    pub proof_key: Option<String>,
    pub proof_url: Option<String>,
    pub proof_content_type: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::StudentId",
        to = "super::users::Column::Id"
    )]
    Student,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CoachId",
        to = "super::users::Column::Id"
    )]
    Coach,

    #[sea_orm(
        belongs_to = "super::payment_plans::Entity",
        from = "Column::PlanId",
        to = "super::payment_plans::Column::Id",
        on_delete = "SetNull"
    )]
    Plan,

    #[sea_orm(
        belongs_to = "super::decks::Entity",
        from = "Column::DeckId",
        to = "super::decks::Column::Id",
        on_delete = "SetNull"
    )]
    Deck,
}

impl Related<super::payment_plans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
