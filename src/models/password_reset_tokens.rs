// ============================================================================
// MODÈLE : PASSWORD RESET TOKENS
// ============================================================================
//
// Colonnes de la table password_reset_tokens:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - user_id (INTEGER, NOT NULL, FK vers users)
//   - token (VARCHAR, UNIQUE, NOT NULL) - 32 bytes aléatoires en hex
//   - expires_at (TIMESTAMP, NOT NULL) - created_at + RESET_TOKEN_TTL_MINUTES
//   - created_at (TIMESTAMP)
//
// Workflow:
//   1. User demande reset via POST /api/auth/forgot
//   2. Backend supprime les anciens tokens du user et en insère un nouveau
//   3. Backend met l'email (lien avec le token) dans l'outbox
//   4. Frontend envoie POST /api/auth/reset avec token + nouveau password
//   5. Backend vérifie: token existe, not expired
//   6. Backend change le password et supprime TOUS les tokens du user
//
// Points d'attention:
//   - Au plus un token actif par user (les anciens sont supprimés)
//   - Un token consommé est supprimé (pas de flag "used")
//   - ON DELETE CASCADE: si user supprimé, tokens supprimés aussi
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "password_reset_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    #[sea_orm(unique)]
    pub token: String,

    pub expires_at: DateTimeUtc,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
