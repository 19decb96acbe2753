// ============================================================================
// MODÈLE : USERS
// ============================================================================
//
// Colonnes de la table users:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - email (VARCHAR, UNIQUE, NOT NULL) - toujours en minuscules
//   - name (VARCHAR, NULL)
//   - password_hash (VARCHAR, NULL) - pbkdf2:sha256:iterations$salt$hash
//   - role (SUPER_ADMIN | COACH | STUDENT)
//   - access_level (ADMIN | USER)
//   - status (PENDING | ACTIVE | DISABLED)
//   - created_at, updated_at
//
// Points d'attention:
//   - Un coach qui s'inscrit commence en PENDING, seul un SUPER_ADMIN l'active
//   - Un étudiant créé par un coach (nouveau deck) est directement ACTIVE
//   - Seuls les comptes ACTIVE peuvent se connecter
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sea_orm(string_value = "SUPER_ADMIN")]
    SuperAdmin,
    #[sea_orm(string_value = "COACH")]
    Coach,
    #[sea_orm(string_value = "STUDENT")]
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "USER")]
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "DISABLED")]
    Disabled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)] // Ne jamais exposer le hash en JSON
    pub password_hash: Option<String>,
    pub role: Role,
    pub access_level: AccessLevel,
    pub status: UserStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::decks::Entity")]
    Decks,

    #[sea_orm(has_many = "super::password_reset_tokens::Entity")]
    PasswordResetTokens,
}

impl Related<super::decks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Decks.def()
    }
}

impl Related<super::password_reset_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PasswordResetTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
