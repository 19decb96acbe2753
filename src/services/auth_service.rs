use chrono::{Duration, Utc};
use sea_orm::*;
use tracing::instrument;
use validator::Validate;

use crate::config::AppConfig;
use crate::email::templates;
use crate::errors::{AppError, Result};
use crate::models::dto::{AuthResponse, RegisterRequest, ResetPasswordRequest, SessionUser};
use crate::models::password_reset_tokens;
use crate::models::users::{self, AccessLevel, Role, UserStatus};
use crate::services::OutboxService;
use crate::utils::{jwt, password};

/// Emails toujours comparés en minuscules, sans espaces autour
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AuthService;

impl AuthService {
    /// Inscription d'un coach: le compte reste PENDING jusqu'à approbation
    #[instrument(skip_all)]
    pub async fn register(db: &DatabaseConnection, request: &RegisterRequest) -> Result<users::Model> {
        request.validate()?;
        let email = normalize_email(&request.email);

        // 1. Vérifier si l'email est déjà utilisé
        let existing = users::Entity::find()
            .filter(users::Column::Email.eq(&email))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("email_taken"));
        }

        // 2. Hash le mot de passe
        let hash = password::hash_password(&request.password).map_err(AppError::Internal)?;

        // 3. Créer le coach + prévenir les super admins dans la même transaction
        let now = Utc::now();
        let txn = db.begin().await?;

        let coach = users::ActiveModel {
            email: Set(email),
            name: Set(Some(request.name.trim().to_string())),
            password_hash: Set(Some(hash)),
            role: Set(Role::Coach),
            access_level: Set(AccessLevel::User),
            status: Set(UserStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let admins = users::Entity::find()
            .filter(users::Column::Role.eq(Role::SuperAdmin))
            .filter(users::Column::Status.eq(UserStatus::Active))
            .all(&txn)
            .await?;

        for admin in &admins {
            let email = templates::coach_approval_request(
                &admin.email,
                &coach.email,
                coach.name.as_deref().unwrap_or(""),
            );
            OutboxService::enqueue(&txn, email).await?;
        }

        txn.commit().await?;

        tracing::info!(user_id = coach.id, "coach registered, awaiting approval");
        Ok(coach)
    }

    /// Vérifie email + mot de passe. Toute erreur (user absent, pas de hash,
    /// compte non actif, mauvais mot de passe) donne la même réponse.
    #[instrument(skip_all)]
    pub async fn authorize_credentials(
        db: &DatabaseConnection,
        email: &str,
        password: &str,
    ) -> Result<users::Model> {
        let email = normalize_email(email);

        let user = users::Entity::find()
            .filter(users::Column::Email.eq(&email))
            .one(db)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(AppError::InvalidCredentials);
        };

        if user.status != UserStatus::Active {
            tracing::info!(user_id = user.id, status = ?user.status, "login refused for inactive account");
            return Err(AppError::InvalidCredentials);
        }

        match password::verify_password(password, hash) {
            Ok(true) => Ok(user),
            Ok(false) => Err(AppError::InvalidCredentials),
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "stored password hash is unreadable");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    /// Login: vérifie les identifiants puis signe un JWT (24h)
    pub async fn login(
        db: &DatabaseConnection,
        config: &AppConfig,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse> {
        let user = Self::authorize_credentials(db, email, password).await?;
        let token = jwt::generate_token(&user, &config.jwt_secret).map_err(AppError::Internal)?;

        tracing::info!(user_id = user.id, "user logged in");
        Ok(AuthResponse {
            token,
            user: SessionUser {
                id: user.id,
                email: user.email,
                name: user.name,
                role: user.role,
                access_level: user.access_level,
            },
        })
    }

    /// Demande de reset. Même résultat que l'email existe ou non.
    #[instrument(skip_all)]
    pub async fn forgot_password(
        db: &DatabaseConnection,
        config: &AppConfig,
        email: Option<&str>,
    ) -> Result<()> {
        let email = email
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or(AppError::BadRequest("email_required"))?;

        let Some(user) = users::Entity::find()
            .filter(users::Column::Email.eq(&email))
            .one(db)
            .await?
        else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = password::generate_reset_token();
        let now = Utc::now();
        let expires_at = now + Duration::minutes(config.reset_token_ttl_minutes);

        // Un seul token vivant par user
        let txn = db.begin().await?;

        password_reset_tokens::Entity::delete_many()
            .filter(password_reset_tokens::Column::UserId.eq(user.id))
            .exec(&txn)
            .await?;

        password_reset_tokens::ActiveModel {
            user_id: Set(user.id),
            token: Set(token.clone()),
            expires_at: Set(expires_at),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let email = templates::password_reset(
            &user.email,
            &config.app_base_url,
            &token,
            config.reset_token_ttl_minutes,
        );
        OutboxService::enqueue(&txn, email).await?;

        txn.commit().await?;

        tracing::info!(user_id = user.id, "password reset token issued");
        Ok(())
    }

    /// Applique un nouveau mot de passe à partir d'un token de reset
    #[instrument(skip_all)]
    pub async fn reset_password(db: &DatabaseConnection, request: &ResetPasswordRequest) -> Result<()> {
        request.validate()?;

        // 1. Retrouver le token
        let record = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::Token.eq(&request.token))
            .one(db)
            .await?
            .ok_or(AppError::BadRequest("invalid_or_used_token"))?;

        // 2. Token expiré: on le supprime
        if record.expires_at < Utc::now() {
            password_reset_tokens::Entity::delete_by_id(record.id)
                .exec(db)
                .await?;
            return Err(AppError::BadRequest("token_expired"));
        }

        // 3. Nouveau hash + suppression de tous les tokens du user
        let hash = password::hash_password(&request.password).map_err(AppError::Internal)?;
        let txn = db.begin().await?;

        let user = users::Entity::find_by_id(record.user_id)
            .one(&txn)
            .await?
            .ok_or(AppError::BadRequest("invalid_or_used_token"))?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(Some(hash));
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        password_reset_tokens::Entity::delete_many()
            .filter(password_reset_tokens::Column::UserId.eq(record.user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        tracing::info!(user_id = record.user_id, "password reset completed");
        Ok(())
    }
}
