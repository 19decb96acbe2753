use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::users::{self, AccessLevel, Role, UserStatus, Entity as Users};
use crate::utils::jwt;

/// Utilisateur authentifié qui agit sur la requête.
/// Résolu une seule fois par requête: JWT vérifié PUIS user relu en base,
/// pour que rôle, niveau d'accès et statut soient toujours à jour.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub access_level: AccessLevel,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.access_level == AccessLevel::Admin
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn is_coach(&self) -> bool {
        self.role == Role::Coach
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

impl From<&users::Model> for Actor {
    fn from(user: &users::Model) -> Self {
        Actor {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            access_level: user.access_level,
        }
    }
}

/// Extrait le token du header Authorization (format: "Bearer <token>")
fn bearer_token(req: &HttpRequest) -> Result<String, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or(AppError::Unauthorized)?;

    let value = header.to_str().map_err(|_| AppError::Unauthorized)?;

    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// Implémentation de FromRequest pour Actor
/// Toute route qui prend un Actor en paramètre est protégée (401 sinon)
impl FromRequest for Actor {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let config = req.app_data::<web::Data<AppConfig>>().cloned();
        let db = req.app_data::<web::Data<DatabaseConnection>>().cloned();

        Box::pin(async move {
            let token = token?;
            let config = config
                .ok_or_else(|| AppError::Internal("AppConfig not registered".to_string()))?;
            let db = db.ok_or_else(|| {
                AppError::Internal("DatabaseConnection not registered".to_string())
            })?;

            // 1. Vérifier le token JWT
            let claims = jwt::verify_token(&token, &config.jwt_secret).map_err(|e| {
                tracing::debug!(error = %e, "rejected bearer token");
                AppError::Unauthorized
            })?;

            // 2. Relire le user: un compte supprimé ou désactivé perd sa session
            let user = Users::find_by_id(claims.sub)
                .one(db.get_ref())
                .await?
                .ok_or(AppError::Unauthorized)?;

            if user.status != UserStatus::Active {
                tracing::info!(user_id = user.id, status = ?user.status, "inactive account used a session");
                return Err(AppError::Unauthorized);
            }

            Ok(Actor::from(&user))
        })
    }
}
