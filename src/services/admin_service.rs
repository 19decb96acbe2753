use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use crate::errors::{AppError, Result};
use crate::middleware::Actor;
use crate::models::users::{self, UserStatus};
use crate::services::authorization::{ensure, Action, Resource};

pub struct AdminService;

/// "ACTIVE" / "DISABLED" => statut cible. PENDING n'est jamais une cible.
fn parse_target_status(raw: &str) -> Result<UserStatus> {
    match raw.trim() {
        "ACTIVE" => Ok(UserStatus::Active),
        "DISABLED" => Ok(UserStatus::Disabled),
        _ => Err(AppError::BadRequest("bad_status")),
    }
}

impl AdminService {
    /// Liste des comptes pour l'écran des approbations (filtre optionnel)
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn list_users(
        db: &DatabaseConnection,
        actor: &Actor,
        status: Option<&str>,
    ) -> Result<Vec<users::Model>> {
        ensure(actor, Resource::UserAccounts, Action::Read)?;

        let mut query = users::Entity::find().order_by_desc(users::Column::CreatedAt);

        if let Some(raw) = status.filter(|s| !s.trim().is_empty()) {
            let status = UserStatus::try_from_value(&raw.trim().to_string())
                .map_err(|_| AppError::BadRequest("bad_status"))?;
            query = query.filter(users::Column::Status.eq(status));
        }

        Ok(query.all(db).await?)
    }

    /// Approuve ou désactive un compte
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn set_user_status(
        db: &DatabaseConnection,
        actor: &Actor,
        user_id: i32,
        status: &str,
    ) -> Result<users::Model> {
        ensure(actor, Resource::UserAccounts, Action::Update)?;
        let status = parse_target_status(status)?;

        let user = users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(AppError::NotFound("user_not_found"))?;

        let previous = user.status;
        let mut active: users::ActiveModel = user.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        tracing::info!(user_id, from = ?previous, to = ?status, "user status changed");
        Ok(updated)
    }
}
