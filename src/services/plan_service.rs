use chrono::Utc;
use sea_orm::*;
use tracing::instrument;
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::middleware::Actor;
use crate::models::dto::{replacement, CreatePlanRequest, UpdatePlanRequest};
use crate::models::payment_plans::{self, DEFAULT_CURRENCY};
use crate::services::authorization::{ensure, Action, Resource};

fn normalize_currency(currency: Option<&str>) -> String {
    currency
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

pub struct PlanService;

impl PlanService {
    #[instrument(skip(db, actor, request), fields(actor_id = actor.id))]
    pub async fn create_plan(
        db: &DatabaseConnection,
        actor: &Actor,
        request: &CreatePlanRequest,
    ) -> Result<payment_plans::Model> {
        ensure(actor, Resource::Plans { coach_id: None }, Action::Create)?;
        request.validate()?;

        let now = Utc::now();
        let plan = payment_plans::ActiveModel {
            coach_id: Set(actor.id),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description.clone()),
            plan_type: Set(request.plan_type),
            amount: Set(request.amount),
            currency: Set(normalize_currency(request.currency.as_deref())),
            active: Set(request.active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::info!(plan_id = plan.id, amount = plan.amount, currency = %plan.currency, "plan created");
        Ok(plan)
    }

    /// Plans du coach, les plus récents d'abord
    pub async fn list_plans(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<payment_plans::Model>> {
        ensure(actor, Resource::Plans { coach_id: None }, Action::Read)?;

        Ok(payment_plans::Entity::find()
            .filter(payment_plans::Column::CoachId.eq(actor.id))
            .order_by_desc(payment_plans::Column::CreatedAt)
            .order_by_desc(payment_plans::Column::Id)
            .all(db)
            .await?)
    }

    async fn owned_plan(db: &DatabaseConnection, actor: &Actor, id: i32, action: Action) -> Result<payment_plans::Model> {
        let plan = payment_plans::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(AppError::NotFound("plan_not_found"))?;
        ensure(actor, Resource::Plans { coach_id: Some(plan.coach_id) }, action)?;
        Ok(plan)
    }

    /// Mise à jour partielle. Les factures déjà émises gardent leur montant.
    #[instrument(skip(db, actor, request), fields(actor_id = actor.id))]
    pub async fn update_plan(
        db: &DatabaseConnection,
        actor: &Actor,
        id: i32,
        request: &UpdatePlanRequest,
    ) -> Result<payment_plans::Model> {
        request.validate()?;
        let plan = Self::owned_plan(db, actor, id, Action::Update).await?;

        let mut active: payment_plans::ActiveModel = plan.clone().into();
        if let Some(name) = replacement("name", &request.name)? {
            active.name = Set(name);
        }
        if request.description.is_some() {
            active.description = Set(request.description.clone());
        }
        if let Some(plan_type) = request.plan_type {
            active.plan_type = Set(plan_type);
        }
        if let Some(amount) = request.amount {
            active.amount = Set(amount);
        }
        if let Some(currency) = replacement("currency", &request.currency)? {
            active.currency = Set(normalize_currency(Some(&currency)));
        }
        if let Some(is_active) = request.active {
            active.active = Set(is_active);
        }

        if !active.is_changed() {
            return Ok(plan);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(db).await?)
    }

    /// Supprime un plan. Les factures qui le référencent passent à plan_id = NULL.
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn delete_plan(db: &DatabaseConnection, actor: &Actor, id: i32) -> Result<()> {
        let plan = Self::owned_plan(db, actor, id, Action::Delete).await?;
        payment_plans::Entity::delete_by_id(plan.id).exec(db).await?;
        tracing::info!(plan_id = id, "plan deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment_plans::PlanType;
    use crate::models::users::Role;
    use crate::test_utils::{active_user, setup_test_db};

    fn plan_request(name: &str, amount: i64) -> CreatePlanRequest {
        CreatePlanRequest {
            name: name.to_string(),
            description: None,
            plan_type: PlanType::OneTime,
            amount,
            currency: None,
            active: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let db = setup_test_db().await;
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;

        let first = PlanService::create_plan(&db, &coach, &plan_request("Starter", 150000)).await.unwrap();
        let second = PlanService::create_plan(&db, &coach, &plan_request("Pro", 300000)).await.unwrap();

        assert_eq!(first.currency, "PHP");
        assert!(first.active);

        let plans = PlanService::list_plans(&db, &coach).await.unwrap();
        let ids: Vec<i32> = plans.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(plans[1].name, "Starter");
        assert_eq!(plans[1].amount, 150000);
    }

    #[tokio::test]
    async fn test_validation_and_roles() {
        let db = setup_test_db().await;
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;
        let (_, student) = active_user(&db, "student@example.com", Role::Student).await;

        assert!(matches!(
            PlanService::create_plan(&db, &coach, &plan_request("", 100)).await,
            Err(AppError::InvalidPayload(_))
        ));
        assert!(matches!(
            PlanService::create_plan(&db, &coach, &plan_request("   ", 100)).await,
            Err(AppError::InvalidPayload(_))
        ));
        assert!(matches!(
            PlanService::create_plan(&db, &coach, &plan_request("Negative", -1)).await,
            Err(AppError::InvalidPayload(_))
        ));
        assert!(matches!(
            PlanService::create_plan(&db, &student, &plan_request("Nope", 100)).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_by_owner_only() {
        let db = setup_test_db().await;
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;
        let (_, other) = active_user(&db, "other@example.com", Role::Coach).await;
        let (_, admin) = active_user(&db, "root@example.com", Role::SuperAdmin).await;
        let plan = PlanService::create_plan(&db, &coach, &plan_request("Starter", 1000)).await.unwrap();

        let change = UpdatePlanRequest {
            amount: Some(2000),
            currency: Some("usd".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            PlanService::update_plan(&db, &other, plan.id, &change).await,
            Err(AppError::Forbidden(_))
        ));

        let blank_name = UpdatePlanRequest {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            PlanService::update_plan(&db, &coach, plan.id, &blank_name).await,
            Err(AppError::InvalidPayload(_))
        ));

        let updated = PlanService::update_plan(&db, &coach, plan.id, &change).await.unwrap();
        assert_eq!(updated.amount, 2000);
        assert_eq!(updated.currency, "USD");
        assert_eq!(updated.name, "Starter");

        assert!(PlanService::delete_plan(&db, &admin, plan.id).await.is_ok());
        assert!(matches!(
            PlanService::delete_plan(&db, &coach, plan.id).await,
            Err(AppError::NotFound("plan_not_found"))
        ));
    }
}
