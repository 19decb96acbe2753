// ============================================================================
// CONFIGURATION DES PAIEMENTS D'UN COACH
// ============================================================================
//
// - coach_payments_config : interrupteurs banque / e-wallet (une ligne par coach)
// - coach_bank_accounts   : 5 comptes max par coach
// - coach_ewallets        : 5 e-wallets max par coach
//
// Le plafond est vérifié par un comptage suivi de l'insertion, dans la même
// transaction SERIALIZABLE: deux ajouts simultanés ne peuvent pas dépasser 5.
//
// ============================================================================

use chrono::Utc;
use sea_orm::*;
use tracing::instrument;
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::middleware::Actor;
use crate::models::dto::{
    replacement, CreateBankRequest, CreateEwalletRequest, PaymentSettings, PaymentsConfigRequest,
    UpdateBankRequest, UpdateEwalletRequest,
};
use crate::models::{coach_bank_accounts, coach_ewallets, coach_payments_config};
use crate::services::authorization::{ensure, Action, Resource};

/// Nombre max de comptes bancaires (et d'e-wallets) par coach
pub const MAX_CHANNELS_PER_TYPE: u64 = 5;

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn begin_serializable(db: &DatabaseConnection) -> Result<DatabaseTransaction> {
    Ok(db
        .begin_with_config(Some(IsolationLevel::Serializable), None)
        .await?)
}

pub struct PaymentsService;

impl PaymentsService {
    // ------------------------------------------------------------------------
    // Config
    // ------------------------------------------------------------------------

    /// Config du coach, créée (tout désactivé) au premier accès
    pub async fn get_or_create_config<C: ConnectionTrait>(
        conn: &C,
        coach_id: i32,
    ) -> Result<coach_payments_config::Model> {
        if let Some(config) = Self::find_config(conn, coach_id).await? {
            return Ok(config);
        }

        let config = coach_payments_config::ActiveModel {
            coach_id: Set(coach_id),
            enable_bank: Set(false),
            enable_ewallet: Set(false),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        Ok(config)
    }

    pub async fn find_config<C: ConnectionTrait>(
        conn: &C,
        coach_id: i32,
    ) -> Result<Option<coach_payments_config::Model>> {
        Ok(coach_payments_config::Entity::find()
            .filter(coach_payments_config::Column::CoachId.eq(coach_id))
            .one(conn)
            .await?)
    }

    /// Config + comptes + e-wallets du coach (les plus récents d'abord)
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn get_settings(db: &DatabaseConnection, actor: &Actor) -> Result<PaymentSettings> {
        ensure(actor, Resource::PaymentChannels { owner_id: None }, Action::Read)?;

        let config = Self::get_or_create_config(db, actor.id).await?;
        let banks = Self::list_banks(db, actor).await?;
        let ewallets = Self::list_ewallets(db, actor).await?;

        Ok(PaymentSettings {
            config,
            banks,
            ewallets,
        })
    }

    /// Crée ou met à jour les interrupteurs. Idempotent.
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn upsert_config(
        db: &DatabaseConnection,
        actor: &Actor,
        request: &PaymentsConfigRequest,
    ) -> Result<coach_payments_config::Model> {
        ensure(actor, Resource::PaymentChannels { owner_id: None }, Action::Update)?;

        let config = match Self::find_config(db, actor.id).await? {
            Some(existing) => {
                let mut active: coach_payments_config::ActiveModel = existing.into();
                active.enable_bank = Set(request.enable_bank);
                active.enable_ewallet = Set(request.enable_ewallet);
                active.updated_at = Set(Utc::now());
                active.update(db).await?
            }
            None => {
                coach_payments_config::ActiveModel {
                    coach_id: Set(actor.id),
                    enable_bank: Set(request.enable_bank),
                    enable_ewallet: Set(request.enable_ewallet),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(db)
                .await?
            }
        };

        tracing::info!(
            enable_bank = config.enable_bank,
            enable_ewallet = config.enable_ewallet,
            "payments config saved"
        );
        Ok(config)
    }

    // ------------------------------------------------------------------------
    // Comptes bancaires
    // ------------------------------------------------------------------------

    pub async fn list_banks(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<coach_bank_accounts::Model>> {
        ensure(actor, Resource::PaymentChannels { owner_id: None }, Action::Read)?;
        Self::banks_of(db, actor.id).await
    }

    pub async fn banks_of<C: ConnectionTrait>(conn: &C, coach_id: i32) -> Result<Vec<coach_bank_accounts::Model>> {
        Ok(coach_bank_accounts::Entity::find()
            .filter(coach_bank_accounts::Column::CoachId.eq(coach_id))
            .order_by_desc(coach_bank_accounts::Column::CreatedAt)
            .order_by_desc(coach_bank_accounts::Column::Id)
            .all(conn)
            .await?)
    }

    #[instrument(skip(db, actor, request), fields(actor_id = actor.id))]
    pub async fn add_bank(
        db: &DatabaseConnection,
        actor: &Actor,
        request: &CreateBankRequest,
    ) -> Result<coach_bank_accounts::Model> {
        ensure(actor, Resource::PaymentChannels { owner_id: None }, Action::Create)?;
        request.validate()?;

        let txn = begin_serializable(db).await?;

        let count = coach_bank_accounts::Entity::find()
            .filter(coach_bank_accounts::Column::CoachId.eq(actor.id))
            .count(&txn)
            .await?;
        if count >= MAX_CHANNELS_PER_TYPE {
            return Err(AppError::CapExceeded);
        }

        let bank = coach_bank_accounts::ActiveModel {
            coach_id: Set(actor.id),
            bank_name: Set(trimmed(&request.bank_name)),
            account_name: Set(trimmed(&request.account_name)),
            account_number: Set(trimmed(&request.account_number)),
            branch: Set(optional(&request.branch)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(bank_id = bank.id, "bank account added");
        Ok(bank)
    }

    async fn owned_bank(db: &DatabaseConnection, actor: &Actor, id: i32, action: Action) -> Result<coach_bank_accounts::Model> {
        let bank = coach_bank_accounts::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(AppError::NotFound("bank_not_found"))?;
        ensure(actor, Resource::PaymentChannels { owner_id: Some(bank.coach_id) }, action)?;
        Ok(bank)
    }

    #[instrument(skip(db, actor, request), fields(actor_id = actor.id))]
    pub async fn update_bank(
        db: &DatabaseConnection,
        actor: &Actor,
        id: i32,
        request: &UpdateBankRequest,
    ) -> Result<coach_bank_accounts::Model> {
        let bank = Self::owned_bank(db, actor, id, Action::Update).await?;

        let mut active: coach_bank_accounts::ActiveModel = bank.clone().into();
        if let Some(bank_name) = replacement("bankName", &request.bank_name)? {
            active.bank_name = Set(bank_name);
        }
        if let Some(account_name) = replacement("accountName", &request.account_name)? {
            active.account_name = Set(account_name);
        }
        if let Some(account_number) = replacement("accountNumber", &request.account_number)? {
            active.account_number = Set(account_number);
        }
        if request.branch.is_some() {
            active.branch = Set(optional(&request.branch));
        }

        if !active.is_changed() {
            return Ok(bank);
        }
        Ok(active.update(db).await?)
    }

    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn delete_bank(db: &DatabaseConnection, actor: &Actor, id: i32) -> Result<()> {
        let bank = Self::owned_bank(db, actor, id, Action::Delete).await?;
        coach_bank_accounts::Entity::delete_by_id(bank.id).exec(db).await?;
        tracing::info!(bank_id = id, "bank account deleted");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // E-wallets
    // ------------------------------------------------------------------------

    pub async fn list_ewallets(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<coach_ewallets::Model>> {
        ensure(actor, Resource::PaymentChannels { owner_id: None }, Action::Read)?;
        Self::ewallets_of(db, actor.id).await
    }

    pub async fn ewallets_of<C: ConnectionTrait>(conn: &C, coach_id: i32) -> Result<Vec<coach_ewallets::Model>> {
        Ok(coach_ewallets::Entity::find()
            .filter(coach_ewallets::Column::CoachId.eq(coach_id))
            .order_by_desc(coach_ewallets::Column::CreatedAt)
            .order_by_desc(coach_ewallets::Column::Id)
            .all(conn)
            .await?)
    }

    #[instrument(skip(db, actor, request), fields(actor_id = actor.id))]
    pub async fn add_ewallet(
        db: &DatabaseConnection,
        actor: &Actor,
        request: &CreateEwalletRequest,
    ) -> Result<coach_ewallets::Model> {
        ensure(actor, Resource::PaymentChannels { owner_id: None }, Action::Create)?;
        request.validate()?;

        let txn = begin_serializable(db).await?;

        let count = coach_ewallets::Entity::find()
            .filter(coach_ewallets::Column::CoachId.eq(actor.id))
            .count(&txn)
            .await?;
        if count >= MAX_CHANNELS_PER_TYPE {
            return Err(AppError::CapExceeded);
        }

        let ewallet = coach_ewallets::ActiveModel {
            coach_id: Set(actor.id),
            provider: Set(trimmed(&request.provider)),
            handle: Set(trimmed(&request.handle)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(ewallet_id = ewallet.id, "e-wallet added");
        Ok(ewallet)
    }

    async fn owned_ewallet(db: &DatabaseConnection, actor: &Actor, id: i32, action: Action) -> Result<coach_ewallets::Model> {
        let ewallet = coach_ewallets::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(AppError::NotFound("ewallet_not_found"))?;
        ensure(actor, Resource::PaymentChannels { owner_id: Some(ewallet.coach_id) }, action)?;
        Ok(ewallet)
    }

    #[instrument(skip(db, actor, request), fields(actor_id = actor.id))]
    pub async fn update_ewallet(
        db: &DatabaseConnection,
        actor: &Actor,
        id: i32,
        request: &UpdateEwalletRequest,
    ) -> Result<coach_ewallets::Model> {
        let ewallet = Self::owned_ewallet(db, actor, id, Action::Update).await?;

        let mut active: coach_ewallets::ActiveModel = ewallet.clone().into();
        if let Some(provider) = replacement("provider", &request.provider)? {
            active.provider = Set(provider);
        }
        if let Some(handle) = replacement("handle", &request.handle)? {
            active.handle = Set(handle);
        }

        if !active.is_changed() {
            return Ok(ewallet);
        }
        Ok(active.update(db).await?)
    }

    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn delete_ewallet(db: &DatabaseConnection, actor: &Actor, id: i32) -> Result<()> {
        let ewallet = Self::owned_ewallet(db, actor, id, Action::Delete).await?;
        coach_ewallets::Entity::delete_by_id(ewallet.id).exec(db).await?;
        tracing::info!(ewallet_id = id, "e-wallet deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::Role;
    use crate::test_utils::{active_user, setup_test_db};

    fn bank_request(n: usize) -> CreateBankRequest {
        CreateBankRequest {
            bank_name: "BDO".to_string(),
            account_name: "Coach".to_string(),
            account_number: format!("000{}", n),
            branch: None,
        }
    }

    #[tokio::test]
    async fn test_config_defaults_and_idempotent_upsert() {
        let db = setup_test_db().await;
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;

        let settings = PaymentsService::get_settings(&db, &coach).await.unwrap();
        assert!(!settings.config.enable_bank);
        assert!(!settings.config.enable_ewallet);

        let request = PaymentsConfigRequest {
            enable_bank: true,
            enable_ewallet: false,
        };
        let first = PaymentsService::upsert_config(&db, &coach, &request).await.unwrap();
        let second = PaymentsService::upsert_config(&db, &coach, &request).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.enable_bank);
        assert_eq!(coach_payments_config::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bank_cap_is_five() {
        let db = setup_test_db().await;
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;

        for n in 0..5 {
            PaymentsService::add_bank(&db, &coach, &bank_request(n)).await.unwrap();
        }
        assert!(matches!(
            PaymentsService::add_bank(&db, &coach, &bank_request(5)).await,
            Err(AppError::CapExceeded)
        ));
        assert_eq!(PaymentsService::list_banks(&db, &coach).await.unwrap().len(), 5);

        // le plafond est par coach
        let (_, other) = active_user(&db, "other@example.com", Role::Coach).await;
        assert!(PaymentsService::add_bank(&db, &other, &bank_request(0)).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bank_cap_holds_under_concurrent_adds() {
        let db = setup_test_db().await;
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;

        let handles: Vec<_> = (0..12)
            .map(|n| {
                let db = db.clone();
                let coach = coach.clone();
                tokio::spawn(async move { PaymentsService::add_bank(&db, &coach, &bank_request(n)).await })
            })
            .collect();

        let mut added = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => added += 1,
                Err(AppError::CapExceeded) => refused += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(added, 5);
        assert_eq!(refused, 7);
        assert_eq!(
            coach_bank_accounts::Entity::find()
                .filter(coach_bank_accounts::Column::CoachId.eq(coach.id))
                .count(&db)
                .await
                .unwrap(),
            MAX_CHANNELS_PER_TYPE
        );
    }

    #[tokio::test]
    async fn test_ewallet_cap_is_five() {
        let db = setup_test_db().await;
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;
        let request = CreateEwalletRequest {
            provider: "GCash".to_string(),
            handle: "0917".to_string(),
        };

        for _ in 0..5 {
            PaymentsService::add_ewallet(&db, &coach, &request).await.unwrap();
        }
        assert!(matches!(
            PaymentsService::add_ewallet(&db, &coach, &request).await,
            Err(AppError::CapExceeded)
        ));
    }

    #[tokio::test]
    async fn test_blank_updates_are_rejected() {
        let db = setup_test_db().await;
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;
        let bank = PaymentsService::add_bank(&db, &coach, &bank_request(1)).await.unwrap();
        let ewallet = PaymentsService::add_ewallet(
            &db,
            &coach,
            &CreateEwalletRequest {
                provider: "GCash".to_string(),
                handle: "0917".to_string(),
            },
        )
        .await
        .unwrap();

        let blank_bank = UpdateBankRequest {
            account_number: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            PaymentsService::update_bank(&db, &coach, bank.id, &blank_bank).await,
            Err(AppError::InvalidPayload(_))
        ));

        let blank_handle = UpdateEwalletRequest {
            handle: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            PaymentsService::update_ewallet(&db, &coach, ewallet.id, &blank_handle).await,
            Err(AppError::InvalidPayload(_))
        ));

        let unchanged = PaymentsService::list_banks(&db, &coach).await.unwrap();
        assert_eq!(unchanged[0].account_number, "0001");
    }

    #[tokio::test]
    async fn test_only_owner_updates_or_deletes() {
        let db = setup_test_db().await;
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;
        let (_, other) = active_user(&db, "other@example.com", Role::Coach).await;
        let (_, student) = active_user(&db, "student@example.com", Role::Student).await;

        let bank = PaymentsService::add_bank(&db, &coach, &bank_request(1)).await.unwrap();

        let rename = UpdateBankRequest {
            bank_name: Some("BPI".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            PaymentsService::update_bank(&db, &other, bank.id, &rename).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            PaymentsService::delete_bank(&db, &other, bank.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            PaymentsService::list_banks(&db, &student).await,
            Err(AppError::Forbidden(_))
        ));

        let updated = PaymentsService::update_bank(&db, &coach, bank.id, &rename).await.unwrap();
        assert_eq!(updated.bank_name, "BPI");
        assert_eq!(updated.account_number, "0001");

        // rien à changer
        let unchanged = PaymentsService::update_bank(&db, &coach, bank.id, &UpdateBankRequest::default())
            .await
            .unwrap();
        assert_eq!(unchanged, updated);

        PaymentsService::delete_bank(&db, &coach, bank.id).await.unwrap();
        assert!(matches!(
            PaymentsService::delete_bank(&db, &coach, bank.id).await,
            Err(AppError::NotFound("bank_not_found"))
        ));
    }
}
