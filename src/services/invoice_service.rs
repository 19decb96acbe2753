// ============================================================================
// FACTURES
// ============================================================================
//
// Flux nominal:
//   1. L'étudiant choisit un plan actif + un canal => facture PENDING
//      (montant et devise copiés depuis le plan)
//   2. Il consulte la facture: instructions de paiement du coach
//   3. Il envoie une preuve (≤ 10 Mo) => SUBMITTED
//   4. Le coach (ou un admin) passe la facture en UNDER_REVIEW, PAID, REJECTED...
//
// ============================================================================

use chrono::Utc;
use sea_orm::*;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::middleware::Actor;
use crate::models::dto::{CreateInvoiceRequest, InvoiceDetail, PaymentInstructions, UserSummary};
use crate::models::invoices::{self, InvoiceStatus};
use crate::models::{decks, memberships, payment_plans, users};
use crate::services::authorization::{ensure, ensure_visible, Action, Resource};
use crate::services::payments_service::PaymentsService;
use crate::services::status::{check_invoice_transition, Mover};
use crate::storage::{extension_for, ProofStore};

/// Taille max d'une preuve de paiement
pub const MAX_PROOF_BYTES: usize = 10 * 1024 * 1024;

/// Fichier reçu pour une preuve de paiement
#[derive(Debug)]
pub struct ProofUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Contenu d'une preuve, prêt à être renvoyé
#[derive(Debug)]
pub struct ProofFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub fn proof_url(invoice_id: i32) -> String {
    format!("/api/invoices/{}/proof", invoice_id)
}

pub struct InvoiceService;

impl InvoiceService {
    fn as_resource(invoice: &invoices::Model) -> Resource {
        Resource::Invoice {
            student_id: invoice.student_id,
            coach_id: invoice.coach_id,
        }
    }

    /// Charge une facture visible par l'appelant (404 sinon)
    async fn load_visible(db: &DatabaseConnection, actor: &Actor, id: i32) -> Result<invoices::Model> {
        let invoice = invoices::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(AppError::NotFound("invoice_not_found"))?;
        ensure_visible(actor, Self::as_resource(&invoice), Action::Read, "invoice_not_found")?;
        Ok(invoice)
    }

    /// Crée une facture pour l'étudiant à partir d'un plan actif
    #[instrument(skip(db, actor, request), fields(actor_id = actor.id, plan_id = request.plan_id))]
    pub async fn create_invoice(
        db: &DatabaseConnection,
        actor: &Actor,
        request: &CreateInvoiceRequest,
    ) -> Result<invoices::Model> {
        ensure(actor, Resource::Invoices, Action::Create)?;

        // 1. Plan actif uniquement
        let plan = payment_plans::Entity::find_by_id(request.plan_id)
            .one(db)
            .await?
            .filter(|p| p.active)
            .ok_or(AppError::NotFound("plan_not_found"))?;

        // 2. Deck de l'étudiant, seulement s'il est suivi par le coach du plan
        let deck_id = match memberships::Entity::find()
            .filter(memberships::Column::StudentId.eq(actor.id))
            .one(db)
            .await?
        {
            Some(membership) => decks::Entity::find_by_id(membership.deck_id)
                .one(db)
                .await?
                .filter(|deck| deck.coach_id == plan.coach_id)
                .map(|deck| deck.id),
            None => None,
        };

        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Invoice - {}", plan.name));

        // 3. Montant et devise figés au moment de la création
        let now = Utc::now();
        let invoice = invoices::ActiveModel {
            student_id: Set(actor.id),
            coach_id: Set(plan.coach_id),
            plan_id: Set(Some(plan.id)),
            deck_id: Set(deck_id),
            title: Set(title),
            description: Set(request.description.clone()),
            amount: Set(plan.amount),
            currency: Set(plan.currency.clone()),
            channel: Set(request.channel),
            status: Set(InvoiceStatus::Pending),
            proof_key: Set(None),
            proof_url: Set(None),
            proof_content_type: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::info!(invoice_id = invoice.id, amount = invoice.amount, "invoice created");
        Ok(invoice)
    }

    /// Étudiant: ses factures. Coach: celles qu'il a émises. Admin: toutes.
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn list_invoices(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<invoices::Model>> {
        ensure(actor, Resource::Invoices, Action::Read)?;

        let mut query = invoices::Entity::find()
            .order_by_desc(invoices::Column::CreatedAt)
            .order_by_desc(invoices::Column::Id);

        if !actor.is_admin() {
            query = if actor.is_student() {
                query.filter(invoices::Column::StudentId.eq(actor.id))
            } else {
                query.filter(invoices::Column::CoachId.eq(actor.id))
            };
        }

        Ok(query.all(db).await?)
    }

    /// Détail d'une facture avec les instructions de paiement du coach.
    /// Un canal n'apparaît que s'il est activé ET qu'il a au moins un compte.
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn get_invoice(db: &DatabaseConnection, actor: &Actor, id: i32) -> Result<InvoiceDetail> {
        let invoice = Self::load_visible(db, actor, id).await?;

        let plan = match invoice.plan_id {
            Some(plan_id) => payment_plans::Entity::find_by_id(plan_id).one(db).await?,
            None => None,
        };

        let coach = users::Entity::find_by_id(invoice.coach_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::Internal(format!("coach {} of invoice {} missing", invoice.coach_id, invoice.id)))?;

        let mut instructions = PaymentInstructions::default();
        if let Some(config) = PaymentsService::find_config(db, invoice.coach_id).await? {
            if config.enable_bank {
                instructions.bank_accounts = PaymentsService::banks_of(db, invoice.coach_id).await?;
            }
            if config.enable_ewallet {
                instructions.ewallets = PaymentsService::ewallets_of(db, invoice.coach_id).await?;
            }
        }

        Ok(InvoiceDetail {
            invoice,
            plan,
            coach: UserSummary::from(&coach),
            instructions,
        })
    }

    /// Enregistre la preuve de paiement de l'étudiant et passe la facture en SUBMITTED
    #[instrument(skip(db, store, actor, upload), fields(actor_id = actor.id, size = upload.bytes.len()))]
    pub async fn attach_proof(
        db: &DatabaseConnection,
        store: &dyn ProofStore,
        actor: &Actor,
        id: i32,
        upload: ProofUpload,
    ) -> Result<invoices::Model> {
        let invoice = Self::load_visible(db, actor, id).await?;
        ensure(actor, Self::as_resource(&invoice), Action::UploadProof)?;
        check_invoice_transition(Mover::Student, invoice.status, InvoiceStatus::Submitted)?;

        if upload.bytes.len() > MAX_PROOF_BYTES {
            return Err(AppError::PayloadTooLarge);
        }
        if upload.bytes.is_empty() {
            return Err(AppError::BadRequest("file_required"));
        }

        // 1. Écrire le fichier sous une clé opaque
        let key = format!(
            "{}-{}.{}",
            invoice.id,
            Uuid::new_v4(),
            extension_for(upload.content_type.as_deref())
        );
        store.put(&key, &upload.bytes).await?;

        // 2. Mettre à jour la facture; en cas d'échec le nouveau fichier est retiré
        let previous_key = invoice.proof_key.clone();
        let mut active: invoices::ActiveModel = invoice.into();
        active.proof_key = Set(Some(key.clone()));
        active.proof_url = Set(Some(proof_url(id)));
        active.proof_content_type = Set(upload.content_type);
        active.status = Set(InvoiceStatus::Submitted);
        active.updated_at = Set(Utc::now());
        let updated = match active.update(db).await {
            Ok(updated) => updated,
            Err(e) => {
                Self::discard_proof(store, &key).await;
                return Err(e.into());
            }
        };

        // 3. L'ancienne preuve n'est plus référencée
        if let Some(previous) = previous_key.filter(|previous| *previous != key) {
            Self::discard_proof(store, &previous).await;
        }

        tracing::info!(invoice_id = id, "proof of payment uploaded");
        Ok(updated)
    }

    async fn discard_proof(store: &dyn ProofStore, key: &str) {
        if let Err(e) = store.delete(key).await {
            tracing::warn!(error = %e, key, "failed to delete proof file");
        }
    }

    /// Relit la preuve (étudiant, coach ou admin)
    #[instrument(skip(db, store, actor), fields(actor_id = actor.id))]
    pub async fn get_proof(
        db: &DatabaseConnection,
        store: &dyn ProofStore,
        actor: &Actor,
        id: i32,
    ) -> Result<ProofFile> {
        let invoice = Self::load_visible(db, actor, id).await?;
        let key = invoice
            .proof_key
            .as_deref()
            .ok_or(AppError::NotFound("proof_not_found"))?;

        let bytes = store.get(key).await?;
        Ok(ProofFile {
            bytes,
            content_type: invoice.proof_content_type,
        })
    }

    /// Change le statut (coach de la facture ou admin).
    /// Le statut arrive en texte brut: inconnu => bad_status.
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn set_status(
        db: &DatabaseConnection,
        actor: &Actor,
        id: i32,
        status: &str,
    ) -> Result<invoices::Model> {
        let invoice = Self::load_visible(db, actor, id).await?;
        ensure(actor, Self::as_resource(&invoice), Action::SetStatus)?;

        let status = InvoiceStatus::try_from_value(&status.trim().to_string())
            .map_err(|_| AppError::BadRequest("bad_status"))?;
        check_invoice_transition(Mover::Reviewer, invoice.status, status)?;

        let previous = invoice.status;
        let mut active: invoices::ActiveModel = invoice.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        tracing::info!(invoice_id = id, from = ?previous, to = ?status, "invoice status changed");
        Ok(updated)
    }
}
