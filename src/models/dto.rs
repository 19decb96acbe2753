// DTOs de l'API: requêtes validées (validator) et réponses structurées
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError};

use crate::errors::{AppError, Result};

use crate::models::invoices::PaymentChannel;
use crate::models::payment_plans::PlanType;
use crate::models::tickets::TicketStatus;
use crate::models::users::{AccessLevel, Role};
use crate::models::{
    coach_bank_accounts, coach_ewallets, coach_payments_config, decks, documents, invoices,
    payment_plans, progress_entries, ticket_comments, tickets, users,
};

// ----------------------------------------------------------------------------
// Validateurs communs
// ----------------------------------------------------------------------------

/// Refuse les chaînes vides une fois les espaces retirés
fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Email valide après normalisation (trim + minuscules)
fn email_address(value: &str) -> std::result::Result<(), ValidationError> {
    if !value.trim().to_lowercase().validate_email() {
        return Err(ValidationError::new("email"));
    }
    Ok(())
}

/// Champ optionnel d'une mise à jour partielle: absent => inchangé,
/// présent => valeur trimée, jamais vide
pub fn replacement(field: &str, value: &Option<String>) -> Result<Option<String>> {
    match value.as_deref().map(str::trim) {
        None => Ok(None),
        Some("") => Err(AppError::InvalidPayload(format!("{}: must not be blank", field))),
        Some(v) => Ok(Some(v.to_string())),
    }
}

// ----------------------------------------------------------------------------
// Auth
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "email_address"))]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8))]
    pub password: String,
}

/// Claims exposées au client après login (id, rôle, niveau d'accès)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub access_level: AccessLevel,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: SessionUser,
}

// ----------------------------------------------------------------------------
// Admin
// ----------------------------------------------------------------------------

/// Le statut est gardé en String pour renvoyer "bad_status" plutôt qu'un 400 générique
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub status: Option<String>,
}

// ----------------------------------------------------------------------------
// Decks, documents, progress
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeckRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "email_address"))]
    pub student_email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub deck_id: i32,
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProgressRequest {
    pub deck_id: i32,
    pub week_start: NaiveDate,
    #[validate(custom(function = "not_blank"))]
    pub summary: String,
    pub blockers: Option<String>,
    pub next_actions: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
}

impl From<&users::Model> for UserSummary {
    fn from(user: &users::Model) -> Self {
        UserSummary {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketWithComments {
    #[serde(flatten)]
    pub ticket: tickets::Model,
    pub author_email: Option<String>,
    pub comments: Vec<ticket_comments::Model>,
}

#[derive(Debug, Serialize)]
pub struct DeckSummary {
    #[serde(flatten)]
    pub deck: decks::Model,
    pub coach: UserSummary,
    pub student: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct DeckDetail {
    #[serde(flatten)]
    pub deck: decks::Model,
    pub coach: UserSummary,
    pub student: Option<UserSummary>,
    pub tickets: Vec<TicketWithComments>,
    pub documents: Vec<documents::Model>,
    pub progress: Vec<progress_entries::Model>,
}

// ----------------------------------------------------------------------------
// Tickets
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub deck_id: i32,
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct SetTicketStatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(custom(function = "not_blank"))]
    pub body: String,
}

// ----------------------------------------------------------------------------
// Coach payments
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsConfigRequest {
    pub enable_bank: bool,
    pub enable_ewallet: bool,
}

#[derive(Debug, Serialize)]
pub struct PaymentSettings {
    pub config: coach_payments_config::Model,
    pub banks: Vec<coach_bank_accounts::Model>,
    pub ewallets: Vec<coach_ewallets::Model>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBankRequest {
    #[validate(custom(function = "not_blank"))]
    pub bank_name: String,
    #[validate(custom(function = "not_blank"))]
    pub account_name: String,
    #[validate(custom(function = "not_blank"))]
    pub account_number: String,
    pub branch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBankRequest {
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEwalletRequest {
    #[validate(custom(function = "not_blank"))]
    pub provider: String,
    #[validate(custom(function = "not_blank"))]
    pub handle: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEwalletRequest {
    pub provider: Option<String>,
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    #[validate(range(min = 0))]
    pub amount: i64,
    pub currency: Option<String>, // 'PHP' si absent
    pub active: Option<bool>,     // true si absent
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub plan_type: Option<PlanType>,
    #[validate(range(min = 0))]
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub active: Option<bool>,
}

// ----------------------------------------------------------------------------
// Invoices
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub plan_id: i32,
    pub channel: PaymentChannel,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Instructions de paiement visibles par l'étudiant.
/// Un canal n'apparaît que si le coach l'a activé ET a au moins un compte.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub bank_accounts: Vec<coach_bank_accounts::Model>,
    pub ewallets: Vec<coach_ewallets::Model>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    pub invoice: invoices::Model,
    pub plan: Option<payment_plans::Model>,
    pub coach: UserSummary,
    pub instructions: PaymentInstructions,
}
