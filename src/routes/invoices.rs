use actix_multipart::Multipart;
use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{get, patch, post, web, HttpResponse};
use futures::TryStreamExt;
use sea_orm::DatabaseConnection;

use crate::errors::AppError;
use crate::middleware::Actor;
use crate::models::dto::{CreateInvoiceRequest, SetStatusRequest};
use crate::services::invoice_service::{ProofUpload, MAX_PROOF_BYTES};
use crate::services::InvoiceService;
use crate::storage::ProofStore;

/// Lit le champ "file" du formulaire, en coupant au-delà de MAX_PROOF_BYTES
async fn read_proof_field(mut payload: Multipart) -> Result<ProofUpload, AppError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(|mime| mime.essence_str().to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > MAX_PROOF_BYTES {
                return Err(AppError::PayloadTooLarge);
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(ProofUpload { bytes, content_type });
    }

    Err(AppError::BadRequest("file_required"))
}

/// GET /api/invoices - Factures de l'utilisateur (étudiant, coach) ou toutes (admin)
#[get("")]
pub async fn list_invoices(
    actor: Actor,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let invoices = InvoiceService::list_invoices(db.get_ref(), &actor).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "invoices": invoices })))
}

/// POST /api/invoices - Nouvelle facture à partir d'un plan (STUDENT)
#[post("")]
pub async fn create_invoice(
    actor: Actor,
    body: web::Json<CreateInvoiceRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let invoice = InvoiceService::create_invoice(db.get_ref(), &actor, &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "invoice": invoice })))
}

/// GET /api/invoices/{id} - Facture, plan, coach et instructions de paiement
#[get("/{id}")]
pub async fn get_invoice(
    actor: Actor,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let detail = InvoiceService::get_invoice(db.get_ref(), &actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// POST /api/invoices/{id}/upload - Preuve de paiement, multipart champ "file" (STUDENT)
#[post("/{id}/upload")]
pub async fn upload_proof(
    actor: Actor,
    path: web::Path<i32>,
    payload: Multipart,
    db: web::Data<DatabaseConnection>,
    store: web::Data<dyn ProofStore>,
) -> Result<HttpResponse, AppError> {
    let upload = read_proof_field(payload).await?;
    let invoice =
        InvoiceService::attach_proof(db.get_ref(), store.get_ref(), &actor, path.into_inner(), upload).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "invoice": invoice })))
}

/// GET /api/invoices/{id}/proof - Contenu de la preuve
#[get("/{id}/proof")]
pub async fn get_proof(
    actor: Actor,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    store: web::Data<dyn ProofStore>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let proof = InvoiceService::get_proof(db.get_ref(), store.get_ref(), &actor, id).await?;
    let content_type = proof
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    // Le type vient du client: jamais interprété ni affiché inline par le navigateur
    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(format!("invoice-{}-proof", id))],
        })
        .body(proof.bytes))
}

/// PATCH /api/invoices/{id}/status - Revue de la facture (coach ou admin)
#[patch("/{id}/status")]
pub async fn set_invoice_status(
    actor: Actor,
    path: web::Path<i32>,
    body: web::Json<SetStatusRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let invoice = InvoiceService::set_status(db.get_ref(), &actor, path.into_inner(), &body.status).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "invoice": invoice })))
}

pub fn invoice_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/invoices")
            .service(list_invoices)
            .service(create_invoice)
            .service(get_invoice)
            .service(upload_proof)
            .service(get_proof)
            .service(set_invoice_status)
    );
}
