use actix_web::{post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::errors::AppError;
use crate::middleware::Actor;
use crate::models::dto::CreateDocumentRequest;
use crate::services::DeckService;

/// POST /api/documents - Ajouter un document à un deck (coach du deck ou admin)
#[post("")]
pub async fn create_document(
    actor: Actor,
    body: web::Json<CreateDocumentRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let document = DeckService::add_document(db.get_ref(), &actor, &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "document": document })))
}

pub fn document_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/documents").service(create_document));
}
