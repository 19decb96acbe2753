use actix_web::{patch, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::errors::AppError;
use crate::middleware::Actor;
use crate::models::dto::{CreateCommentRequest, CreateTicketRequest, SetTicketStatusRequest};
use crate::services::TicketService;

/// POST /api/tickets - Ouvrir un ticket sur son deck (STUDENT)
#[post("")]
pub async fn create_ticket(
    actor: Actor,
    body: web::Json<CreateTicketRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let ticket = TicketService::create_ticket(db.get_ref(), &actor, &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "ticket": ticket })))
}

/// PATCH /api/tickets/{id}/status - Changer le statut (coach du deck ou admin)
#[patch("/{id}/status")]
pub async fn set_ticket_status(
    actor: Actor,
    path: web::Path<i32>,
    body: web::Json<SetTicketStatusRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let ticket = TicketService::set_status(db.get_ref(), &actor, path.into_inner(), body.status).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ticket": ticket })))
}

/// POST /api/tickets/{id}/comments - Répondre sur un ticket
#[post("/{id}/comments")]
pub async fn add_comment(
    actor: Actor,
    path: web::Path<i32>,
    body: web::Json<CreateCommentRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let comment = TicketService::add_comment(db.get_ref(), &actor, path.into_inner(), &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "comment": comment })))
}

pub fn ticket_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tickets")
            .service(create_ticket)
            .service(set_ticket_status)
            .service(add_comment)
    );
}
