use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::middleware::Actor;
use crate::models::dto::CreateDeckRequest;
use crate::services::DeckService;

/// GET /api/decks - Decks visibles par l'utilisateur
#[get("")]
pub async fn list_decks(
    actor: Actor,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let decks = DeckService::list_decks(db.get_ref(), &actor).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "decks": decks })))
}

/// POST /api/decks - Nouveau deck coach <-> étudiant (COACH)
#[post("")]
pub async fn create_deck(
    actor: Actor,
    body: web::Json<CreateDeckRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let deck = DeckService::create_deck(db.get_ref(), &config, &actor, &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "deck": deck })))
}

/// GET /api/decks/{id} - Détail: tickets, documents, progression
#[get("/{id}")]
pub async fn get_deck(
    actor: Actor,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let deck = DeckService::get_deck(db.get_ref(), &actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "deck": deck })))
}

pub fn deck_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/decks")
            .service(list_decks)
            .service(create_deck)
            .service(get_deck)
    );
}
