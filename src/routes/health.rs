use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::models::health::HealthResponse;

/// GET /api/health - Serveur + base de données (PUBLIC)
#[get("/health")]
pub async fn health_check(db: web::Data<DatabaseConnection>) -> HttpResponse {
    let reachable = match db.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "database ping failed");
            false
        }
    };

    let response = HealthResponse::from_ping(reachable);
    if response.is_ok() {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
