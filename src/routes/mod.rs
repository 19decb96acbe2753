pub mod health;
pub mod auth;
pub mod admin;
pub mod decks;
pub mod documents;
pub mod progress;
pub mod tickets;
pub mod coach_payments;
pub mod invoices;

use actix_web::web;

use crate::errors::AppError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Erreurs d'extraction (JSON, path, query) => {"error": "invalid_payload"}
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::InvalidPayload(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::InvalidPayload(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::InvalidPayload(err.to_string()).into()),
    );

    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(admin::admin_routes)
            .configure(decks::deck_routes)
            .configure(documents::document_routes)
            .configure(progress::progress_routes)
            .configure(tickets::ticket_routes)
            .configure(coach_payments::coach_payments_routes)
            .configure(invoices::invoice_routes)
    );
}
