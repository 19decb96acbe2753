mod config;
mod db;
mod email;
mod errors;
mod middleware;
mod models;
mod routes;
mod services;
mod storage;
mod utils;
#[cfg(test)]
mod test_utils;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, web};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::services::OutboxService;
use crate::storage::{LocalDiskStore, ProofStore};

fn startup_error(context: &str, error: impl std::fmt::Display) -> io::Error {
    tracing::error!(%error, "{}", context);
    io::Error::other(format!("{}: {}", context, error))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Logs (RUST_LOG, "info" par défaut)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 2. Configuration
    dotenv::dotenv().ok();
    let config = AppConfig::from_env().map_err(|e| startup_error("invalid configuration", e))?;

    // 3. Base de données + schéma
    tracing::info!("connecting to database");
    let db = db::establish_connection(&config.database_url)
        .await
        .map_err(|e| startup_error("failed to connect to database", e))?;
    db::create_tables(&db)
        .await
        .map_err(|e| startup_error("failed to create tables", e))?;

    if let Some(seed) = &config.seed_admin {
        db::seed_super_admin(&db, seed)
            .await
            .map_err(|e| startup_error("failed to seed super admin", e))?;
    }

    // 4. Emails: le worker vide l'outbox en tâche de fond
    let mailer = email::build_mailer(&config).map_err(|e| startup_error("invalid email configuration", e))?;
    OutboxService::spawn_worker(db.clone(), mailer, Duration::from_secs(config.outbox_poll_seconds));

    // 5. Stockage des preuves de paiement
    let disk_store = LocalDiskStore::new(config.upload_dir.clone());
    tracing::info!(dir = %disk_store.root().display(), "proof files stored on local disk");
    let store: Arc<dyn ProofStore> = Arc::new(disk_store);

    let bind = (config.host.clone(), config.port);
    tracing::info!(host = %bind.0, port = bind.1, "starting server");

    let config = web::Data::new(config);
    let store = web::Data::from(store);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::Data::new(db.clone()))
            .app_data(config.clone())
            .app_data(store.clone())
            .configure(routes::configure_routes)
    })
        .bind(bind)?
        .run()
        .await
}
