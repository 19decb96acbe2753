use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::middleware::Actor;
use crate::models::dto::{ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest};
use crate::services::AuthService;

/// POST /api/auth/register - Inscription d'un coach, en attente d'approbation (PUBLIC)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    AuthService::register(db.get_ref(), &body).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "ok": true })))
}

/// POST /api/auth/login - Connexion, renvoie un JWT (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let response = AuthService::login(db.get_ref(), &config, &body.email, &body.password).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/auth/me - Utilisateur courant (PROTÉGÉE)
#[get("/me")]
pub async fn me(actor: Actor) -> HttpResponse {
    HttpResponse::Ok().json(actor)
}

/// POST /api/auth/forgot - Demande de reset (PUBLIC, toujours {ok: true})
#[post("/forgot")]
pub async fn forgot(
    body: web::Json<ForgotPasswordRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    AuthService::forgot_password(db.get_ref(), &config, body.email.as_deref()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })))
}

/// POST /api/auth/reset - Nouveau mot de passe à partir du token (PUBLIC)
#[post("/reset")]
pub async fn reset(
    body: web::Json<ResetPasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    AuthService::reset_password(db.get_ref(), &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(me)
            .service(forgot)
            .service(reset)
    );
}
