// ============================================================================
// ROUTES : COACH PAYMENTS
// ============================================================================
//
// Tout ce que le coach configure pour se faire payer:
//   - /config   interrupteurs banque / e-wallet
//   - /banks    comptes bancaires (5 max)
//   - /ewallets e-wallets (5 max)
//   - /plans    plans tarifaires
//
// ============================================================================

use actix_web::{delete, get, patch, post, route, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::errors::AppError;
use crate::middleware::Actor;
use crate::models::dto::{
    CreateBankRequest, CreateEwalletRequest, CreatePlanRequest, PaymentsConfigRequest,
    UpdateBankRequest, UpdateEwalletRequest, UpdatePlanRequest,
};
use crate::services::{PaymentsService, PlanService};

fn deleted() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "ok": true }))
}

/// GET /api/coach-payments/config - Config + comptes du coach (COACH)
#[get("/config")]
pub async fn get_config(
    actor: Actor,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let settings = PaymentsService::get_settings(db.get_ref(), &actor).await?;
    Ok(HttpResponse::Ok().json(settings))
}

/// PATCH|POST /api/coach-payments/config - Activer / désactiver les canaux (COACH)
#[route("/config", method = "PATCH", method = "POST")]
pub async fn upsert_config(
    actor: Actor,
    body: web::Json<PaymentsConfigRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let config = PaymentsService::upsert_config(db.get_ref(), &actor, &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "config": config })))
}

// ----------------------------------------------------------------------------
// Comptes bancaires
// ----------------------------------------------------------------------------

#[get("/banks")]
pub async fn list_banks(
    actor: Actor,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let banks = PaymentsService::list_banks(db.get_ref(), &actor).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "banks": banks })))
}

/// POST /api/coach-payments/banks - 400 "limit" au-delà de 5
#[post("/banks")]
pub async fn add_bank(
    actor: Actor,
    body: web::Json<CreateBankRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let bank = PaymentsService::add_bank(db.get_ref(), &actor, &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "bank": bank })))
}

#[patch("/banks/{id}")]
pub async fn update_bank(
    actor: Actor,
    path: web::Path<i32>,
    body: web::Json<UpdateBankRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let bank = PaymentsService::update_bank(db.get_ref(), &actor, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "bank": bank })))
}

#[delete("/banks/{id}")]
pub async fn delete_bank(
    actor: Actor,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    PaymentsService::delete_bank(db.get_ref(), &actor, path.into_inner()).await?;
    Ok(deleted())
}

// ----------------------------------------------------------------------------
// E-wallets
// ----------------------------------------------------------------------------

#[get("/ewallets")]
pub async fn list_ewallets(
    actor: Actor,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let ewallets = PaymentsService::list_ewallets(db.get_ref(), &actor).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ewallets": ewallets })))
}

#[post("/ewallets")]
pub async fn add_ewallet(
    actor: Actor,
    body: web::Json<CreateEwalletRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let ewallet = PaymentsService::add_ewallet(db.get_ref(), &actor, &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "ewallet": ewallet })))
}

#[patch("/ewallets/{id}")]
pub async fn update_ewallet(
    actor: Actor,
    path: web::Path<i32>,
    body: web::Json<UpdateEwalletRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let ewallet = PaymentsService::update_ewallet(db.get_ref(), &actor, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ewallet": ewallet })))
}

#[delete("/ewallets/{id}")]
pub async fn delete_ewallet(
    actor: Actor,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    PaymentsService::delete_ewallet(db.get_ref(), &actor, path.into_inner()).await?;
    Ok(deleted())
}

// ----------------------------------------------------------------------------
// Plans
// ----------------------------------------------------------------------------

#[get("/plans")]
pub async fn list_plans(
    actor: Actor,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let plans = PlanService::list_plans(db.get_ref(), &actor).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "plans": plans })))
}

#[post("/plans")]
pub async fn create_plan(
    actor: Actor,
    body: web::Json<CreatePlanRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let plan = PlanService::create_plan(db.get_ref(), &actor, &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "plan": plan })))
}

#[patch("/plans/{id}")]
pub async fn update_plan(
    actor: Actor,
    path: web::Path<i32>,
    body: web::Json<UpdatePlanRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let plan = PlanService::update_plan(db.get_ref(), &actor, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "plan": plan })))
}

#[delete("/plans/{id}")]
pub async fn delete_plan(
    actor: Actor,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    PlanService::delete_plan(db.get_ref(), &actor, path.into_inner()).await?;
    Ok(deleted())
}

pub fn coach_payments_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/coach-payments")
            .service(get_config)
            .service(upsert_config)
            .service(list_banks)
            .service(add_bank)
            .service(update_bank)
            .service(delete_bank)
            .service(list_ewallets)
            .service(add_ewallet)
            .service(update_ewallet)
            .service(delete_ewallet)
            .service(list_plans)
            .service(create_plan)
            .service(update_plan)
            .service(delete_plan)
    );
}

#[cfg(test)]
mod tests {
    use actix_web::{http::header, http::StatusCode, test};
    use serde_json::json;

    use crate::models::users::{Role, UserStatus};
    use crate::test_utils::{bearer, create_user, init_test_app, setup_test_db};

    #[actix_web::test]
    async fn test_requires_a_session() {
        let db = setup_test_db().await;
        let app = init_test_app!(db);

        for uri in ["/api/coach-payments/config", "/api/coach-payments/banks", "/api/coach-payments/plans"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn test_config_accepts_patch_and_post() {
        let db = setup_test_db().await;
        let coach = create_user(&db, "coach@example.com", Role::Coach, UserStatus::Active).await;
        let app = init_test_app!(db);

        let req = test::TestRequest::get()
            .uri("/api/coach-payments/config")
            .insert_header((header::AUTHORIZATION, bearer(&coach)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["config"]["enableBank"], false);

        let req = test::TestRequest::patch()
            .uri("/api/coach-payments/config")
            .insert_header((header::AUTHORIZATION, bearer(&coach)))
            .set_json(json!({ "enableBank": true, "enableEwallet": false }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/coach-payments/config")
            .insert_header((header::AUTHORIZATION, bearer(&coach)))
            .set_json(json!({ "enableBank": true, "enableEwallet": true }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["config"]["enableEwallet"], true);
    }

    #[actix_web::test]
    async fn test_bank_cap_and_delete() {
        let db = setup_test_db().await;
        let coach = create_user(&db, "coach@example.com", Role::Coach, UserStatus::Active).await;
        let app = init_test_app!(db);

        let mut ids = Vec::new();
        for i in 0..5 {
            let req = test::TestRequest::post()
                .uri("/api/coach-payments/banks")
                .insert_header((header::AUTHORIZATION, bearer(&coach)))
                .set_json(json!({ "bankName": "BDO", "accountName": "Coach", "accountNumber": format!("000{}", i) }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: serde_json::Value = test::read_body_json(resp).await;
            ids.push(body["bank"]["id"].as_i64().unwrap());
        }

        let req = test::TestRequest::post()
            .uri("/api/coach-payments/banks")
            .insert_header((header::AUTHORIZATION, bearer(&coach)))
            .set_json(json!({ "bankName": "BPI", "accountName": "Coach", "accountNumber": "9999" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "limit");

        let req = test::TestRequest::delete()
            .uri(&format!("/api/coach-payments/banks/{}", ids[0]))
            .insert_header((header::AUTHORIZATION, bearer(&coach)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["ok"], true);
    }

    #[actix_web::test]
    async fn test_student_cannot_create_plans() {
        let db = setup_test_db().await;
        let student = create_user(&db, "sam@example.com", Role::Student, UserStatus::Active).await;
        let app = init_test_app!(db);

        let req = test::TestRequest::post()
            .uri("/api/coach-payments/plans")
            .insert_header((header::AUTHORIZATION, bearer(&student)))
            .set_json(json!({ "name": "Monthly", "type": "SUBSCRIPTION", "amount": 500 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
