use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::errors::AppError;
use crate::middleware::Actor;
use crate::models::dto::{SetStatusRequest, UserListQuery};
use crate::services::AdminService;

/// GET /api/admin/users?status=PENDING - Comptes pour l'écran des approbations (SUPER_ADMIN)
#[get("/users")]
pub async fn list_users(
    actor: Actor,
    query: web::Query<UserListQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let users = AdminService::list_users(db.get_ref(), &actor, query.status.as_deref()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "users": users })))
}

/// POST /api/admin/users/{id}/status - Approuver / désactiver un compte (SUPER_ADMIN)
#[post("/users/{id}/status")]
pub async fn set_user_status(
    actor: Actor,
    path: web::Path<i32>,
    body: web::Json<SetStatusRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let user = AdminService::set_user_status(db.get_ref(), &actor, path.into_inner(), &body.status).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": user })))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(list_users)
            .service(set_user_status)
    );
}

#[cfg(test)]
mod tests {
    use actix_web::{http::header, http::StatusCode, test};
    use serde_json::json;

    use crate::models::users::{Role, UserStatus};
    use crate::test_utils::{bearer, create_user, init_test_app, setup_test_db};

    #[actix_web::test]
    async fn test_approval_flow() {
        let db = setup_test_db().await;
        let admin = create_user(&db, "root@example.com", Role::SuperAdmin, UserStatus::Active).await;
        let coach = create_user(&db, "coach@example.com", Role::Coach, UserStatus::Pending).await;
        let app = init_test_app!(db);

        let req = test::TestRequest::get()
            .uri("/api/admin/users?status=PENDING")
            .insert_header((header::AUTHORIZATION, bearer(&admin)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["users"].as_array().unwrap().len(), 1);
        assert!(body["users"][0].get("passwordHash").is_none());

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/users/{}/status", coach.id))
            .insert_header((header::AUTHORIZATION, bearer(&admin)))
            .set_json(json!({ "status": "ACTIVE" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["status"], "ACTIVE");

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/users/{}/status", coach.id))
            .insert_header((header::AUTHORIZATION, bearer(&admin)))
            .set_json(json!({ "status": "ASLEEP" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "bad_status");
    }

    #[actix_web::test]
    async fn test_coach_cannot_approve() {
        let db = setup_test_db().await;
        let coach = create_user(&db, "coach@example.com", Role::Coach, UserStatus::Active).await;
        let pending = create_user(&db, "other@example.com", Role::Coach, UserStatus::Pending).await;
        let app = init_test_app!(db);

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/users/{}/status", pending.id))
            .insert_header((header::AUTHORIZATION, bearer(&coach)))
            .set_json(json!({ "status": "ACTIVE" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
