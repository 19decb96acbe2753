use actix_web::{post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::errors::AppError;
use crate::middleware::Actor;
use crate::models::dto::CreateProgressRequest;
use crate::services::DeckService;

/// POST /api/progress - Entrée de progression hebdomadaire (coach du deck ou admin)
#[post("")]
pub async fn create_progress(
    actor: Actor,
    body: web::Json<CreateProgressRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let entry = DeckService::add_progress(db.get_ref(), &actor, &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "progress": entry })))
}

pub fn progress_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/progress").service(create_progress));
}

#[cfg(test)]
mod tests {
    use actix_web::{http::header, http::StatusCode, test};
    use serde_json::json;

    use crate::config::AppConfig;
    use crate::middleware::Actor;
    use crate::models::dto::CreateDeckRequest;
    use crate::models::users::{Role, UserStatus};
    use crate::services::DeckService;
    use crate::test_utils::{bearer, create_user, init_test_app, setup_test_db};

    #[actix_web::test]
    async fn test_coach_adds_progress_and_document() {
        let db = setup_test_db().await;
        let coach = create_user(&db, "coach@example.com", Role::Coach, UserStatus::Active).await;
        let deck = DeckService::create_deck(
            &db,
            &AppConfig::for_tests(),
            &Actor::from(&coach),
            &CreateDeckRequest {
                name: "Deck".to_string(),
                student_email: "sam@example.com".to_string(),
            },
        )
        .await
        .unwrap();
        let app = init_test_app!(db);

        let req = test::TestRequest::post()
            .uri("/api/progress")
            .insert_header((header::AUTHORIZATION, bearer(&coach)))
            .set_json(json!({
                "deckId": deck.deck.id,
                "weekStart": "2025-03-03",
                "summary": "Good week",
                "blockers": "",
                "nextActions": "Ship it"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["progress"]["weekStart"], "2025-03-03");
        assert!(body["progress"]["blockers"].is_null());

        let req = test::TestRequest::post()
            .uri("/api/documents")
            .insert_header((header::AUTHORIZATION, bearer(&coach)))
            .set_json(json!({ "deckId": deck.deck.id, "title": "Roadmap", "url": "https://example.com/doc" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/documents")
            .insert_header((header::AUTHORIZATION, bearer(&coach)))
            .set_json(json!({ "deckId": 9999, "title": "Lost" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
