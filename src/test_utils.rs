//! Outils partagés par les tests: base SQLite en mémoire, fixtures, mailer
//! qui enregistre les envois.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

use crate::config::AppConfig;
use crate::email::{Mailer, OutgoingEmail};
use crate::middleware::Actor;
use crate::models::users::{self, AccessLevel, Role, UserStatus};
use crate::storage::LocalDiskStore;
use crate::utils::{jwt, password};

pub const TEST_PASSWORD: &str = "password123";

/// Base SQLite en mémoire avec toutes les tables
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    crate::db::create_tables(&db).await.expect("schema");
    db
}

/// Crée un user avec TEST_PASSWORD comme mot de passe.
/// Un SUPER_ADMIN reçoit le niveau d'accès ADMIN.
pub async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
    status: UserStatus,
) -> users::Model {
    let now = Utc::now();
    let access_level = if role == Role::SuperAdmin {
        AccessLevel::Admin
    } else {
        AccessLevel::User
    };

    users::ActiveModel {
        email: Set(email.to_lowercase()),
        name: Set(Some(email.split('@').next().unwrap_or(email).to_string())),
        password_hash: Set(Some(password::hash_password(TEST_PASSWORD).expect("hash"))),
        role: Set(role),
        access_level: Set(access_level),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn active_user(db: &DatabaseConnection, email: &str, role: Role) -> (users::Model, Actor) {
    let user = create_user(db, email, role, UserStatus::Active).await;
    let actor = Actor::from(&user);
    (user, actor)
}

/// Valeur du header Authorization pour ce user
pub fn bearer(user: &users::Model) -> String {
    let token = jwt::generate_token(user, &AppConfig::for_tests().jwt_secret).expect("token");
    format!("Bearer {}", token)
}

/// Mailer de test: garde les emails en mémoire, ou échoue à chaque envoi
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("mailer lock").clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|e| e.to).collect()
    }
}

impl Mailer for RecordingMailer {
    fn send_mail(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        if self.fail {
            return Err("smtp unavailable".to_string());
        }
        self.sent.lock().expect("mailer lock").push(OutgoingEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub const MULTIPART_BOUNDARY: &str = "coachdeck-test-boundary";

/// Corps multipart/form-data avec un seul champ fichier
pub fn multipart_body(field: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY)
}

/// Stockage de preuves dans un répertoire temporaire unique
pub fn temp_store() -> Arc<LocalDiskStore> {
    Arc::new(LocalDiskStore::new(
        std::env::temp_dir().join(format!("coachdeck-test-{}", uuid::Uuid::new_v4())),
    ))
}

/// App actix complète (routes + état) branchée sur la base de test
macro_rules! init_test_app {
    ($db:expr) => {
        $crate::test_utils::init_test_app!($db, $crate::test_utils::temp_store())
    };
    ($db:expr, $store:expr) => {{
        let store: std::sync::Arc<dyn $crate::storage::ProofStore> = $store;
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(($db).clone()))
                .app_data(actix_web::web::Data::new($crate::config::AppConfig::for_tests()))
                .app_data(actix_web::web::Data::from(store))
                .configure($crate::routes::configure_routes),
        )
        .await
    }};
}
pub(crate) use init_test_app;
