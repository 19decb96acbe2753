// ============================================================================
// ERREURS DE L'API
// ============================================================================
//
// Toutes les erreurs métier remontent sous forme d'AppError, puis actix-web
// les transforme en réponse JSON { "error": "<code>" }.
//
// Codes HTTP:
//   - 400 : payload invalide, statut inconnu, token de reset invalide
//   - 401 : pas de session / identifiants invalides
//   - 403 : authentifié mais pas le bon rôle / pas propriétaire
//   - 404 : ressource absente (ou non visible pour l'appelant)
//   - 409 : conflit (email déjà pris, étudiant déjà jumelé...)
//   - 413 : fichier trop volumineux
//   - 500 : base de données, stockage, erreurs internes (détail uniquement
//           dans les logs)
//
// ============================================================================

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    #[error("Conflict: {0}")]
    Conflict(&'static str),

    #[error("File too large")]
    PayloadTooLarge,

    #[error("Channel limit reached")]
    CapExceeded,

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Code machine renvoyé dans le champ "error"
    pub fn code(&self) -> &str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Forbidden(code)
            | AppError::NotFound(code)
            | AppError::BadRequest(code)
            | AppError::Conflict(code) => code,
            AppError::InvalidPayload(_) => "invalid_payload",
            AppError::PayloadTooLarge => "file_too_large",
            AppError::CapExceeded => "limit",
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => {
                "internal_error"
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidPayload(errors.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> Self {
        AppError::InvalidPayload(error.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidPayload(_) | AppError::BadRequest(_) | AppError::CapExceeded => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else if let AppError::InvalidPayload(detail) = self {
            tracing::debug!(%detail, "invalid payload");
        }

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.code()
        }))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
