use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};

use crate::models::users::{self, AccessLevel, Role};

const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Claims embarquées dans la session.
/// Elles servent à identifier l'appelant; les droits sur une ressource sont
/// toujours recalculés à partir du user relu en base.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: i32,        // user_id
    pub role: Role,
    pub access_level: AccessLevel,
    pub exp: i64,        // expiration timestamp
}

/// Génère un JWT token pour un utilisateur
pub fn generate_token(user: &users::Model, secret: &str) -> Result<String, String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_LIFETIME_HOURS))
        .ok_or("Failed to calculate expiration")?
        .timestamp();

    let claims = Claims {
        sub: user.id,
        role: user.role,
        access_level: user.access_level,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
        .map_err(|e| format!("Failed to generate token: {}", e))
}

/// Vérifie et décode un JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}
