use chrono::{DateTime, Utc};
use serde::Serialize;

/// Réponse de GET /api/health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,   // "ok" ou "degraded"
    pub database: &'static str, // "ok" ou "unreachable"
    pub time: DateTime<Utc>,
}

impl HealthResponse {
    pub fn from_ping(database_reachable: bool) -> Self {
        Self {
            status: if database_reachable { "ok" } else { "degraded" },
            database: if database_reachable { "ok" } else { "unreachable" },
            time: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
