use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// GET /api/health: liveness probe.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "online",
        timestamp: chrono::Utc::now(),
    })
}
