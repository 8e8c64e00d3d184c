use axum::extract::State;
use axum::Json;
use barkeep_core::status::SystemStatus;

use crate::state::AppState;

/// GET /api/status: whether a job is running and how many are waiting.
///
/// Advisory: `busy` and `queue_depth` are read independently.
pub async fn get_status(State(app): State<AppState>) -> Json<SystemStatus> {
    Json(app.dispatcher.status())
}
