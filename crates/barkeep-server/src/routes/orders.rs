use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use barkeep_core::planner;
use barkeep_core::types::RecipeId;
use barkeep_core::Receipt;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderBody {
    #[serde(default)]
    pub recipe_id: Option<RecipeId>,
}

/// POST /api/orders: plan a recipe against the current configuration and
/// queue it.
///
/// Nothing is queued unless planning succeeds; the response returns as soon
/// as the job is enqueued.
pub async fn submit_order(
    State(app): State<AppState>,
    body: Result<Json<OrderBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Receipt>), AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    let recipe_id = body
        .recipe_id
        .ok_or_else(|| AppError::bad_request("missing field 'recipe_id'"))?;

    let snapshot = app.snapshot().await.map_err(AppError::join)??;
    let (plan, name) = planner::build_recipe_plan(recipe_id.as_str(), &snapshot)?;
    let receipt = app.dispatcher.submit(name, plan, snapshot.pacing())?;

    Ok((StatusCode::ACCEPTED, Json(receipt)))
}
