use axum::extract::State;
use axum::Json;
use barkeep_core::config::RecipeDef;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/menu: recipes from the current configuration, in file order.
pub async fn get_menu(State(app): State<AppState>) -> Result<Json<Vec<RecipeDef>>, AppError> {
    let snapshot = app.snapshot().await.map_err(AppError::join)??;
    Ok(Json(snapshot.recipes))
}
