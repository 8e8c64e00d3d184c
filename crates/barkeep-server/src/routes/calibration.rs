use axum::extract::State;
use axum::Json;
use barkeep_core::calibration::{self, CalibrationEntry};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CalibrationView {
    /// Seconds per unit applied to channels without a calibration.
    pub default_rate: f64,
    /// Keyed by channel number. When two pumps share a channel, the one
    /// whose calibration the planner uses is shown.
    pub channels: BTreeMap<u32, CalibrationEntry>,
}

/// GET /api/calibration: the per-channel rate table in effect right now.
pub async fn get_calibration(
    State(app): State<AppState>,
) -> Result<Json<CalibrationView>, AppError> {
    let snapshot = app.snapshot().await.map_err(AppError::join)??;

    let channels = calibration::channel_report(&snapshot)
        .into_iter()
        .map(|(channel, entry)| (channel.0, entry))
        .collect();

    Ok(Json(CalibrationView {
        default_rate: snapshot.settings.default_rate,
        channels,
    }))
}
