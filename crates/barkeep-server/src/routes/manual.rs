use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use barkeep_core::plan::Pacing;
use barkeep_core::planner::{self, ManualEntry};
use barkeep_core::{BarkeepError, Receipt};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

const MANUAL_JOB_NAME: &str = "Manual test";
const PUMP_TEST_JOB_NAME: &str = "Pump test";
const PUMP_TEST_DEFAULT_SECS: f64 = 3.0;

#[derive(Debug, Deserialize)]
pub struct ManualBody {
    #[serde(default)]
    pub entries: Vec<ManualEntry>,
    #[serde(default)]
    pub name: Option<String>,
}

/// POST /api/manual: run channels for raw durations, bypassing recipes and
/// calibration.
///
/// Unusable entries are dropped; the request fails only when none remain.
/// Pacing still comes from the configuration, but a broken config file does
/// not block manual tests.
pub async fn submit_manual(
    State(app): State<AppState>,
    body: Result<Json<ManualBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Receipt>), AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    let plan = planner::build_manual_plan(&body.entries)?;

    let pacing = match app.snapshot().await.map_err(AppError::join)? {
        Ok(snapshot) => snapshot.pacing(),
        Err(e) => {
            tracing::warn!(error = %e, "config unavailable, manual job uses default pacing");
            Pacing::default()
        }
    };

    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| MANUAL_JOB_NAME.to_string());
    let receipt = app.dispatcher.submit(name, plan, pacing)?;

    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

#[derive(Debug, Deserialize)]
pub struct PumpTestBody {
    /// Hold time for every pump. Loosely typed like manual entries.
    #[serde(default = "default_pump_test_secs", alias = "duration_seconds")]
    pub seconds: serde_json::Value,
}

fn default_pump_test_secs() -> serde_json::Value {
    PUMP_TEST_DEFAULT_SECS.into()
}

/// POST /api/manual/all: run every configured channel in turn for the same
/// duration, in pump declaration order.
///
/// Unlike `/api/manual` this needs the configuration for the channel list,
/// so a broken config file fails the request.
pub async fn submit_pump_test(
    State(app): State<AppState>,
    body: Result<Json<PumpTestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Receipt>), AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    let snapshot = app.snapshot().await.map_err(AppError::join)??;

    let channels = snapshot.channels();
    if channels.is_empty() {
        return Err(BarkeepError::EmptyPlan(PUMP_TEST_JOB_NAME.to_string()).into());
    }
    let entries: Vec<ManualEntry> = channels
        .iter()
        .map(|channel| ManualEntry {
            channel: channel.0.into(),
            seconds: body.seconds.clone(),
        })
        .collect();
    let plan = planner::build_manual_plan(&entries)?;

    let receipt = app
        .dispatcher
        .submit(PUMP_TEST_JOB_NAME, plan, snapshot.pacing())?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}
