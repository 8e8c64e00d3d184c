use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use barkeep_core::BarkeepError;

// ---------------------------------------------------------------------------
// Internal sentinel for malformed requests
// ---------------------------------------------------------------------------

/// Private sentinel error type used to carry an explicit HTTP 400 through
/// the `anyhow::Error` chain for request problems the core never sees.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    /// Wrap a failed `spawn_blocking` join.
    pub fn join(err: tokio::task::JoinError) -> Self {
        Self(anyhow::anyhow!("task join error: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(b) = self.0.downcast_ref::<BadRequestError>() {
            let body = serde_json::json!({ "error": b.0.clone() });
            return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
        }

        let status = if let Some(e) = self.0.downcast_ref::<BarkeepError>() {
            match e {
                BarkeepError::RecipeNotFound(_) => StatusCode::NOT_FOUND,
                BarkeepError::IngredientUnmapped { .. }
                | BarkeepError::PumpUnconfigured { .. }
                | BarkeepError::EmptyPlan(_) => StatusCode::UNPROCESSABLE_ENTITY,
                BarkeepError::InvalidManualEntry => StatusCode::BAD_REQUEST,
                BarkeepError::WorkerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                BarkeepError::ConfigUnreadable { .. } | BarkeepError::ConfigMalformed(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
