use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::AppState;

/// GET /api/events: SSE stream of job lifecycle events.
///
/// Each event is named after its type (`accepted`, `started`, `finished`) and
/// carries the JSON-encoded event as data. Lagged receivers silently skip what
/// they missed.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.dispatcher.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let event = msg.ok()?;
        let data = serde_json::to_value(&event).ok()?;
        let kind = data["type"].as_str().unwrap_or("job").to_string();
        Some(Ok::<Event, Infallible>(
            Event::default().event(kind).data(data.to_string()),
        ))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
