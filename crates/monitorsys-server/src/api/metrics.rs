use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::error;

use monitorsys_protocol::snapshot::Snapshot;

use crate::state::AppState;

/// GET /metrics: one fresh snapshot.
///
/// Goes through the hub so the collector's previous-sample state is only
/// ever touched by one caller at a time.
pub async fn get_metrics(State(state): State<AppState>) -> Result<Json<Snapshot>, StatusCode> {
    let hub = state.hub().clone();
    tokio::task::spawn_blocking(move || hub.snapshot())
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "Snapshot task panicked");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
