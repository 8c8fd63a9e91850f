use axum::Json;
use serde_json::{json, Value};

/// GET /api/status: liveness probe, no side effects.
pub async fn get_status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "MonitorSys API is running",
    }))
}
