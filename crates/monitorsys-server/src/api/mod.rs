pub mod metrics;
pub mod status;

use std::path::Path;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

use crate::state::AppState;
use crate::websocket;

pub fn build_router(state: AppState, frontend_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/api/status", get(status::get_status))
        .route("/metrics", get(metrics::get_metrics))
        .route("/ws", get(websocket::ws_handler));

    // Prebuilt dashboard with SPA fallback to index.html
    let router = match frontend_dir {
        Some(dir) if dir.join("index.html").is_file() => {
            info!(dir = %dir.display(), "Serving dashboard");
            let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            router.fallback_service(spa)
        }
        Some(dir) => {
            warn!(dir = %dir.display(), "Frontend directory has no index.html, not serving it");
            router
        }
        None => router,
    };

    router.layer(CorsLayer::permissive()).with_state(state)
}
