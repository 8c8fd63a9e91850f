/// Shared application state for the HTTP and WebSocket handlers.
/// Cheap to clone; the hub is passed explicitly rather than held globally.

use std::sync::Arc;

use crate::hub::BroadcastHub;

#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { hub }),
        }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.inner.hub
    }
}
