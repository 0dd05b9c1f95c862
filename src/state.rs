use std::sync::Arc;

use crate::config::HubConfig;

/// Shared application state, passed to all route handlers via
/// `axum::extract::State`.
///
/// Deliberately thin: the upstream client is request-scoped (built and
/// dropped inside each handler), so the only shared piece is configuration.
pub struct AppState {
    pub config: HubConfig,
}

impl AppState {
    pub fn new(config: HubConfig) -> Arc<Self> {
        Arc::new(Self { config })
    }
}
