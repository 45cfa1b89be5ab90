use std::sync::Arc;

use devwatch_service::{DeviceRepository, StatusRefresher};

/// Shared handles injected into every route
pub struct AppState {
    pub refresher: Arc<StatusRefresher>,
    pub repository: Arc<dyn DeviceRepository>,
}

impl AppState {
    pub fn new(refresher: Arc<StatusRefresher>) -> Self {
        let repository = Arc::clone(refresher.repository());
        Self { refresher, repository }
    }
}
