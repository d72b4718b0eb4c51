use std::sync::Arc;

use crate::services::scanner::ScanController;

#[derive(Clone)]
pub struct AppState {
    /// Owns the worker pool, stats and found-wallet store
    pub controller: Arc<ScanController>,

    // Authentication
    pub access_token: String,
}
