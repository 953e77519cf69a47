use std::sync::Arc;

use cinelog_scanner::scan::ScanManager;
use sqlx::SqlitePool;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub scanner: Arc<ScanManager>,
}
