use std::sync::Arc;
use std::time::Instant;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::store::BlobEngine;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub engine: Arc<BlobEngine>,
    pub config: AppConfig,
    pub started_at: Instant,
}
