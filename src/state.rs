use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::ai::GenerativeBackend;
use crate::compositor::MemeCompositor;
use crate::config::Config;
use crate::db::SqliteStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub config: Config,
    pub backend: Arc<dyn GenerativeBackend>,
    pub compositor: Arc<MemeCompositor>,
}

impl AppState {
    pub fn backend(&self) -> &dyn GenerativeBackend {
        self.backend.as_ref()
    }

    pub fn language(&self) -> &str {
        &self.config.ai.language
    }
}
