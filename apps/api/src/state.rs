use std::sync::Arc;

use crate::blocks::saves::SaveRegistry;
use crate::config::Config;
use crate::store::BlockStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Postgres when `DATABASE_URL` is set, in-memory otherwise.
    pub store: Arc<dyn BlockStore>,
    pub saves: SaveRegistry,
    pub config: Config,
}
