use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: PgPool, config: Config) -> Self {
        Self { db_pool, config: Arc::new(config) }
    }
}
