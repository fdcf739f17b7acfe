use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;

use crate::{
    auth::TokenKeys,
    config::AppConfig,
    db::{self, DbPool},
};

/// Shared, cheaply cloneable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub http_client: Client,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> Result<Self> {
        let db_pool = db::create_pool(&config.database).await?;
        Ok(Self::with_pool(config, db_pool))
    }

    pub fn with_pool(config: AppConfig, db_pool: DbPool) -> Self {
        let tokens = TokenKeys::new(&config.auth);
        Self {
            db_pool,
            http_client: Client::new(),
            config: Arc::new(config),
            tokens: Arc::new(tokens),
        }
    }
}
