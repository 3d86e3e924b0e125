use std::sync::Arc;

use crate::{
    auth::{
        password::Argon2Hasher, repo::PgUserRepository, services::AccountService,
        token::TokenCodec,
    },
    config::AppConfig,
    db,
};

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
}

impl AppState {
    pub fn new(accounts: Arc<AccountService>) -> Self {
        Self { accounts }
    }

    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config.database_url).await?;
        let hasher = Argon2Hasher::from_entropy(&config.hash)?;
        let accounts = AccountService::new(
            Arc::new(PgUserRepository::new(pool)),
            Arc::new(hasher),
            TokenCodec::from(&config.jwt),
        );
        Ok(Self::new(Arc::new(accounts)))
    }
}
