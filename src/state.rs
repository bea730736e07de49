use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::auth::{
    jwt::JwtKeys,
    password::PasswordHasher,
    repo::{MemoryUserStore, PgUserStore, UserStore},
    services::AuthService,
};
use crate::config::{AppConfig, StoreBackend};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub auth: AuthService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let users: Arc<dyn UserStore> = match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgUserStore::new(db))
            }
            StoreBackend::Memory => {
                info!("using in-memory credential store; users are lost on restart");
                Arc::new(MemoryUserStore::new())
            }
        };

        Self::from_parts(config, users)
    }

    /// The signing key is derived here, once, and never rebuilt for the life of the process.
    pub fn from_parts(config: Arc<AppConfig>, users: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let keys = JwtKeys::from_config(&config.jwt);
        let hasher = PasswordHasher::new(&config.hash)?;
        let auth = AuthService::new(users, hasher, keys.clone())?;
        Ok(Self { config, keys, auth })
    }

    pub fn fake() -> Self {
        let config = Arc::new(AppConfig::for_tests());
        let users = Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>;
        Self::from_parts(config, users).expect("test config is valid")
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
