use std::sync::Arc;

use anyhow::Context;

use crate::auth::services::AuthService;
use crate::config::AppConfig;
use crate::store::FileStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<FileStore>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(FileStore::new(&config.data_dir));
        store.initialize().await.context("initialize record store")?;
        Ok(Self::from_parts(config, store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<FileStore>) -> Self {
        let auth = Arc::new(AuthService::new(Arc::clone(&store), &config.auth));
        Self {
            config,
            store,
            auth,
        }
    }

    #[cfg(test)]
    pub fn for_tests(data_dir: &std::path::Path) -> Self {
        use crate::config::AuthConfig;

        let config = Arc::new(AppConfig {
            data_dir: data_dir.into(),
            auth: AuthConfig {
                password_salt: "test-salt".into(),
                token_secret: "test-secret".into(),
                token_ttl_days: 7,
            },
        });
        Self::from_parts(config, Arc::new(FileStore::new(data_dir)))
    }
}
