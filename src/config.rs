use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub password_salt: String,
    pub token_secret: String,
    pub token_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = std::env::var("DATA_DIR")
            .unwrap_or_else(|_| "./data".into())
            .into();
        let auth = AuthConfig {
            password_salt: std::env::var("PASSWORD_SALT").context("PASSWORD_SALT is required")?,
            token_secret: std::env::var("TOKEN_SECRET").context("TOKEN_SECRET is required")?,
            token_ttl_days: std::env::var("TOKEN_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        Ok(Self { data_dir, auth })
    }
}
