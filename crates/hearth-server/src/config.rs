use anyhow::{Context, Result};

/// Server configuration, read once at startup from `HEARTH_*` env vars
/// (a `.env` file is honored when present). Defaults suit local
/// development only; change the secrets before exposing the server.
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub admin_name: String,
    pub admin_password: String,
    pub max_users: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env_or("HEARTH_HOST", "0.0.0.0"),
            port: env_or("HEARTH_PORT", "3000")
                .parse()
                .context("HEARTH_PORT must be a port number")?,
            db_path: env_or("HEARTH_DB_PATH", "hearth.db"),
            jwt_secret: env_or("HEARTH_JWT_SECRET", "dev-secret-change-me"),
            admin_name: env_or("HEARTH_ADMIN_NAME", "admin"),
            admin_password: env_or("HEARTH_ADMIN_PASSWORD", "dev-password-change-me"),
            max_users: env_or("HEARTH_MAX_USERS", "5")
                .parse()
                .context("HEARTH_MAX_USERS must be a number")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}
