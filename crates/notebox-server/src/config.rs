use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("NOTEBOX_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("NOTEBOX_JWT_SECRET is unset or still a placeholder");
        }

        let host = lookup("NOTEBOX_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("NOTEBOX_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("NOTEBOX_PORT is not a valid port")?;
        let db_path: PathBuf = lookup("NOTEBOX_DB_PATH")
            .unwrap_or_else(|| "notebox.db".into())
            .into();
        let token_ttl_hours: i64 = lookup("NOTEBOX_TOKEN_TTL_HOURS")
            .unwrap_or_else(|| "720".into()) // 30 days
            .parse()
            .context("NOTEBOX_TOKEN_TTL_HOURS is not a number")?;

        if token_ttl_hours <= 0 {
            bail!("NOTEBOX_TOKEN_TTL_HOURS must be positive");
        }

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            token_ttl_hours,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}
