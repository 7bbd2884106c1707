use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

const DEV_SECRET: &str = "dev-secret-change-me";

/// Server settings, read from `NINEBYFOUR_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub token_ttl: chrono::Duration,
    pub db_pool_size: u32,
    /// Overrides the stored waitlist setting at startup when set.
    pub waitlist_enabled: Option<bool>,
    /// Usernames promoted to admin at startup.
    pub admin_users: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("NINEBYFOUR_JWT_SECRET").unwrap_or_else(|| {
            warn!("NINEBYFOUR_JWT_SECRET not set, using the development secret");
            DEV_SECRET.into()
        });

        let port = get("NINEBYFOUR_PORT")
            .map(|v| v.parse::<u16>())
            .transpose()
            .context("NINEBYFOUR_PORT must be a port number")?
            .unwrap_or(3000);

        let ttl_secs = get("NINEBYFOUR_TOKEN_TTL_SECS")
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("NINEBYFOUR_TOKEN_TTL_SECS must be a whole number of seconds")?
            .unwrap_or(3600);
        if ttl_secs <= 0 {
            anyhow::bail!("NINEBYFOUR_TOKEN_TTL_SECS must be positive, got {ttl_secs}");
        }

        let db_pool_size = get("NINEBYFOUR_DB_POOL_SIZE")
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("NINEBYFOUR_DB_POOL_SIZE must be a positive integer")?
            .unwrap_or(ninebyfour_db::DEFAULT_POOL_SIZE);

        let waitlist_enabled = get("NINEBYFOUR_WAITLIST_ENABLED")
            .map(|v| parse_bool(&v))
            .transpose()
            .context("NINEBYFOUR_WAITLIST_ENABLED must be true or false")?;

        let admin_users = get("NINEBYFOUR_ADMIN_USERS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            jwt_secret,
            db_path: get("NINEBYFOUR_DB_PATH")
                .unwrap_or_else(|| "ninebyfour.db".into())
                .into(),
            host: get("NINEBYFOUR_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            token_ttl: chrono::Duration::seconds(ttl_secs),
            db_pool_size,
            waitlist_enabled,
            admin_users,
        })
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("not a boolean: '{other}'"),
    }
}
