//! Environment-backed configuration.
//!
//! Everything the app needs is collected once at startup and handed to the
//! router as part of the shared state; nothing reads the environment after
//! boot.

use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,
    /// Access-token lifetime in seconds.
    pub jwt_access_expires_in: u64,
    /// Refresh-token lifetime in seconds.
    pub jwt_refresh_expires_in: u64,
    /// Directory uploaded images are written to.
    pub media_root: PathBuf,
    /// Base URL prefixed onto stored image paths when building public URLs.
    pub public_base_url: String,
    /// Allowed CORS origins; empty means a permissive layer.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().context("PORT must be a number")?,
            Err(_) => 5000,
        };
        let jwt_access_secret =
            std::env::var("JWT_ACCESS_SECRET").context("JWT_ACCESS_SECRET must be set")?;
        let jwt_refresh_secret =
            std::env::var("JWT_REFRESH_SECRET").context("JWT_REFRESH_SECRET must be set")?;
        let jwt_access_expires_in = env_seconds("JWT_ACCESS_EXPIRES_IN", 60 * 60)?;
        let jwt_refresh_expires_in = env_seconds("JWT_REFRESH_EXPIRES_IN", 7 * 24 * 60 * 60)?;
        let media_root = std::env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));
        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            port,
            jwt_access_secret,
            jwt_refresh_secret,
            jwt_access_expires_in,
            jwt_refresh_expires_in,
            media_root,
            public_base_url,
            cors_origins,
        })
    }
}

fn env_seconds(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a number of seconds")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_seconds_defaults_when_unset() {
        assert_eq!(env_seconds("EBAZAAR_TEST_UNSET", 3600).unwrap(), 3600);
    }
}
