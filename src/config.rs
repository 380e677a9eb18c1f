use std::env;
use std::net::SocketAddr;

use chrono::Duration;

use crate::error::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite://taskflow.db";
const DEFAULT_SECRET_KEY: &str = "secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub bind_addr: SocketAddr,
    pub token_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let secret_key = match lookup("SECRET_KEY") {
            Some(key) if !key.is_empty() => key,
            _ => {
                tracing::warn!("SECRET_KEY not set, using the insecure default");
                DEFAULT_SECRET_KEY.to_string()
            }
        };

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::ConfigError(format!("BIND_ADDR: {e}")))?;

        let ttl_minutes = match lookup("TOKEN_TTL_MINUTES") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .ok_or_else(|| {
                    AppError::ConfigError(format!(
                        "TOKEN_TTL_MINUTES must be a positive integer, got {raw:?}"
                    ))
                })?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };

        Ok(Config {
            database_url,
            secret_key,
            bind_addr,
            token_ttl: Duration::minutes(ttl_minutes),
        })
    }
}
