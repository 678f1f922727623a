use std::env;
use std::str::FromStr;

use crate::error::AppError;

/// Runtime configuration, read from the environment (and `.env` via `dotenv` in `main`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub jwt_expiration_hours: i64,
    pub jwt_refresh_expiration_days: i64,
    /// When unset the cache (and the priority queue on top of it) lives in process memory.
    pub redis_url: Option<String>,
    /// When unset, search falls back to `ILIKE` queries against Postgres.
    pub meili_url: Option<String>,
    pub meili_key: Option<String>,
    pub frontend_url: String,
    pub cache_ttl_seconds: u64,
    pub rate_limit_max_requests: u64,
    pub rate_limit_window_seconds: u64,
    pub deadline_scan_interval_seconds: u64,
    /// Proxy addresses whose `Forwarded` / `X-Forwarded-For` headers are believed when
    /// identifying a client for rate limiting. Everyone else is keyed on the socket address.
    pub trusted_proxies: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let jwt_secret = required("JWT_SECRET")?;
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_port: parsed("SERVER_PORT", 5000)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_refresh_secret: optional("JWT_REFRESH_SECRET").unwrap_or_else(|| jwt_secret.clone()),
            jwt_secret,
            jwt_expiration_hours: parsed("JWT_EXPIRATION_HOURS", 24)?,
            jwt_refresh_expiration_days: parsed("JWT_REFRESH_EXPIRATION_DAYS", 7)?,
            redis_url: optional("REDIS_URL"),
            meili_url: optional("MEILI_URL"),
            meili_key: optional("MEILI_KEY"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            cache_ttl_seconds: positive("CACHE_TTL_SECONDS", 300)?,
            rate_limit_max_requests: parsed("RATE_LIMIT_MAX_REQUESTS", 100)?,
            rate_limit_window_seconds: positive("RATE_LIMIT_WINDOW_SECONDS", 60)?,
            deadline_scan_interval_seconds: positive("DEADLINE_SCAN_INTERVAL_SECONDS", 3600)?,
            trusted_proxies: optional("TRUSTED_PROXIES")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|ip| !ip.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn required(key: &str) -> Result<String, AppError> {
    optional(key).ok_or_else(|| AppError::InternalServerError(format!("{} must be set", key)))
}

/// Treats empty values like missing ones, so `REDIS_URL=` in a `.env` disables Redis.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::InternalServerError(format!("{} must be a number", key))),
        None => Ok(default),
    }
}

/// Durations feed `tokio::time::interval` and cache expiries, neither of which accepts zero.
fn positive(key: &str, default: u64) -> Result<u64, AppError> {
    match parsed(key, default)? {
        0 => Err(AppError::InternalServerError(format!(
            "{} must be greater than zero",
            key
        ))),
        value => Ok(value),
    }
}
