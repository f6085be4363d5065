use std::time::Duration;

use actix_web::cookie::Key;

use crate::errors::AppError;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 300;

pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub session_key: Key,
    pub db_max_connections: u32,
    pub feature_probe_interval: Duration,
}

impl AppConfig {
    /// Read configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, AppError> {
        if dotenvy::dotenv().is_ok() {
            log::info!("Loaded environment from .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Config("DATABASE_URL is not set".to_string()))?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let session_key = match lookup("SESSION_KEY") {
            Some(val) if val.len() >= 64 => {
                log::info!("Using SESSION_KEY from environment");
                Key::from(val.as_bytes())
            }
            Some(val) => {
                log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
                Key::generate()
            }
            None => {
                log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
                Key::generate()
            }
        };

        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let interval_secs = parse_or(&lookup, "FEATURE_PROBE_INTERVAL_SECS", DEFAULT_PROBE_INTERVAL_SECS)?;

        Ok(AppConfig {
            database_url,
            bind_addr,
            session_key,
            db_max_connections,
            feature_probe_interval: Duration::from_secs(interval_secs.max(1)),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{name} must be a number, got {raw:?}"))),
    }
}
