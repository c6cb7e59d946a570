use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub api_prefix: String,
    /// City used by `/calculate` when the request names none.
    pub default_city: Option<String>,
    pub max_upload_bytes: usize,
    pub log_dir: String,

    // Rate limiting
    pub rate_upload_per_min: u32,
    pub rate_calculate_per_min: u32,
    pub rate_read_per_min: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            server_addr: non_empty("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            database_url: non_empty("DATABASE_URL"),
            api_prefix: non_empty("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            default_city: non_empty("DEFAULT_CITY"),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?, // 10 MiB
            log_dir: non_empty("LOG_DIR").unwrap_or_else(|| "logs".to_string()),

            rate_upload_per_min: parse_or(&lookup, "RATE_UPLOAD_PER_MIN", 30)?,
            rate_calculate_per_min: parse_or(&lookup, "RATE_CALCULATE_PER_MIN", 30)?,
            rate_read_per_min: parse_or(&lookup, "RATE_READ_PER_MIN", 600)?,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}
