//! Process configuration read from the environment (and `.env`, when present).

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    /// Deadline applied to every store operation.
    pub store_timeout: Duration,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or("APP_PORT", get("APP_PORT"), DEFAULT_PORT)?;
        let store_timeout_ms = parse_or(
            "STORE_TIMEOUT_MS",
            get("STORE_TIMEOUT_MS"),
            DEFAULT_STORE_TIMEOUT_MS,
        )?;

        let url = match get("DATABASE_URL") {
            Some(url) => Some(url),
            None => match get("DB_HOST") {
                Some(db_host) => Some(postgres_url(&db_host, &get)?),
                None => None,
            },
        };

        let database = match url {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(
                    "DB_MAX_CONNECTIONS",
                    get("DB_MAX_CONNECTIONS"),
                    DEFAULT_MAX_CONNECTIONS,
                )?,
                connect_timeout: Duration::from_millis(parse_or(
                    "DB_CONNECT_TIMEOUT_MS",
                    get("DB_CONNECT_TIMEOUT_MS"),
                    DEFAULT_CONNECT_TIMEOUT_MS,
                )?),
            }),
            None => None,
        };

        Ok(Self {
            host,
            port,
            database,
            store_timeout: Duration::from_millis(store_timeout_ms),
        })
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn postgres_url<G>(host: &str, get: &G) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let port = parse_or("DB_PORT", get("DB_PORT"), 5432u16)?;
    let user = get("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
    let name = get("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?;
    let sslmode = get("DB_SSLMODE").unwrap_or_else(|| "disable".to_string());

    let credentials = match get("DB_PASSWORD") {
        Some(password) => format!("{user}:{password}"),
        None => user,
    };
    Ok(format!(
        "postgres://{credentials}@{host}:{port}/{name}?sslmode={sslmode}"
    ))
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
