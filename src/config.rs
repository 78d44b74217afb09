use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout: Duration,
    pub db_idle_timeout: Duration,
    pub request_timeout: Duration,
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://cinedex.db?mode=rwc".to_string());

        let db_max_connections: u32 =
            std::env::var("DB_MAX_CONNECTIONS").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        let db_min_connections: u32 =
            std::env::var("DB_MIN_CONNECTIONS").ok().and_then(|s| s.parse().ok()).unwrap_or(1);

        let db_acquire_timeout_secs: u64 =
            std::env::var("DB_ACQUIRE_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        let db_idle_timeout_secs: u64 =
            std::env::var("DB_IDLE_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(300);

        let request_timeout_ms: u64 =
            std::env::var("REQUEST_TIMEOUT_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(10_000);

        let api_key = std::env::var("API_KEY").ok().filter(|k| !k.trim().is_empty());

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            db_max_connections: db_max_connections.max(1),
            db_min_connections: db_min_connections.min(db_max_connections.max(1)),
            db_acquire_timeout: Duration::from_secs(db_acquire_timeout_secs),
            db_idle_timeout: Duration::from_secs(db_idle_timeout_secs),
            request_timeout: Duration::from_millis(request_timeout_ms.max(1)),
            api_key,
        })
    }

    #[cfg(test)]
    pub fn for_tests(api_key: Option<&str>) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            db_min_connections: 1,
            db_acquire_timeout: Duration::from_secs(5),
            db_idle_timeout: Duration::from_secs(600),
            request_timeout: Duration::from_secs(10),
            api_key: api_key.map(str::to_string),
        }
    }
}
