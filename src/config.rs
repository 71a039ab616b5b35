use std::net::SocketAddr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub reset_at: NaiveTime,
    pub api_tokens: Vec<(String, String)>,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match get("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("unknown STORE_BACKEND: {other}"),
        };

        let database_url = get("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set for the postgres backend");
        }

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3050".to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        let max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DB_MAX_CONNECTIONS must be a number")?,
            None => 5,
        };

        let reset_at = match get("RESET_AT") {
            Some(v) => NaiveTime::parse_from_str(v.trim(), "%H:%M")
                .context("RESET_AT must look like HH:MM")?,
            None => NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(|| anyhow!("invalid midnight"))?,
        };

        let api_tokens = parse_tokens(get("API_TOKENS").as_deref().unwrap_or_default())?;

        Ok(Self {
            backend,
            database_url,
            bind_addr,
            max_connections,
            reset_at,
            api_tokens,
        })
    }
}

/// Parses `token:user_id` pairs separated by commas.
fn parse_tokens(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<(String, String)> {
            let (token, user) = entry
                .split_once(':')
                .ok_or_else(|| anyhow!("API_TOKENS entry '{entry}' is not token:user_id"))?;
            let (token, user) = (token.trim(), user.trim());
            if token.is_empty() || user.is_empty() {
                bail!("API_TOKENS entry '{entry}' has an empty side");
            }
            Ok((token.to_string(), user.to_string()))
        })
        .collect()
}
