use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/calesync";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub server_selection_timeout: Duration,
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub body_limit: usize,
    pub database: DatabaseConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig {
            uri: lookup("MONGODB_URI").unwrap_or_else(|| DEFAULT_MONGODB_URI.into()),
            server_selection_timeout: Duration::from_millis(parse_or(
                &lookup,
                "MONGODB_SERVER_SELECTION_TIMEOUT_MS",
                30_000,
            )?),
            shutdown_timeout: Duration::from_millis(parse_or(
                &lookup,
                "SHUTDOWN_TIMEOUT_MS",
                10_000,
            )?),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "PORT", 3001)?,
            body_limit: parse_or(&lookup, "BODY_LIMIT_BYTES", 100 * 1024)?,
            database,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        _ => Ok(default),
    }
}
