use std::str::FromStr;

use anyhow::Context;
use dotenv::dotenv;

const DEFAULT_APP_NAME: &str = "todo-items-api";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: Option<String>,
    pub database_pool_size: u32,
    pub host: String,
    pub port: u16,
    pub app_name: String,
    pub jaeger_endpoint: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            database_pool_size: 10,
            host: "127.0.0.1".to_string(),
            port: 8080,
            app_name: DEFAULT_APP_NAME.to_string(),
            jaeger_endpoint: "localhost:6831".to_string(),
        }
    }
}

impl Settings {
    /// Reads `.env` first, then the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Settings::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_pool_size: parse_or(&lookup, "DATABASE_POOL_SIZE", defaults.database_pool_size)?,
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            app_name: lookup("APP_NAME")
                .or_else(|| lookup("CARGO_BIN_NAME"))
                .unwrap_or(defaults.app_name),
            jaeger_endpoint: lookup("JAEGER_ENDPOINT").unwrap_or(defaults.jaeger_endpoint),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
        None => Ok(default),
    }
}
