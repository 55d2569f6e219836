use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use feed_client::{ClientConfig, DEFAULT_BASE_URL};

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub page_size: u32,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub search_debounce_ms: u64,
    pub history_file: PathBuf,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("FEED_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let page_size = u32::try_from(parse_u64_env("FEED_PAGE_SIZE", 10)?)
            .context("FEED_PAGE_SIZE is too large")?;
        let connect_timeout_secs = parse_u64_env("FEED_CONNECT_TIMEOUT_SECS", 5)?;
        let request_timeout_secs = parse_u64_env("FEED_REQUEST_TIMEOUT_SECS", 15)?;
        let search_debounce_ms = parse_u64_env("FEED_SEARCH_DEBOUNCE_MS", 300)?;
        let history_file = std::env::var("FEED_HISTORY_FILE")
            .unwrap_or_else(|_| ".feed_history.json".to_string())
            .into();
        let log_level = resolve_log_level(
            std::env::var("RUST_LOG").ok(),
            std::env::var("LOG_LEVEL").ok(),
        );

        Ok(Self {
            base_url,
            page_size,
            connect_timeout_secs,
            request_timeout_secs,
            search_debounce_ms,
            history_file,
            log_level,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// `RUST_LOG` важнее `LOG_LEVEL`; без обоих используется `warn`.
fn resolve_log_level(rust_log: Option<String>, log_level: Option<String>) -> String {
    rust_log
        .or(log_level)
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| "warn".to_string())
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    parse_positive(key, &raw)
}

fn parse_positive(key: &str, raw: &str) -> Result<u64> {
    let value = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?;

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}
