use anyhow::{Context, Result};
use crate::stream::DEFAULT_CHUNK_SIZE;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5988";

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub access_token: Option<String>,
    pub fallback_timeout: Duration, // whole-request bound for the one-shot endpoints
    pub connect_timeout: Duration,
    pub reauth_delay: Duration, // how long an expiry message stays up before re-auth
    pub stream_chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            fallback_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            reauth_delay: Duration::from_millis(2000),
            stream_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<Config> {
    // Load `.env` file if present
    dotenv::dotenv().ok();

    let defaults = Config::default();
    let base_url = std::env::var("API_BASE_URL").unwrap_or(defaults.base_url);
    let access_token = std::env::var("SPOTIFY_ACCESS_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty());

    Ok(Config {
        base_url: base_url.trim_end_matches('/').to_string(),
        access_token,
        fallback_timeout: read_number("FALLBACK_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.fallback_timeout),
        connect_timeout: read_number("CONNECT_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.connect_timeout),
        reauth_delay: read_number("REAUTH_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.reauth_delay),
        stream_chunk_size: read_number("STREAM_CHUNK_SIZE")?
            .map(|size| size.max(1) as usize)
            .unwrap_or(defaults.stream_chunk_size),
    })
}

fn read_number(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")),
        Err(_) => Ok(None),
    }
}
