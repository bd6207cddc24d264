use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

/// Application configuration loaded once from environment variables.
/// Fails at startup if a numeric or boolean variable cannot be parsed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Empty when `OPENAI_API_KEY` is unset; the provider will then reject every call.
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub provider_timeout: Duration,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub rate_limit_per_minute: u32,
    /// Key rate limiting on `X-Forwarded-For` instead of the peer address.
    /// Only enable behind a reverse proxy that overwrites the header.
    pub trust_forwarded_for: bool,
    pub rust_log: String,
}

impl Config {
    pub fn has_api_key(&self) -> bool {
        !self.openai_api_key.trim().is_empty()
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: env_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            model: env_or("OPENAI_MODEL", DEFAULT_MODEL),
            provider_timeout: Duration::from_secs(
                env_or("PROVIDER_TIMEOUT_SECS", "30")
                    .parse::<u64>()
                    .context("PROVIDER_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            host: env_or("HOST", "127.0.0.1"),
            port: env_or("PORT", "8000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            allowed_origins: parse_origins(&env_or("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)),
            rate_limit_per_minute: env_or("RATE_LIMIT_PER_MINUTE", "10")
                .parse::<u32>()
                .context("RATE_LIMIT_PER_MINUTE must be a positive integer")?,
            trust_forwarded_for: parse_bool(&env_or("TRUST_FORWARDED_FOR", "false"))
                .context("TRUST_FORWARDED_FOR must be true or false")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Splits a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("unrecognised boolean '{other}'"),
    }
}

#[cfg(test)]
impl Config {
    /// Config with local defaults, no environment access.
    pub fn for_tests() -> Self {
        Config {
            openai_api_key: "sk-test".to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider_timeout: Duration::from_secs(30),
            host: "127.0.0.1".to_string(),
            port: 0,
            allowed_origins: parse_origins(DEFAULT_ALLOWED_ORIGINS),
            rate_limit_per_minute: 10,
            trust_forwarded_for: false,
            rust_log: "info".to_string(),
        }
    }
}
