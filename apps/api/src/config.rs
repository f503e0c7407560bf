use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::parsing::PollPolicy;

const DEFAULT_LLAMAPARSE_BASE_URL: &str = "https://api.cloud.llamaindex.ai/api/v1/parsing";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or numeric values don't parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub llamaparse_api_key: String,
    pub llamaparse_base_url: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    /// Apps Script web app receiving intake records. Sink is disabled when unset.
    pub sheets_webapp_url: Option<String>,
    /// Endpoint queried by the shortlist flow.
    pub shortlist_url: Option<String>,
    pub poll_policy: PollPolicy,
    pub http_timeout: Duration,
    pub upload_dir: PathBuf,
    pub applications_file: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let sheets_webapp_url = optional_env("SHEETS_WEBAPP_URL");
        let shortlist_url = optional_env("SHEETS_DEPLOYMENT_ID")
            .map(|id| format!("https://script.google.com/macros/s/{id}/exec"))
            .or_else(|| sheets_webapp_url.clone());

        let poll_policy = PollPolicy {
            interval: Duration::from_secs(parse_env("PARSE_POLL_INTERVAL_SECS", 2)?),
            max_attempts: parse_env("PARSE_POLL_MAX_ATTEMPTS", 15)?,
            multiplier: parse_env("PARSE_POLL_BACKOFF_MULTIPLIER", 1.0)?,
            ..PollPolicy::default()
        };

        Ok(Config {
            llamaparse_api_key: require_env("LLAMAPARSE_API_KEY")?,
            llamaparse_base_url: optional_env("LLAMAPARSE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLAMAPARSE_BASE_URL.to_string()),
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_base_url: optional_env("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            gemini_model: optional_env("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            sheets_webapp_url,
            shortlist_url,
            poll_policy,
            http_timeout: Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 30)?),
            upload_dir: optional_env("UPLOAD_DIR")
                .unwrap_or_else(|| "uploads".to_string())
                .into(),
            applications_file: optional_env("APPLICATIONS_FILE")
                .unwrap_or_else(|| "applications.json".to_string())
                .into(),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid value, got '{raw}'")),
        None => Ok(default),
    }
}
