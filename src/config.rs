use secrecy::SecretString;
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::gemini::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT};

const DEFAULT_GOOGLE_SEARCH: bool = true;
const DEFAULT_LOG_LEVEL: &str = "error";
const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable required")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// CLI settings read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: SecretString,
    pub model: String,
    pub max_tokens: i32,
    pub temperature: f64,
    /// Per-attempt HTTP timeout.
    pub timeout: Duration,
    pub google_search: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    fn from_env_with(get_var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Blank counts as unset.
        let get = |key: &str| get_var(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        Ok(Self {
            api_key: SecretString::new(api_key),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: parse_or(
                "GEMINI_MAX_TOKENS",
                get("GEMINI_MAX_TOKENS"),
                DEFAULT_MAX_TOKENS,
                |v| v.parse::<i32>().map_err(|e| e.to_string()),
            )?,
            temperature: parse_or(
                "GEMINI_TEMPERATURE",
                get("GEMINI_TEMPERATURE"),
                DEFAULT_TEMPERATURE,
                |v| v.parse::<f64>().map_err(|e| e.to_string()),
            )?,
            timeout: parse_or(
                "GEMINI_TIMEOUT",
                get("GEMINI_TIMEOUT"),
                DEFAULT_TIMEOUT,
                parse_timeout,
            )?,
            google_search: parse_or(
                "GEMINI_GOOGLE_SEARCH",
                get("GEMINI_GOOGLE_SEARCH"),
                DEFAULT_GOOGLE_SEARCH,
                parse_bool,
            )?,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

fn parse_or<T>(
    key: &'static str,
    raw: Option<String>,
    default: T,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => parse(value.trim()).map_err(|reason| ConfigError::Invalid { key, reason }),
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    let timeout = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if timeout.is_zero() {
        return Err("timeout must be positive".to_string());
    }
    if timeout > MAX_TIMEOUT {
        return Err(format!(
            "timeout must be at most {}",
            humantime::format_duration(MAX_TIMEOUT)
        ));
    }
    Ok(timeout)
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got {:?}", other)),
    }
}
