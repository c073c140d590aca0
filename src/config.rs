use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_DESCRIBE_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_EDIT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub addr: SocketAddr,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub models: ModelIds,
    /// Transport-level timeout. `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
}

/// Which backend model serves which request kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelIds {
    pub describe: String,
    pub edit: String,
}

impl Default for ModelIds {
    fn default() -> Self {
        Self {
            describe: DEFAULT_DESCRIBE_MODEL.to_string(),
            edit: DEFAULT_EDIT_MODEL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_base: DEFAULT_API_BASE.to_string(),
            models: ModelIds::default(),
            timeout: None,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_base = var("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let timeout = match var("GEMINI_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                ConfigError::Invalid {
                    name: "GEMINI_TIMEOUT_SECS",
                    value: raw.clone(),
                }
            })?)),
            None => None,
        };

        let addr = {
            let raw = var("BOOTH_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
            raw.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
                name: "BOOTH_ADDR",
                value: raw.clone(),
            })?
        };

        let max_upload_bytes = match var("BOOTH_MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse::<usize>().map_err(|_| ConfigError::Invalid {
                name: "BOOTH_MAX_UPLOAD_BYTES",
                value: raw.clone(),
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            gemini: GeminiConfig {
                api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")),
                api_base,
                models: ModelIds {
                    describe: var("GEMINI_DESCRIBE_MODEL")
                        .unwrap_or_else(|| DEFAULT_DESCRIBE_MODEL.to_string()),
                    edit: var("GEMINI_EDIT_MODEL")
                        .unwrap_or_else(|| DEFAULT_EDIT_MODEL.to_string()),
                },
                timeout,
            },
            addr,
            max_upload_bytes,
        })
    }
}
