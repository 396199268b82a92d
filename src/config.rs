// ⚙️ Configuration - environment-driven settings for CLI and server

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::llm::{GeminiClient, ModelClient, ModelTiers, DEFAULT_API_BASE};

pub const DEFAULT_DB_PATH: &str = "grocery_cache.db";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    /// None disables the model tiers; classification is heuristic-only
    pub api_key: Option<String>,
    pub models: ModelTiers,
    pub api_base: String,
    pub request_timeout: Duration,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            api_key: None,
            models: ModelTiers::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            debug: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Legacy `GEMENI_*` spellings are honoured
    /// when the current names are unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let defaults = Config::default();
        let default_models = defaults.models;

        let request_timeout = match get(&["GEMINI_TIMEOUT_SECS"]) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    log::warn!("ignoring invalid GEMINI_TIMEOUT_SECS '{}'", raw);
                    defaults.request_timeout
                }
            },
            None => defaults.request_timeout,
        };

        Config {
            db_path: get(&["GROCERY_DB_PATH"])
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            api_key: get(&["GEMINI_API_KEY", "GEMENI_FREE_API"]),
            models: ModelTiers {
                primary: get(&["GEMINI_PRIMARY_MODEL", "GEMENI_PRIMARY_MODEL"])
                    .unwrap_or(default_models.primary),
                alternative: get(&["GEMINI_ALTERNATIVE_MODEL", "GEMENI_ALTERNATIVE_MODEL"])
                    .unwrap_or(default_models.alternative),
                upgrade: get(&["GEMINI_UPGRADE_MODEL", "GEMENI_UPGRADE_MODEL"])
                    .unwrap_or(default_models.upgrade),
            },
            api_base: get(&["GEMINI_API_BASE"]).unwrap_or(defaults.api_base),
            request_timeout,
            debug: get(&["ORGANIZE_DEBUG"]).map_or(false, |v| !is_falsy(&v)),
        }
    }

    /// The model client, if a credential is configured
    pub fn model_client(&self) -> Option<Arc<dyn ModelClient>> {
        let api_key = self.api_key.as_ref()?;
        let client: Arc<dyn ModelClient> = Arc::new(GeminiClient::new(
            api_key.clone(),
            self.api_base.clone(),
            self.request_timeout,
        ));
        Some(client)
    }

    /// Default filter for env_logger when RUST_LOG is unset
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// Any non-empty value enables a switch except an explicit "off"
fn is_falsy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
