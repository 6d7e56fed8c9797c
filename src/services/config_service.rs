use std::env;
use std::fs;

use serde::{Deserialize, Serialize};

use super::storage::get_app_data_dir;
use crate::error::ChatError;

/// Model label selected when neither config nor caller picks one.
pub const DEFAULT_MODEL: &str = "Gemini 2.5 Flash";

/// Role label selected when neither config nor caller picks one.
pub const DEFAULT_ROLE: &str = "Fullstack";

const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

fn get_config_path() -> Result<std::path::PathBuf, ChatError> {
    Ok(get_app_data_dir()?.join("config.json"))
}

pub fn load_config() -> Result<Config, ChatError> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&config_path)
        .map_err(|e| ChatError::Storage(format!("Failed to read config: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| ChatError::Storage(format!("Failed to parse config: {}", e)))
}

pub fn save_config(config: &Config) -> Result<(), ChatError> {
    let config_path = get_config_path()?;
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ChatError::Storage(format!("Failed to serialize config: {}", e)))?;
    fs::write(&config_path, content)
        .map_err(|e| ChatError::Storage(format!("Failed to write config: {}", e)))
}

/// API key resolution order: config file, then the `GEMINI_API_KEY`
/// environment variable. `None` selects the gateway's mock mode.
pub fn effective_api_key(config: &Config) -> Option<String> {
    config
        .api_key
        .clone()
        .filter(|key| !key.is_empty())
        .or_else(|| env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_key_wins_over_environment() {
        let config = Config {
            api_key: Some("from-config".to_string()),
            ..Config::default()
        };
        assert_eq!(effective_api_key(&config).as_deref(), Some("from-config"));
    }

    #[test]
    fn empty_config_key_is_treated_as_absent() {
        let config = Config {
            api_key: Some(String::new()),
            ..Config::default()
        };
        // Falls through to the environment, which may or may not be set;
        // the config value itself must not satisfy the lookup.
        let resolved = effective_api_key(&config);
        assert_ne!(resolved.as_deref(), Some(""));
    }

    #[test]
    fn unknown_fields_do_not_break_parsing() {
        let config: Config =
            serde_json::from_str(r#"{"api_key":"k","theme":"dark"}"#).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert!(config.model.is_none());
    }
}
