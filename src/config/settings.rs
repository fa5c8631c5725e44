use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use super::AppConfig;

const CONFIG_PATH_ENV: &str = "CODE_CHAT_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Returns the configuration file path: explicit argument, then the
/// `CODE_CHAT_CONFIG` environment variable, then `./config.json`.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Loads the application configuration.
///
/// A missing config file yields the defaults. A corrupted file logs a
/// warning and falls back to the defaults instead of refusing to start.
/// Environment variables override the file for deployment secrets.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let config_path = config_file_path(explicit);

    let mut config = if config_path.exists() {
        let config_content = fs::read_to_string(&config_path)?;
        match serde_json::from_str::<AppConfig>(&config_content) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", config_path);
                config
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config file at {:?}: {}. Falling back to default config.",
                    config_path,
                    e
                );
                AppConfig::default()
            }
        }
    } else {
        tracing::info!("Config file {:?} not found, using defaults", config_path);
        AppConfig::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
        if !key.trim().is_empty() {
            config.api_key = Some(key);
        }
    }
    if let Ok(url) = std::env::var("GOOGLE_API_URL") {
        if !url.trim().is_empty() {
            config.api_url = url;
        }
    }
    if let Ok(port) = std::env::var("PORT") {
        if let Ok(port) = port.parse::<u16>() {
            config.bind_addr = format!("127.0.0.1:{port}");
        }
    }
}

/// Saves the provided configuration, creating parent directories as needed.
pub fn save_config(config: &AppConfig, explicit: Option<&Path>) -> Result<()> {
    let config_path = config_file_path(explicit);
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_json)?;
    tracing::info!("Saved config to {:?}", config_path);
    Ok(())
}
