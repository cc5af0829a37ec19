use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PHAB_URI: &str = "https://phab.example.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Connection defaults read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InamConfig {
    /// Base URI of the Phabricator install, e.g. `https://phab.example.com`.
    pub phab_uri: Option<String>,
    /// Conduit API token (`api-...`).
    pub api_token: Option<String>,
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_inam_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("INAM_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".inam"))
}

pub fn global_config_path() -> Option<PathBuf> {
    resolve_inam_home_dir().map(|home| home.join("config.toml"))
}

pub fn parse_config(text: &str) -> Result<InamConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Load an explicitly requested config file. Unlike the global file, errors are reported.
pub fn load_config(path: &Path) -> Result<InamConfig, ConfigError> {
    let text = fs::read_to_string(path)?;
    parse_config(&text)
}

pub fn load_global_config() -> Option<InamConfig> {
    let path = global_config_path()?;
    if !path.is_file() {
        return None;
    }
    let text = fs::read_to_string(path).ok()?;
    parse_config(&text).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub phab_uri: String,
    /// May be empty; the client rejects an empty token before connecting.
    pub api_token: String,
}

impl ConnectionSettings {
    /// Flag/environment values win over the config file; the URI falls back to
    /// [`DEFAULT_PHAB_URI`].
    pub fn resolve(
        phab_uri: Option<String>,
        api_token: Option<String>,
        config: Option<&InamConfig>,
    ) -> Self {
        let phab_uri = non_blank(phab_uri)
            .or_else(|| non_blank(config.and_then(|c| c.phab_uri.clone())))
            .unwrap_or_else(|| DEFAULT_PHAB_URI.to_string());
        let api_token = non_blank(api_token)
            .or_else(|| non_blank(config.and_then(|c| c.api_token.clone())))
            .unwrap_or_default();
        Self {
            phab_uri,
            api_token,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
