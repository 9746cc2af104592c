//! Runtime configuration for the Places client.
//!
//! Values are layered: built-in defaults, then an optional `places.toml`,
//! then environment variables (a `.env` file is honoured through `dotenvy`),
//! then whatever the CLI passes explicitly.
//!
//! ```toml
//! api_key = "..."
//! query_text = "San Francisco Public Library"
//! request_timeout_secs = 20
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::places::request::DEFAULT_ENDPOINT;

/// Query used when the operator does not supply one.
pub const DEFAULT_QUERY_TEXT: &str = "San Francisco Public Library";

/// Name of the config file looked up in the platform config dir.
pub const CONFIG_FILE_NAME: &str = "places.toml";

#[derive(Clone)]
pub struct PlacesConfig {
    /// Static credential sent as `X-Goog-Api-Key` with every call.
    pub api_key: String,
    /// Full `places:searchText` URL.
    pub endpoint: String,
    /// Free-text query for searches started without an explicit term.
    pub query_text: String,
    /// Optional transfer timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            query_text: DEFAULT_QUERY_TEXT.to_string(),
            request_timeout: None,
        }
    }
}

impl std::fmt::Debug for PlacesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("query_text", &self.query_text)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// On-disk shape of `places.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    endpoint: Option<String>,
    query_text: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl PlacesConfig {
    /// Build the layered config.
    ///
    /// An explicit `path` must exist; the default location is skipped
    /// silently when absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        match path {
            Some(path) => cfg.apply_file(path)?,
            None => {
                if let Some(default) = default_config_path()
                    && default.is_file()
                {
                    cfg.apply_file(&default)?;
                }
            }
        }

        cfg.apply_env()?;
        Ok(cfg)
    }

    /// Overlay values from a TOML file.
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_toml(&content)?;
        debug!(path = %path.display(), "loaded places config file");
        Ok(())
    }

    /// Overlay values from TOML text.
    pub fn apply_toml(&mut self, content: &str) -> Result<(), ConfigError> {
        let file: FileConfig = toml::from_str(content)?;
        if let Some(key) = file.api_key {
            self.api_key = key;
        }
        if let Some(endpoint) = file.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(query) = file.query_text {
            self.query_text = query;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = timeout_from_secs(secs);
        }
        Ok(())
    }

    /// Overlay values from the process environment (and `.env`).
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| dotenvy::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("PLACES_API_KEY") {
            self.api_key = key;
        }
        if let Some(endpoint) = lookup("PLACES_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(query) = lookup("PLACES_QUERY") {
            self.query_text = query;
        }
        if let Some(val) = lookup("PLACES_TIMEOUT_SECS") {
            let secs = val
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "PLACES_TIMEOUT_SECS",
                    value: val.clone(),
                })?;
            self.request_timeout = timeout_from_secs(secs);
        }
        Ok(())
    }

    /// Fail early when the config cannot produce a valid request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "endpoint",
                value: self.endpoint.clone(),
            });
        }
        Ok(())
    }
}

/// `<config_dir>/places.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "places-anchors", "places-anchors")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

// 0 means "no timeout", matching the unbounded default.
fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Keep the last four characters of a credential for log lines.
pub fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("****{tail}")
    }
}
