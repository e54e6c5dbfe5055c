//! Synchronization settings: file, environment overrides and validation.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs_next::{config_dir, home_dir};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wfsync_api::ClientOptions;

use crate::SyncError;
use crate::backoff::RetryPolicy;
use crate::reconcile::ReconcilePolicy;

pub const CONFIG_PATH_ENV: &str = "WFSYNC_CONFIG_PATH";
pub const API_URL_ENV: &str = "WFSYNC_API_URL";
pub const DEFINITIONS_PATH_ENV: &str = "WFSYNC_DEFINITIONS_PATH";
pub const FORCE_REPLACE_ENV: &str = "WFSYNC_FORCE_REPLACE";
pub const FORCE_DIGEST_CHECK_ENV: &str = "WFSYNC_FORCE_DIGEST_CHECK";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the workflow service.
    pub url: Option<String>,
    /// Directory holding the workflow definition files.
    pub definitions_path: Option<PathBuf>,
    pub force_replace: bool,
    pub force_digest_check: bool,
    /// Workflows to synchronize, in order.
    pub workflows: Vec<String>,
    pub retry: RetryPolicy,
    pub request_timeout_secs: u64,
    /// Extra headers sent with every request.
    pub headers: IndexMap<String, String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            url: None,
            definitions_path: None,
            force_replace: false,
            force_digest_check: false,
            workflows: Vec::new(),
            retry: RetryPolicy::default(),
            request_timeout_secs: 30,
            headers: IndexMap::new(),
        }
    }
}

impl SyncConfig {
    /// Load settings and apply environment overrides.
    ///
    /// An explicit path must exist. Without one, `WFSYNC_CONFIG_PATH` or the
    /// per-user default is used, and a missing file yields defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, SyncError> {
        let mut config = match explicit_path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load_from_path(&path)?
                } else {
                    debug!(path = %path.display(), "no configuration file; using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a JSON or YAML settings file (chosen by extension).
    pub fn load_from_path(path: &Path) -> Result<Self, SyncError> {
        let content = fs::read_to_string(path)
            .map_err(|err| SyncError::config(format!("failed to read {}: {err}", path.display())))?;
        let is_yaml = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| matches!(extension, "yaml" | "yml"));
        let config = if is_yaml {
            serde_yaml::from_str(&content).map_err(|err| SyncError::config(format!("invalid {}: {err}", path.display())))?
        } else {
            serde_json::from_str(&content).map_err(|err| SyncError::config(format!("invalid {}: {err}", path.display())))?
        };
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_blank_env(API_URL_ENV) {
            self.url = Some(url);
        }
        if let Some(path) = non_blank_env(DEFINITIONS_PATH_ENV) {
            self.definitions_path = Some(expand_tilde(&path));
        }
        if let Some(flag) = flag_env(FORCE_REPLACE_ENV) {
            self.force_replace = flag;
        }
        if let Some(flag) = flag_env(FORCE_DIGEST_CHECK_ENV) {
            self.force_digest_check = flag;
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.url.as_deref().is_none_or(|url| url.trim().is_empty()) {
            return Err(SyncError::config("a workflow service url is required"));
        }
        if self.definitions_path.is_none() {
            return Err(SyncError::config("a workflow definitions path is required"));
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return Err(SyncError::config(format!(
                "retry.min_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.min_delay_ms, self.retry.max_delay_ms
            )));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(SyncError::config("retry.max_attempts must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(SyncError::config("request_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            force_replace: self.force_replace,
            force_digest_check: self.force_digest_check,
        }
    }

    pub fn definitions_root(&self) -> Result<&Path, SyncError> {
        self.definitions_path
            .as_deref()
            .ok_or_else(|| SyncError::config("a workflow definitions path is required"))
    }

    /// HTTP client settings derived from this configuration.
    pub fn client_options(&self) -> Result<ClientOptions, SyncError> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| SyncError::config("a workflow service url is required"))?;
        let mut options = ClientOptions::new(url).with_timeout(Duration::from_secs(self.request_timeout_secs));
        for (name, value) in &self.headers {
            options = options.with_header(name, value);
        }
        Ok(options)
    }
}

/// Path of the configuration file used when none is given explicitly.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = non_blank_env(CONFIG_PATH_ENV) {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wfsync")
        .join("config.json")
}

fn non_blank_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn flag_env(key: &str) -> Option<bool> {
    let value = non_blank_env(key)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        other => {
            warn!(variable = key, value = other, "ignoring unrecognized boolean value");
            None
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = trimmed.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(trimmed)
}
