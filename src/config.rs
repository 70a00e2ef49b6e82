// src/config.rs

//! User settings, read from `settings.json` in the platform config directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::invoker::ProbeInvoker;
use crate::core::models::ProbeKind;
use crate::core::probes::ProbeSettings;
use crate::logging::project_directory;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed settings file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Upper bound the orchestrator puts on any single probe invocation.
    pub probe_timeout_secs: u64,
    /// Timeout the HTTP-based probes apply to their own requests.
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Probe kinds to run, in report order.
    pub probes: Vec<ProbeKind>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 30,
            request_timeout_secs: 10,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            probes: ProbeKind::DEFAULTS.to_vec(),
        }
    }
}

impl Settings {
    /// Loads settings from the default location.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&settings_file())
    }

    /// Loads settings from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults.");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        info!(path = %path.display(), "Loaded settings.");
        settings.validated()
    }

    /// Rejects zero timeouts and an empty probe list, and drops repeated kinds.
    pub fn validated(mut self) -> ConfigResult<Self> {
        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::Invalid("probe_timeout_secs must be greater than zero".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be greater than zero".into()));
        }
        if self.probes.is_empty() {
            return Err(ConfigError::Invalid("at least one probe must be enabled".into()));
        }
        let mut seen = Vec::with_capacity(self.probes.len());
        self.probes.retain(|kind| {
            let first = !seen.contains(kind);
            seen.push(*kind);
            first
        });
        Ok(self)
    }

    pub fn invoker(&self) -> ProbeInvoker {
        ProbeInvoker::new(Duration::from_secs(self.probe_timeout_secs))
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            user_agent: self.user_agent.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

pub fn config_dir() -> PathBuf {
    match project_directory() {
        Some(proj_dirs) => proj_dirs.config_dir().to_path_buf(),
        None => PathBuf::from(".").join(".config"),
    }
}

pub fn settings_file() -> PathBuf {
    config_dir().join("settings.json")
}
