//! Configuration for bpm
//!
//! Settings are layered, lowest to highest:
//! - built-in defaults
//! - the user file (`$BPM_CONFIG`, else `<config dir>/bpm/config.yaml`)
//! - environment (`BPM_REGISTRY`, `BPM_JOBS`, `BPM_SCRIPT_ENGINE`)
//! - command line flags

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BpmError, Result};

pub const DEFAULT_REGISTRY: &str = "https://registry.bpmjs.org";
const DEFAULT_JOBS: usize = 4;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SCRIPT_ENGINE: &str = "node";

/// Resolved bpm settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BpmConfig {
    /// `http(s)://` URL or a directory registry path
    pub registry: String,
    /// Fetch worker-pool size
    pub jobs: usize,
    pub network_timeout_secs: u64,
    pub plugin_timeout_secs: u64,
    /// Interpreter used to run plugin scripts
    pub script_engine: String,
}

impl Default for BpmConfig {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            jobs: DEFAULT_JOBS,
            network_timeout_secs: DEFAULT_TIMEOUT_SECS,
            plugin_timeout_secs: DEFAULT_TIMEOUT_SECS,
            script_engine: DEFAULT_SCRIPT_ENGINE.to_string(),
        }
    }
}

/// Values given on the command line; they win over every other layer
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub registry: Option<String>,
    pub jobs: Option<usize>,
}

impl BpmConfig {
    /// Load configuration from the process environment and the user file
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok(), overrides)
    }

    /// Load configuration reading environment variables through `env`
    pub fn load_with<F>(env: F, overrides: &ConfigOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match config_file_path(&env) {
            Some(path) if path.is_file() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        if let Some(registry) = env("BPM_REGISTRY").filter(|v| !v.is_empty()) {
            config.registry = registry;
        }
        if let Some(jobs) = env("BPM_JOBS").filter(|v| !v.is_empty()) {
            config.jobs = jobs.trim().parse().map_err(|_| BpmError::ConfigInvalid {
                message: format!("BPM_JOBS must be a positive integer, got '{jobs}'"),
            })?;
        }
        if let Some(engine) = env("BPM_SCRIPT_ENGINE").filter(|v| !v.is_empty()) {
            config.script_engine = engine;
        }

        if let Some(registry) = &overrides.registry {
            config.registry.clone_from(registry);
        }
        if let Some(jobs) = overrides.jobs {
            config.jobs = jobs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| BpmError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&content, &path.display().to_string())
    }

    pub fn from_yaml(content: &str, origin: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| BpmError::ConfigParseFailed {
            path: origin.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(BpmError::ConfigInvalid {
                message: "jobs must be at least 1".to_string(),
            });
        }
        if self.registry.trim().is_empty() {
            return Err(BpmError::ConfigInvalid {
                message: "registry must not be empty".to_string(),
            });
        }
        if self.script_engine.trim().is_empty() {
            return Err(BpmError::ConfigInvalid {
                message: "script_engine must not be empty".to_string(),
            });
        }
        if self.network_timeout_secs == 0 || self.plugin_timeout_secs == 0 {
            return Err(BpmError::ConfigInvalid {
                message: "timeouts must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn plugin_timeout(&self) -> Duration {
        Duration::from_secs(self.plugin_timeout_secs)
    }

    /// Whether the registry location is an HTTP(S) URL
    pub fn registry_is_remote(&self) -> bool {
        self.registry.starts_with("http://") || self.registry.starts_with("https://")
    }
}

fn config_file_path<F>(env: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = env("BPM_CONFIG").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("bpm").join("config.yaml"))
}
