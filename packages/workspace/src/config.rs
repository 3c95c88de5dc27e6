use funnel_editor::History;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "funnel.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Funnel workspace configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Directory holding `<key>.json` documents
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,

    /// Skip autosave ticks when nothing changed since the last save
    #[serde(default = "default_true")]
    pub autosave_dirty_only: bool,

    /// Undo levels to keep, at least 1 (unlimited when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,

    /// Step names for a freshly created document
    #[serde(default = "default_steps")]
    pub default_steps: Vec<String>,
}

fn default_data_dir() -> String {
    ".funnel".to_string()
}

fn default_autosave_interval_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_steps() -> Vec<String> {
    vec!["Intro".to_string()]
}

impl WorkspaceConfig {
    /// Load config from a directory, falling back to defaults when absent
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        let config: WorkspaceConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: config_path.clone(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.autosave_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "autosaveIntervalSecs must be at least 1".to_string(),
            ));
        }
        if self.history_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "historyLimit must be at least 1 (omit it for unlimited undo)".to_string(),
            ));
        }
        if self.default_steps.is_empty() {
            return Err(ConfigError::Invalid(
                "defaultSteps must name at least one step".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute path to the data directory
    pub fn data_dir_in(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.data_dir)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    /// Empty history honoring `historyLimit`
    pub fn history(&self) -> History {
        match self.history_limit {
            Some(limit) => History::with_max_levels(limit),
            None => History::new(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            autosave_interval_secs: default_autosave_interval_secs(),
            autosave_dirty_only: true,
            history_limit: None,
            default_steps: default_steps(),
        }
    }
}
