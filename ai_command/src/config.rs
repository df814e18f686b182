use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
pub const DEFAULT_RUNAWAY_THRESHOLD: usize = 50;

/// Settings read once when a controller is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Number of pushes kept in the diagnostic history. Zero disables it.
    pub history_capacity: usize,
    /// Deepest chain tolerated before runaway handling kicks in.
    pub runaway_threshold: usize,
    /// Abort the head command when the chain runs away.
    pub abort_runaway: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            runaway_threshold: DEFAULT_RUNAWAY_THRESHOLD,
            abort_runaway: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading controller config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing controller config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("runaway_threshold must be at least 1")]
    ZeroRunawayThreshold,
}

impl ControllerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: ControllerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runaway_threshold == 0 {
            return Err(ConfigError::ZeroRunawayThreshold);
        }
        Ok(())
    }
}
