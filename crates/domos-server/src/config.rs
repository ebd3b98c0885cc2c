//! Server configuration
//!
//! One small YAML file (`domosd.yaml`) with everything the daemon needs. A
//! missing file is not an error: the daemon starts with defaults, which is
//! the common case for a fresh install.

use domos_engine::DEFAULT_MAX_CASCADE_DEPTH;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Daemon configuration, deserialized from `domosd.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Path of the SQLite database file.
    pub database: PathBuf,

    /// Cascade hops after which a trigger recomputation stops propagating.
    pub max_cascade_depth: u32,

    /// Worker queue backlog above which a warning is logged.
    pub queue_warning: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("domos.db"),
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            queue_warning: 1000,
        }
    }
}

impl HubConfig {
    /// Load the configuration, falling back to defaults when the file does
    /// not exist.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = HubConfig::load("/nonexistent/domosd.yaml").unwrap();
        assert_eq!(cfg.database, PathBuf::from("domos.db"));
        assert_eq!(cfg.max_cascade_depth, DEFAULT_MAX_CASCADE_DEPTH);
        assert_eq!(cfg.queue_warning, 1000);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("domosd.yaml");
        std::fs::write(&path, "database: /var/lib/domos/hub.db\n").unwrap();

        let cfg = HubConfig::load(&path).unwrap();
        assert_eq!(cfg.database, PathBuf::from("/var/lib/domos/hub.db"));
        assert_eq!(cfg.max_cascade_depth, DEFAULT_MAX_CASCADE_DEPTH);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("domosd.yaml");
        std::fs::write(&path, "databse: typo.db\n").unwrap();

        assert!(matches!(
            HubConfig::load(&path),
            Err(ConfigError::ParseYaml { .. })
        ));
    }
}
