//! Engine configuration, loaded from TOML.
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! [storage]
//! data_dir = "./data/interactions"
//!
//! [ids]
//! max_prefix_len = 20
//!
//! [paths]
//! max_depth = 10
//!
//! [export]
//! max_choices = 4
//! enforce_id_pattern = true
//! normalize = true
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub storage: StorageConfig,
    pub ids: IdConfig,
    pub paths: PathConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

/// Where the file-backed store keeps interaction files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/interactions"),
        }
    }
}

/// ID generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    /// Longest prefix kept after sanitizing.
    pub max_prefix_len: usize,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self { max_prefix_len: 20 }
    }
}

/// Dialogue path reconstruction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Maximum number of backward steps.
    pub max_depth: usize,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self { max_depth: 10 }
    }
}

/// Engine JSON export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub max_choices: usize,
    /// Require upper-snake-case node ids.
    pub enforce_id_pattern: bool,
    /// Drop empty and false fields when writing.
    pub normalize: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_choices: 4,
            enforce_id_pattern: true,
            normalize: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("config {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.ids.max_prefix_len, 20);
        assert_eq!(config.paths.max_depth, 10);
        assert_eq!(config.export.max_choices, 4);
        assert!(config.export.enforce_id_pattern);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [storage]
            data_dir = "/tmp/dialogue"

            [export]
            enforce_id_pattern = false
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/dialogue"));
        assert!(!config.export.enforce_id_pattern);
        assert_eq!(config.export.max_choices, 4);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let result = EngineConfig::from_toml_str("[paths]\nmax_depth = \"deep\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dialogue.toml");
        std::fs::write(&path, "[paths]\nmax_depth = 3\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.paths.max_depth, 3);

        let missing = EngineConfig::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(missing.paths.max_depth, 10);
    }
}
