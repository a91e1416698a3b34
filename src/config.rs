//! Editor configuration.
//!
//! Loaded from a JSON file; every field is optional:
//!
//! ```json
//! {
//!   "identity": "opaque",
//!   "grammar": "lines",
//!   "default_position": { "x": 350, "y": 150 },
//!   "default_color": "#1e293b",
//!   "storage_dir": "./.lineage",
//!   "page": { "width": 595, "height": 842, "margin": 36 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::export::PageSize;
use crate::legend::DEFAULT_NODE_COLOR;
use crate::model::Position;
use crate::schema::Grammar;
use crate::store::IdentityMode;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid default position ({x}, {y})")]
    Position { x: f64, y: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub identity: IdentityMode,
    pub grammar: Grammar,
    pub default_position: Position,
    pub default_color: String,
    /// Directory for file-backed persistence; `None` keeps state in memory.
    pub storage_dir: Option<PathBuf>,
    pub page: PageSize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            identity: IdentityMode::Opaque,
            grammar: Grammar::Lines,
            default_position: Position::new(350.0, 150.0),
            default_color: DEFAULT_NODE_COLOR.to_string(),
            storage_dir: None,
            page: PageSize::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Position { x, y } = self.default_position;
        if !self.default_position.is_finite() {
            return Err(ConfigError::Position { x, y });
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Like [`load`](Self::load), but a missing or invalid file yields the
    /// defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(e) => {
                warn!(error = %e, "unusable configuration, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = EditorConfig::from_json(r#"{"identity": "by_name", "grammar": "commas"}"#).unwrap();
        assert_eq!(config.identity, IdentityMode::ByName);
        assert_eq!(config.grammar, Grammar::Commas);
        assert_eq!(config.default_position, Position::new(350.0, 150.0));
        assert_eq!(config.default_color, DEFAULT_NODE_COLOR);
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn test_unknown_identity_is_an_error() {
        let result = EditorConfig::from_json(r#"{"identity": "uuid"}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_non_finite_default_position_is_invalid() {
        let config = EditorConfig {
            default_position: Position::new(f64::NAN, 0.0),
            ..EditorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Position { .. })));
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"storage_dir": "/tmp/lineage", "page": {{"width": 612}}}}"#).unwrap();

        let config = EditorConfig::load(file.path()).unwrap();
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/lineage")));
        assert_eq!(config.page.width, 612.0);
        assert_eq!(config.page.height, PageSize::default().height);
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(EditorConfig::load_or_default(&missing), EditorConfig::default());
        assert!(matches!(
            EditorConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{").unwrap();
        assert_eq!(EditorConfig::load_or_default(&broken), EditorConfig::default());
    }
}
