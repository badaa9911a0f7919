//! Optional TOML settings for import and export.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::csv_io::DEFAULT_PREVIEW_ROWS;
use crate::import::DEFAULT_ERROR_DISPLAY_LIMIT;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Rows written at once (1 = sequential).
    pub concurrency: usize,
    pub preview_rows: usize,
    pub error_display_limit: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            error_display_limit: DEFAULT_ERROR_DISPLAY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory export and failed-row files are written to.
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub import: ImportConfig,
    pub export: ExportConfig,
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.import.concurrency == 0 {
            return Err(ConfigError::Validation(
                "import.concurrency must be at least 1".into(),
            ));
        }
        if self.import.preview_rows == 0 {
            return Err(ConfigError::Validation(
                "import.preview_rows must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
