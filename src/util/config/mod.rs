//! lox-memory configuration
//!
//! A single RON file tunes the growth policy, an optional heap budget, the
//! reaction to allocation failure and the log level. Every field has a
//! default, so a missing file or a partial file is fine.
//!
//! ```text
//! (
//!     growth: (min_capacity: 8),
//!     heap_limit: Some(1048576),
//!     on_failure: Report,
//!     log_level: Info,
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::runtime::memory::GrowthPolicy;
use crate::util::logger::LogLevel;

/// What the driver does when an allocation cannot be satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Terminate the process
    #[default]
    Abort,
    /// Return the error to the caller
    Report,
}

/// Memory configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Growth policy for arrays
    pub growth: GrowthPolicy,
    /// Live byte budget; `None` means unbounded
    pub heap_limit: Option<usize>,
    pub on_failure: FailurePolicy,
    pub log_level: LogLevel,
}

impl MemoryConfig {
    /// Check values serde cannot reject on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.growth.min_capacity == 0 {
            return Err(ConfigError::Invalid(
                "growth.min_capacity must be at least 1".to_string(),
            ));
        }
        if self.heap_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "heap_limit must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ParseError(#[from] ron::error::SpannedError),

    #[error("Config serialize error: {0}")]
    SerializeError(#[from] ron::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Parse and validate configuration text
pub fn parse_config(content: &str) -> Result<MemoryConfig, ConfigError> {
    let config: MemoryConfig = ron::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from `path`
/// Returns the default config if the file doesn't exist
pub fn load_config(path: &Path) -> Result<MemoryConfig, ConfigError> {
    if !path.exists() {
        return Ok(MemoryConfig::default());
    }

    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Save configuration to `path`, creating parent directories
pub fn save_config(
    path: &Path,
    config: &MemoryConfig,
) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    let content = ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())?;
    fs::write(path, content)?;

    Ok(())
}
