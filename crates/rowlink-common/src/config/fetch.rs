//! Fetch configuration.
//!
//! Controls buffer sizing for bound and chunked columns and the policy used
//! to decide when a chunked read is complete.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_BINDABLE_WIDTH, DEFAULT_MAX_CHUNK_SIZE,
    DEFAULT_MAX_VALUE_SIZE, MIN_CHUNK_SIZE,
};
use crate::error::{OdbcError, OdbcResult};

/// When a chunked column read is considered complete.
///
/// Engines differ here: most return `SQL_SUCCESS` for the final chunk,
/// while some only report completion with `SQL_NO_DATA` on an extra call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkTermination {
    /// Stop as soon as a chunk is returned with `SQL_SUCCESS`.
    #[default]
    StopOnSuccess,
    /// Keep reading until the engine answers `SQL_NO_DATA`.
    ConfirmWithNoData,
}

/// Fetch configuration.
///
/// # Example
///
/// ```rust
/// use rowlink_common::config::{ChunkTermination, FetchConfig};
///
/// let config = FetchConfig::builder()
///     .chunk_size(4096)
///     .chunk_termination(ChunkTermination::ConfirmWithNoData)
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Initial scratch buffer size for chunked reads, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Largest size the scratch buffer may grow to when the engine reports
    /// the remaining length of a value.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Largest accumulated value accepted for one column.
    #[serde(default = "default_max_value_size")]
    pub max_value_size: usize,

    /// Widest declared character/binary column size that is bound.
    /// Wider (or unsized) columns are read in chunks.
    #[serde(default = "default_max_bindable_width")]
    pub max_bindable_width: usize,

    /// Completion policy for chunked reads.
    #[serde(default)]
    pub chunk_termination: ChunkTermination,

    /// Whether fixed-width columns are registered with the engine.
    /// When false every column is read explicitly.
    #[serde(default = "default_bind_columns")]
    pub bind_columns: bool,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}

fn default_max_value_size() -> usize {
    DEFAULT_MAX_VALUE_SIZE
}

fn default_max_bindable_width() -> usize {
    DEFAULT_MAX_BINDABLE_WIDTH
}

fn default_bind_columns() -> bool {
    true
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
            max_value_size: default_max_value_size(),
            max_bindable_width: default_max_bindable_width(),
            chunk_termination: ChunkTermination::default(),
            bind_columns: default_bind_columns(),
        }
    }
}

impl FetchConfig {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a small configuration for testing.
    ///
    /// Tiny chunks force multi-chunk reads on short values.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            chunk_size: 8,
            max_chunk_size: 64,
            max_value_size: 64 * 1024,
            ..Default::default()
        }
    }

    /// Creates a builder for configuration.
    #[must_use]
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first violated constraint.
    pub fn validate(&self) -> OdbcResult<()> {
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(OdbcError::invalid_config(format!(
                "chunk_size must be at least {MIN_CHUNK_SIZE} bytes"
            )));
        }

        if self.max_chunk_size < self.chunk_size {
            return Err(OdbcError::invalid_config(
                "max_chunk_size must not be smaller than chunk_size",
            ));
        }

        if self.max_value_size < self.chunk_size {
            return Err(OdbcError::invalid_config(
                "max_value_size must not be smaller than chunk_size",
            ));
        }

        if isize::try_from(self.max_chunk_size).is_err() {
            return Err(OdbcError::invalid_config(
                "max_chunk_size does not fit a native length",
            ));
        }

        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> OdbcResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or validated.
    pub fn from_toml(content: &str) -> OdbcResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Converts configuration to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> OdbcResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Saves configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> OdbcResult<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Builder for fetch configuration.
#[derive(Debug, Default)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial scratch buffer size.
    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Sets the scratch buffer growth limit.
    #[must_use]
    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.config.max_chunk_size = size;
        self
    }

    /// Sets the per-value size limit.
    #[must_use]
    pub fn max_value_size(mut self, size: usize) -> Self {
        self.config.max_value_size = size;
        self
    }

    /// Sets the widest bindable declared column size.
    #[must_use]
    pub fn max_bindable_width(mut self, width: usize) -> Self {
        self.config.max_bindable_width = width;
        self
    }

    /// Sets the chunk completion policy.
    #[must_use]
    pub fn chunk_termination(mut self, policy: ChunkTermination) -> Self {
        self.config.chunk_termination = policy;
        self
    }

    /// Enables or disables column binding.
    #[must_use]
    pub fn bind_columns(mut self, enabled: bool) -> Self {
        self.config.bind_columns = enabled;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> FetchConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.max_bindable_width, 1024);
        assert_eq!(config.chunk_termination, ChunkTermination::StopOnSuccess);
        assert!(config.bind_columns);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_config_is_valid() {
        assert!(FetchConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = FetchConfig::builder()
            .chunk_size(16)
            .max_chunk_size(32)
            .max_value_size(1024)
            .max_bindable_width(0)
            .chunk_termination(ChunkTermination::ConfirmWithNoData)
            .bind_columns(false)
            .build();

        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.max_chunk_size, 32);
        assert_eq!(config.max_value_size, 1024);
        assert_eq!(config.max_bindable_width, 0);
        assert_eq!(config.chunk_termination, ChunkTermination::ConfirmWithNoData);
        assert!(!config.bind_columns);
    }

    #[test]
    fn test_validate_rejects_tiny_chunk() {
        let config = FetchConfig::builder().chunk_size(2).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let config = FetchConfig::builder()
            .chunk_size(4096)
            .max_chunk_size(1024)
            .build();
        assert!(config.validate().is_err());

        let config = FetchConfig::builder()
            .chunk_size(4096)
            .max_value_size(1024)
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FetchConfig::from_toml(
            r#"
            chunk_size = 2048
            chunk_termination = "confirm_with_no_data"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunk_size, 2048);
        assert_eq!(config.chunk_termination, ChunkTermination::ConfirmWithNoData);
        assert_eq!(config.max_bindable_width, DEFAULT_MAX_BINDABLE_WIDTH);
        assert!(config.bind_columns);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(FetchConfig::from_toml("chunk_size = 1").is_err());
        assert!(FetchConfig::from_toml("chunk_size = \"big\"").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf").join("fetch.toml");

        let config = FetchConfig::builder()
            .chunk_size(512)
            .bind_columns(false)
            .build();
        config.save(&path).unwrap();

        let loaded = FetchConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
