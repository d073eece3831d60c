//! YAML configuration parsing.

use std::path::Path;

use super::error::ConfigError;
use super::types::ExecutorConfig;

/// Loads and validates [`ExecutorConfig`] from YAML.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load an executor configuration from a file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<ExecutorConfig, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
                path: path.to_path_buf(),
                source,
            })?;
        let config: ExecutorConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse an executor configuration from a YAML string.
    pub fn parse_str(yaml: &str) -> Result<ExecutorConfig, ConfigError> {
        let config: ExecutorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }
}
