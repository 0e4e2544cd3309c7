//! Configuration loading for the Bestiary client.
//!
//! A config file is read from `--config <path>` or `BESTIARY_CONFIG`. Every
//! field in a file is required; with neither source the built-in defaults
//! are used.

use bestiary_core::{BestiaryConfig, ConfigError};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "BESTIARY_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Resolve and load the configuration.
///
/// `cli_path` wins over the environment variable.
pub fn load(cli_path: Option<&Path>) -> Result<BestiaryConfig, ConfigLoadError> {
    let path = cli_path.map(Path::to_path_buf).or_else(config_path_from_env);
    let config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading config file");
            from_path(&path)?
        }
        None => {
            tracing::debug!("No config file given, using defaults");
            BestiaryConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Parse a config file without validating it.
pub fn from_path(path: &Path) -> Result<BestiaryConfig, ConfigLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml(&contents)
}

pub fn from_toml(contents: &str) -> Result<BestiaryConfig, ConfigLoadError> {
    Ok(toml::from_str(contents)?)
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
