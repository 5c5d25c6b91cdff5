//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// File name looked up in the application directory.
pub const CONFIG_FILE_NAME: &str = "waypoint.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("{0} already exists (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Path of the config file inside an application directory.
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content).map_err(|e| match e {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: PathBuf::from(CONFIG_FILE_NAME),
        source,
    })?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load `waypoint.toml` from `dir`, falling back to defaults when the file
/// does not exist. Any other failure is returned.
pub fn load_from_dir(dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = config_path(dir);
    match load_config(&path) {
        Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            Ok(AppConfig::default())
        }
        other => other,
    }
}

/// Write the default configuration to `dir/waypoint.toml`.
pub fn write_default(dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let path = config_path(dir);
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path));
    }

    let io_error = |source| ConfigError::Io {
        path: path.clone(),
        source,
    };
    fs::create_dir_all(dir).map_err(io_error)?;
    let content = toml::to_string_pretty(&AppConfig::default())?;
    fs::write(&path, content).map_err(io_error)?;

    Ok(path)
}
