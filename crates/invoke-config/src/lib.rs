//! Configuration for the classification invocation benchmark.
//!
//! Files are read into [`raw::RawInvokeConfig`], defaults are filled, then
//! the result is checked into [`validated::FinalInvokeConfig`].

pub mod raw;
pub mod validated;

use std::{fs, path::Path};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use raw::RawInvokeConfig;
pub use validated::FinalInvokeConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("unsupported config format (expected .json or .toml): {0}")]
    UnsupportedFormat(String),
    #[error("missing required config field `{0}`")]
    Missing(&'static str),
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicyOption {
    /// Record every failed call and keep going.
    #[default]
    Isolate,
    /// First failed call ends the run.
    Abort,
}

pub fn load_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, ConfigError> {
    let content = read(path.as_ref())?;
    serde_json::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.as_ref().display().to_string(),
        message: err.to_string(),
    })
}

pub fn load_toml<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, ConfigError> {
    let content = read(path.as_ref())?;
    toml::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.as_ref().display().to_string(),
        message: err.to_string(),
    })
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Loads, defaults and validates a config file, picking the parser from the
/// file extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FinalInvokeConfig, ConfigError> {
    let path = path.as_ref();
    let mut raw: RawInvokeConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => load_json(path)?,
        Some("toml") => load_toml(path)?,
        _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    };
    raw.fill_default();
    FinalInvokeConfig::from_raw(raw)
}
