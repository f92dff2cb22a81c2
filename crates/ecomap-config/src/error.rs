//! Errors raised while reading, checking or writing map settings.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A settings file exists but could not be read
    #[error("cannot read settings from '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A settings file is not valid TOML for `MapConfig`
    #[error("settings file '{path}' is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The default settings could not be written
    #[error("cannot write default settings to '{path}': {source}")]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot render settings as TOML: {0}")]
    Render(#[from] toml::ser::Error),

    /// `init --global` without a home directory
    #[error("no home directory to hold the global settings")]
    NoHomeDir,

    /// A merged setting the map cannot work with
    #[error("setting '{key}' is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
