// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors raised while locating, parsing and validating bridge configuration.
//!
//! Loading fails before the engine is built, so none of these are retried.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration-related errors.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file exists but its content does not match the schema.
    #[error("Cannot parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// A setting is out of range. `field` is the dotted schema path, e.g. `sync.poll_interval_ms`.
    #[error("Invalid setting {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `TAGBRIDGE_*` override could not be applied.
    #[error("Environment override {name} rejected: {message}")]
    InvalidEnvVar { name: String, message: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Only `.yaml`/`.yml`, `.toml` and `.json` are understood.
    #[error("Unsupported configuration format '{extension}'")]
    UnsupportedFormat { extension: String },

    /// Content given as a string failed to deserialize. Loading from a file
    /// reports [`ConfigError::Parse`] with the path instead.
    #[error("Cannot deserialize configuration: {message}")]
    Serialization { message: String },
}

impl ConfigError {
    /// Parse failure in the file at `path`.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Out-of-range setting at the dotted `field` path.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Read failure on `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Rejected environment override.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Missing configuration file.
    pub fn file_not_found(path: &Path) -> Self {
        Self::FileNotFound {
            path: path.to_path_buf(),
        }
    }

    /// Unknown file extension.
    pub fn unsupported_format(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Deserialization failure without a path.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// The schema field a validation error points at.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Short label for structured logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            ConfigError::Parse { .. } | ConfigError::Serialization { .. } => "parse",
            ConfigError::Validation { .. } => "validation",
            ConfigError::Io { .. } | ConfigError::FileNotFound { .. } => "io",
            ConfigError::InvalidEnvVar { .. } => "env_override",
            ConfigError::UnsupportedFormat { .. } => "format",
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
