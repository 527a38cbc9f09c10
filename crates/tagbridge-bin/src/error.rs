// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Process-level errors and exit codes.
//!
//! | code | cause |
//! |------|-------|
//! | 1 | configuration could not be loaded or is invalid |
//! | 2 | logging, engine or runtime could not be set up |
//! | 3 | the poll loop stopped on an unrecoverable error |
//! | 4 | I/O, including state persistence |
//! | 5 | any other engine error |

use tagbridge_config::ConfigError;
use tagbridge_core::BridgeError;
use thiserror::Error;

/// Result type alias for tagbridge-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors surfaced by the `tagbridge` binary.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum BinError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Startup failed: {0}")]
    Initialization(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// Loading the configuration file failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The sync engine failed outside a regular cycle (bootstrap or persist).
    #[error("Engine error: {0}")]
    Engine(#[from] BridgeError),

    /// Wraps another error with what was being attempted.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Configuration problem found outside the loader.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Setup failure before the poll loop starts.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Failure while the poll loop is running.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Prefixes the error with `context`. The exit code is kept.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Initialization(_) => 2,
            Self::Runtime(_) => 3,
            Self::Io(_) | Self::Engine(BridgeError::State(_)) => 4,
            Self::Engine(_) => 5,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Prints an error and its cause chain to stderr.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with its code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}
