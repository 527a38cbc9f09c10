// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Start the sync loop (default)
//! - `validate`: Validate a configuration file
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tagbridge_config::BridgeConfig;
use tagbridge_core::StartupMode;

// =============================================================================
// Main CLI Structure
// =============================================================================

/// tagbridge - relational tag source to metric namespace bridge
#[derive(Parser, Debug)]
#[command(
    name = "tagbridge",
    author = "Sylvex <contact@sylvex.io>",
    version = tagbridge_core::VERSION,
    about = "Keeps a Sparkplug-style metric namespace in sync with a relational tag store",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "tagbridge.yaml",
        env = "TAGBRIDGE_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format. Overrides the config file.
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the sync loop
    ///
    /// This is the default command when no subcommand is specified.
    Run(RunArgs),

    /// Validate the configuration file without starting anything
    Validate(ValidateArgs),

    /// Show version information
    Version,
}

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Startup mode, overriding `sync.startup`
    #[arg(long)]
    pub startup: Option<StartupArg>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show the parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Single-line format
    Compact,
    /// JSON format for log aggregation
    Json,
}

impl From<LogFormat> for tagbridge_config::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => tagbridge_config::LogFormat::Pretty,
            LogFormat::Compact => tagbridge_config::LogFormat::Compact,
            LogFormat::Json => tagbridge_config::LogFormat::Json,
        }
    }
}

/// Startup mode on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StartupArg {
    /// Derive a fresh baseline from the first pull
    Baseline,
    /// Continue from the persisted snapshot
    Resume,
}

impl From<StartupArg> for StartupMode {
    fn from(arg: StartupArg) -> Self {
        match arg {
            StartupArg::Baseline => StartupMode::Baseline,
            StartupArg::Resume => StartupMode::Resume,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run`.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Resolves the log level: quiet and verbose win, then the flag, then the file.
    pub fn effective_log_level(&self, config: Option<&BridgeConfig>) -> String {
        if self.quiet {
            "warn".to_string()
        } else if self.verbose {
            "debug".to_string()
        } else if let Some(level) = &self.log_level {
            level.clone()
        } else {
            config
                .map(|c| c.logging.level.as_str())
                .unwrap_or("info")
                .to_string()
        }
    }

    /// Resolves the log format: the flag, then the file.
    pub fn effective_log_format(&self, config: Option<&BridgeConfig>) -> tagbridge_config::LogFormat {
        match self.log_format {
            Some(format) => format.into(),
            None => config.map(|c| c.logging.format).unwrap_or_default(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
