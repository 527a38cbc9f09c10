// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use tagbridge_config::BridgeConfig;
use tagbridge_core::StartupMode;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Loads and validates the configuration and prints a summary.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;
    let config = tagbridge_config::load_config(config_path).map_err(|e| match e.field() {
        Some(field) => BinError::config(format!(
            "{} (set `{}` in {})",
            e,
            field,
            config_path.display()
        )),
        None => BinError::from(e).with_context("configuration validation failed"),
    })?;
    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!(
                "  Namespace:     {}/{}/{}",
                config.node.group_id, config.node.node_id, config.node.device_id
            );
            println!("  Snapshot:      {}", config.source.snapshot_path.display());
            println!("  State file:    {}", config.sync.state_path.display());
            println!("  Poll interval: {}ms", config.sync.poll_interval_ms);
            println!("  Pull timeout:  {}ms", config.source.pull_timeout_ms);
            println!("  Startup:       {}", config.sync.startup.as_str());

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", to_json(&config)?);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "group_id": config.node.group_id,
                    "node_id": config.node.node_id,
                    "device_id": config.node.device_id,
                    "poll_interval_ms": config.sync.poll_interval_ms,
                    "startup": config.sync.startup.as_str(),
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!("{}", to_json(&output)?);
        }
    }

    Ok(())
}

/// Conditions that are valid but probably not intended.
fn collect_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.source.snapshot_path.exists() {
        warnings.push(format!(
            "Snapshot file does not exist yet: {}",
            config.source.snapshot_path.display()
        ));
    }
    if let Some(parent) = config.sync.state_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            warnings.push(format!(
                "State directory will be created: {}",
                parent.display()
            ));
        }
    }
    if config.sync.startup == StartupMode::Resume && !config.sync.state_path.exists() {
        warnings.push("Resume requested but no state file exists, starting empty".to_string());
    }

    warnings
}

fn to_json<T: serde::Serialize>(value: &T) -> BinResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| BinError::runtime(e.to_string()))
}
