// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use tracing::{info, warn};

use crate::cli::{Cli, RunArgs};
use crate::error::{BinError, BinResult};
use crate::logging::init_logging;
use crate::runtime::RuntimeBuilder;

/// Loads the configuration, starts the sync loop and waits for a signal.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    let mut config = tagbridge_config::load_config(&cli.config)
        .map_err(|e| BinError::from(e).with_context(format!("loading {}", cli.config.display())))?;
    if let Some(startup) = args.startup {
        config.sync.startup = startup.into();
    }

    init_logging(
        &cli.effective_log_level(Some(&config)),
        cli.effective_log_format(Some(&config)),
    )?;
    info!(config = %cli.config.display(), "Configuration loaded");

    let runtime = RuntimeBuilder::new().config(config).build()?;
    let shutdown = runtime.handle().coordinator().clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown.listen_for_signals().await {
            warn!(error = %e, "Signal handlers unavailable, shutting down");
            shutdown.initiate_shutdown();
        }
    });

    runtime.run().await
}
