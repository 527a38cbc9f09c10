// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Prints version information for every crate in the workspace.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("tagbridge - tag source to metric namespace bridge");
    println!();
    println!("Version Information:");
    println!("  tagbridge-bin:    {}", crate::VERSION);
    println!("  tagbridge-core:   {}", tagbridge_core::VERSION);
    println!("  tagbridge-config: {}", tagbridge_config::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target: {}", std::env::consts::ARCH);
    println!("  OS:     {}", std::env::consts::OS);
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
