// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Commands command - list the registered bus commands

use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use super::OutputFormat;
use crate::commands::registry;

/// Run the commands command
pub async fn run(format: OutputFormat) -> Result<()> {
    let commands = registry();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&commands).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for command in &commands {
                println!("{} - {}", command.name.bold(), command.desc);
                for param in &command.params {
                    let required = if param.required { " (required)" } else { "" };
                    println!("    --{:<12} {}{}", param.name, param.desc.dimmed(), required);
                }
            }
        }
    }

    Ok(())
}
