// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! buildflow - source package builder
//!
//! Fetch, patch, configure and install a package from its source archive.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use buildflow::cli::build::BuildOverrides;
use buildflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "buildflow=debug"
    } else {
        "buildflow=info"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if !buildflow::utils::should_use_colors() {
        colored::control::set_override(false);
    }

    let base_dir = cli.base_dir()?;

    // Dispatch to command handlers
    match cli.command {
        Commands::Build {
            config,
            jobs,
            strategy,
            temp_root,
            dry_run,
        } => {
            let overrides = BuildOverrides {
                jobs,
                strategy,
                temp_root,
            };
            buildflow::cli::build::run(&base_dir, config, overrides, dry_run, cli.verbose).await
        }
        Commands::Graph { config, format } => {
            buildflow::cli::graph::run(&base_dir, config, format, cli.verbose).await
        }
        Commands::Validate { config } => {
            buildflow::cli::validate::run(&base_dir, config, cli.verbose).await
        }
        Commands::Init { force } => buildflow::cli::init::run(&base_dir, force, cli.verbose).await,
        Commands::Commands { format } => buildflow::cli::commands::run(format).await,
    }
}
