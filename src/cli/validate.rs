// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Validate command - check the build configuration

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use crate::pipeline::{BuildConfig, BuildPaths, ConfigValidator};
use crate::platform::PlatformDescriptor;
use crate::utils::print_section;

/// Run the validate command
pub async fn run(base_dir: &Path, config_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating configuration...".bold());
    println!();

    let path = base_dir.join(&config_path);
    if !path.exists() {
        return Err(miette::miette!(
            "Configuration file not found: {}\n\n\
             Run 'buildflow init' to create one.",
            config_path.display()
        ));
    }

    let config = match BuildConfig::from_file(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("  {} Failed to parse configuration", "✗".red());
            eprintln!();
            return Err(miette::miette!("Parse error: {}", e));
        }
    };

    println!("  {} Configuration file parses", "✓".green());

    let validation = ConfigValidator::validate(&config)?;

    let root = path.parent().unwrap_or(base_dir);
    let platform = PlatformDescriptor::detect(config.jobs);
    let host_problems = ConfigValidator::validate_host(&config, &platform, root);

    let mut has_issues = false;

    if !validation.errors.is_empty() {
        has_issues = true;
        print_section(&"Errors".red().to_string());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !host_problems.is_empty() {
        has_issues = true;
        print_section(&"Host".yellow().to_string());
        for problem in &host_problems {
            println!("  {} {}", "⚠".yellow(), problem);
        }
    }

    if !validation.warnings.is_empty() {
        print_section(&"Warnings".yellow().to_string());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose && validation.is_valid() {
        print_section("Build summary");
        println!("  Package: {} {}", config.name, config.version);
        println!("  Strategy: {}", config.strategy);
        if let Ok(paths) = BuildPaths::resolve(&config, root) {
            println!("  Archive: {}", paths.archive.display());
            println!("  Prefix: {}", paths.out.display());
        }
        println!("  Jobs: {} on {}", platform.jobs, platform.family);
    }

    println!();

    if has_issues {
        Err(miette::miette!("Configuration validation failed"))
    } else if validation.has_warnings() {
        println!(
            "{}",
            "Configuration is valid but has warnings.".yellow().bold()
        );
        Ok(())
    } else {
        println!("{}", "Configuration is valid!".green().bold());
        Ok(())
    }
}
