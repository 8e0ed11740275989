// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Init command - write a default configuration

use colored::Colorize;
use miette::Result;
use std::path::Path;

use crate::errors::BuildflowError;
use crate::pipeline::{BuildConfig, DEFAULT_CONFIG_FILE};

/// Run the init command
pub async fn run(base_dir: &Path, force: bool, verbose: bool) -> Result<()> {
    println!("{}", "Initializing buildflow configuration...".bold());
    println!();

    let path = base_dir.join(DEFAULT_CONFIG_FILE);
    if path.exists() && !force {
        return Err(miette::miette!(
            "{} already exists. Use --force to overwrite.",
            DEFAULT_CONFIG_FILE
        ));
    }

    let content = default_config()?;
    std::fs::write(&path, &content).map_err(|e| BuildflowError::FileWriteError {
        path: path.clone(),
        error: e.to_string(),
    })?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_FILE);

    let patches = base_dir.join("patches");
    if !patches.exists() {
        std::fs::create_dir_all(&patches).map_err(|e| BuildflowError::FileWriteError {
            path: patches.clone(),
            error: e.to_string(),
        })?;
        println!("  {} Created patches/", "✓".green());
    }

    println!();
    println!("{}", "Configuration written!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to set the source and version", DEFAULT_CONFIG_FILE.cyan());
    println!(
        "  2. Drop patches named {} or {} into {}",
        "NNN-*.patch".cyan(),
        "<os>-*.patch".cyan(),
        "patches/".cyan()
    );
    println!("  3. Run {} to build and install", "buildflow build".cyan());
    println!();

    if verbose {
        println!("{}", "Generated configuration:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

fn default_config() -> Result<String> {
    let body = BuildConfig::default().to_yaml()?;
    Ok(format!(
        "# buildflow configuration\n\
         # strategy: auto | bootstrap | configure\n\
         # checksum: BLAKE3 hex digest of the archive (optional)\n\n{}",
        body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses_back() {
        let content = default_config().unwrap();
        let parsed = BuildConfig::from_yaml(&content).unwrap();
        assert_eq!(parsed, BuildConfig::default());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "name: mine\n").unwrap();

        assert!(run(dir.path(), false, false).await.is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(DEFAULT_CONFIG_FILE)).unwrap(),
            "name: mine\n"
        );

        run(dir.path(), true, false).await.unwrap();
        assert!(dir.path().join("patches").is_dir());
    }
}
