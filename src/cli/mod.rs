// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for buildflow.

pub mod build;
pub mod commands;
pub mod graph;
pub mod init;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::{BuildConfig, Strategy, DEFAULT_CONFIG_FILE};

/// Source package builder
///
/// Fetch, patch, configure and install a package from its source archive.
#[derive(Parser, Debug)]
#[clap(
    name = "buildflow",
    version,
    about = "Fetch, patch and build a package from its source archive",
    long_about = None,
    after_help = "Examples:\n\
        buildflow init                  Write a default .buildflow.yaml\n\
        buildflow build                 Build and install the package\n\
        buildflow build --dry-run       Show what would be done\n\
        buildflow graph -f dot          Show the stage graph\n\n\
        See 'buildflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Resolve relative paths against DIR instead of the current directory
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

impl Cli {
    /// Directory relative paths are resolved against
    pub fn base_dir(&self) -> miette::Result<PathBuf> {
        let cwd = std::env::current_dir()
            .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;

        Ok(match self.directory {
            Some(ref dir) if dir.is_absolute() => dir.clone(),
            Some(ref dir) => cwd.join(dir),
            None => cwd,
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and install the package
    Build {
        /// Configuration file (defaults to .buildflow.yaml when present)
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Parallel jobs for the build tool
        #[clap(short, long)]
        jobs: Option<usize>,

        /// Preparation strategy (auto, bootstrap, configure)
        #[clap(long)]
        strategy: Option<Strategy>,

        /// Download and extraction directory
        #[clap(long, value_name = "DIR")]
        temp_root: Option<PathBuf>,

        /// Dry run (show what would be done)
        #[clap(long)]
        dry_run: bool,
    },

    /// Show the build stages as a graph
    Graph {
        /// Configuration file
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Output format (text, dot, mermaid)
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },

    /// Validate the build configuration
    Validate {
        /// Configuration file to validate
        #[clap(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[clap(long)]
        force: bool,
    },

    /// List the commands exposed to a host command bus
    Commands {
        /// Output format (text, json)
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for the commands listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

/// A loaded configuration and the directory its relative paths start from
pub(crate) struct LoadedConfig {
    pub config: BuildConfig,
    pub root: PathBuf,
    /// File the configuration came from, `None` for built-in defaults
    pub source: Option<PathBuf>,
}

/// Load `config`, or `.buildflow.yaml` if present, or the defaults
pub(crate) fn load_config(base_dir: &Path, config: Option<&Path>) -> miette::Result<LoadedConfig> {
    let explicit = config.is_some();
    let path = base_dir.join(config.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE)));

    if !explicit && !path.exists() {
        return Ok(LoadedConfig {
            config: BuildConfig::default(),
            root: base_dir.to_path_buf(),
            source: None,
        });
    }

    let config = BuildConfig::from_file(&path)?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base_dir.to_path_buf());

    Ok(LoadedConfig {
        config,
        root,
        source: Some(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::parse_from([
            "buildflow", "build", "-j", "3", "--strategy", "bootstrap", "--dry-run",
        ]);
        match cli.command {
            Commands::Build {
                jobs,
                strategy,
                dry_run,
                ..
            } => {
                assert_eq!(jobs, Some(3));
                assert_eq!(strategy, Some(Strategy::Bootstrap));
                assert!(dry_run);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_load_config_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(dir.path(), None).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config, BuildConfig::default());
    }

    #[test]
    fn test_load_config_explicit_missing_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(dir.path(), Some(Path::new("nope.yaml"))).is_err());
    }

    #[test]
    fn test_load_config_root_is_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/build.yaml"), "name: ninja\n").unwrap();

        let loaded = load_config(dir.path(), Some(Path::new("pkg/build.yaml"))).unwrap();
        assert_eq!(loaded.config.name, "ninja");
        assert_eq!(loaded.root, dir.path().join("pkg"));
    }
}
