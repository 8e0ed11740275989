// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Build command - run the pipeline

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::load_config;
use crate::errors::{BuildflowError, RecoverySuggestion};
use crate::pipeline::{
    select_patches, BuildConfig, BuildPaths, BuildPipeline, BuildReport, ConfigValidator,
    Services, Strategy, STAGES,
};
use crate::platform::PlatformDescriptor;
use crate::sink::{LogSink, TracingSink};
use crate::utils::{print_header, StageMark, StageProgress};

/// Overrides given on the command line
#[derive(Debug, Default)]
pub struct BuildOverrides {
    pub jobs: Option<usize>,
    pub strategy: Option<Strategy>,
    pub temp_root: Option<PathBuf>,
}

/// Run the build command
pub async fn run(
    base_dir: &Path,
    config_path: Option<PathBuf>,
    overrides: BuildOverrides,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let loaded = load_config(base_dir, config_path.as_deref())?;
    let mut config = loaded.config;

    if overrides.jobs.is_some() {
        config.jobs = overrides.jobs;
    }
    if let Some(strategy) = overrides.strategy {
        config.strategy = strategy;
    }
    if let Some(root) = overrides.temp_root {
        config.temp_root = Some(base_dir.join(root));
    }

    let validation = ConfigValidator::validate(&config)?;

    if !validation.is_valid() {
        eprintln!("{}", "Configuration validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Build configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Configuration warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let platform = PlatformDescriptor::detect(config.jobs);
    let problems = ConfigValidator::validate_host(&config, &platform, &loaded.root);
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("  {} {}", "✗".red(), problem);
        }
        return Err(miette::miette!("Build configuration does not fit this host"));
    }

    let paths = BuildPaths::resolve(&config, &loaded.root)?;

    if dry_run {
        print_plan(&config, &paths, &platform)?;
        return Ok(());
    }

    let missing = missing_tools(&config, &paths, &platform)?;
    if let Some(tool) = missing.first() {
        eprintln!("{}", "Missing required tools:".red().bold());
        for tool in &missing {
            eprintln!("  {} {}", "✗".red(), tool);
        }
        eprintln!();
        eprintln!("{}", RecoverySuggestion::install_tool(tool));
        return Err(BuildflowError::tool_not_found(tool).into());
    }

    let sink: Arc<dyn LogSink> = Arc::new(TracingSink::new());
    let pipeline = BuildPipeline::new(config, paths, platform, Services::system(sink));
    let report = pipeline.run().await;

    println!();
    summary(&report).print();
    println!();

    match report.into_result() {
        Ok(prefix) => {
            println!(
                "{} installed to {}",
                pipeline.config().name.green().bold(),
                prefix.display()
            );
            Ok(())
        }
        Err(error) => {
            if let Some(suggestion) = RecoverySuggestion::for_error(&error) {
                eprintln!("{}", suggestion);
            }
            Err(error.into())
        }
    }
}

/// Per stage marks for the final summary
fn summary(report: &BuildReport) -> StageProgress {
    let mut progress = StageProgress::new(STAGES.iter().map(|s| s.to_string()).collect());

    for (stage, output) in &report.results {
        let mark = if output.is_skipped() {
            StageMark::Skipped
        } else {
            StageMark::Done
        };
        progress.mark(stage, mark);
    }

    if let Some(ref failure) = report.failure {
        let stage = failure.error.stage().unwrap_or(failure.task.as_str());
        progress.mark(stage, StageMark::Failed);
    }

    progress
}

/// Tools the run will invoke that cannot be found
///
/// cmake is only required when configure was asked for explicitly; `auto`
/// falls back to bootstrap without it.
fn missing_tools(
    config: &BuildConfig,
    paths: &BuildPaths,
    platform: &PlatformDescriptor,
) -> Result<Vec<String>> {
    let mut tools = vec![platform.build_tool.clone()];

    match config.strategy {
        Strategy::Bootstrap => tools.push(platform.shell.clone()),
        Strategy::Configure => tools.push("cmake".to_string()),
        Strategy::Auto => {}
    }

    if !select_patches(&paths.patches, platform.family)?.is_empty() {
        tools.push("patch".to_string());
    }

    Ok(tools
        .into_iter()
        .filter(|tool| which::which(tool).is_err())
        .collect())
}

fn print_plan(config: &BuildConfig, paths: &BuildPaths, platform: &PlatformDescriptor) -> Result<()> {
    print_header(&format!("Build plan for {} {}", config.name, config.version));

    println!("  {:<10} {}", "source".bold(), config.src);
    println!("  {:<10} {}", "archive".bold(), paths.archive.display());
    println!("  {:<10} {}", "unpacked".bold(), paths.source_dir().display());
    println!("  {:<10} {}", "prefix".bold(), paths.out.display());
    println!(
        "  {:<10} {} ({} jobs{})",
        "platform".bold(),
        platform.family,
        platform.jobs,
        if platform.jobs_forced { ", forced" } else { "" }
    );
    println!("  {:<10} {}", "strategy".bold(), config.strategy);

    let patches = select_patches(&paths.patches, platform.family)?;
    println!();
    if patches.is_empty() {
        println!("  {}", "No patches to apply".dimmed());
    } else {
        println!("{}:", "Patches".bold());
        for patch in &patches {
            println!("  - {}", patch.display());
        }
    }

    println!();
    println!("{}:", "Stages".bold());
    for (i, stage) in STAGES.iter().enumerate() {
        println!("  {}. {}", i + 1, stage);
    }

    Ok(())
}
