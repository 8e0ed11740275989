// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Graph command - visualize the build stages

use miette::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{load_config, GraphFormat};
use crate::pipeline::{BuildPaths, BuildPipeline, Services};
use crate::platform::PlatformDescriptor;
use crate::sink::TracingSink;

/// Run the graph command
pub async fn run(
    base_dir: &Path,
    config_path: Option<PathBuf>,
    format: GraphFormat,
    _verbose: bool,
) -> Result<()> {
    let loaded = load_config(base_dir, config_path.as_deref())?;
    let paths = BuildPaths::resolve(&loaded.config, &loaded.root)?;
    let platform = PlatformDescriptor::detect(loaded.config.jobs);

    let pipeline = BuildPipeline::new(
        loaded.config,
        paths,
        platform,
        Services::system(Arc::new(TracingSink::new())),
    );
    let graph = pipeline.graph()?;

    let output = match format {
        GraphFormat::Text => graph.to_text(),
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
