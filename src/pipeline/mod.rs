// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Build pipeline
//!
//! Configuration, validation and the stages that take a source archive to
//! an installed package.

mod context;
pub mod definition;
mod run;
pub mod stages;
mod validation;

pub use context::{BuildContext, Services};
pub use definition::{strip_archive_suffix, BuildConfig, BuildPaths, Strategy, DEFAULT_CONFIG_FILE};
pub use run::{BuildPipeline, BuildReport};
pub use stages::{select_patches, BuildStrategy, StageOutput, STAGES};
pub use validation::{ConfigValidator, ValidationResult};
