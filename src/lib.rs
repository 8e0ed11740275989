// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! # buildflow - Source Package Builder
//!
//! `buildflow` takes a package from its source archive to an installed
//! prefix: fetch, extract, patch, prepare, bootstrap or configure, then
//! compile and install.
//!
//! ## Features
//!
//! - **Task graph executor** - Stages run as soon as their dependencies succeed
//! - **Platform strategy** - Tool names, generator and job count resolved per host
//! - **Scoped search path** - Entries hidden for one stage are always restored
//! - **Completion events** - One success or failure event per run
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a default configuration
//! buildflow init
//!
//! # Show what would be done
//! buildflow build --dry-run
//!
//! # Build and install
//! buildflow build
//! ```

pub mod cli;
pub mod commands;
pub mod env;
pub mod errors;
pub mod events;
pub mod graph;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod sink;
pub mod source;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use errors::{BuildflowError, BuildflowResult};
pub use graph::{GraphExecutor, Task, TaskGraph};
pub use pipeline::{BuildConfig, BuildPipeline, BuildReport};
pub use platform::{OsFamily, PlatformDescriptor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
