// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Source acquisition
//!
//! Collaborators that turn a source URI into a patched source tree:
//! [`Downloader`], [`Extractor`] and [`Patcher`]. The pipeline only sees
//! the traits; tests swap in fakes.

mod download;
mod extract;
mod patch;

pub use download::HttpDownloader;
pub use extract::ArchiveExtractor;
pub use patch::CommandPatcher;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Progress callback: `(current, total)`, total is 0 when unknown
pub type ProgressFn<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// Fetches a remote resource to a local file
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `uri` to `dest`, creating parent directories as needed
    async fn get(&self, uri: &str, dest: &Path, progress: &ProgressFn<'_>) -> Result<()>;
}

/// Unpacks an archive into a directory
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, archive: &Path, out_dir: &Path, progress: &ProgressFn<'_>) -> Result<()>;
}

/// Applies a patch file to a source tree
#[async_trait]
pub trait Patcher: Send + Sync {
    /// Apply `patch_file` inside `source_dir`, stripping `strip` leading
    /// path components from the file names it mentions
    async fn apply(&self, source_dir: &Path, patch_file: &Path, strip: u32) -> Result<()>;
}
