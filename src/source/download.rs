// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Streaming downloader
//!
//! Remote archives are streamed to a `.part` file next to the destination
//! and renamed once complete, so an interrupted download is never mistaken
//! for a finished one. Local paths and `file://` URIs are copied.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{Downloader, ProgressFn};

/// Downloads over HTTP(S), copies local sources
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_remote(&self, uri: &str, dest: &Path, progress: &ProgressFn<'_>) -> Result<()> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .with_context(|| format!("Failed to start download from {}", uri))?;

        let status = response.status();
        if !status.is_success() {
            bail!(
                "Download failed with status {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            );
        }

        let total = response.content_length().unwrap_or(0);
        debug!("Content-Length: {}", total);

        let partial = partial_path(dest);
        let mut file = File::create(&partial)
            .await
            .with_context(|| format!("Failed to create file: {}", partial.display()))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        progress(0, total);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read chunk from response stream")?;
            file.write_all(&chunk)
                .await
                .context("Failed to write chunk to file")?;

            downloaded += chunk.len() as u64;
            progress(downloaded, total.max(downloaded));
        }

        file.flush().await.context("Failed to flush file")?;
        drop(file);

        tokio::fs::rename(&partial, dest)
            .await
            .with_context(|| format!("Failed to move download to {}", dest.display()))?;

        progress(downloaded, downloaded);
        Ok(())
    }

    async fn copy_local(&self, source: &Path, dest: &Path, progress: &ProgressFn<'_>) -> Result<()> {
        let bytes = tokio::fs::copy(source, dest)
            .await
            .with_context(|| format!("Failed to copy {}", source.display()))?;
        progress(bytes, bytes);
        Ok(())
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn get(&self, uri: &str, dest: &Path, progress: &ProgressFn<'_>) -> Result<()> {
        if dest.is_file() {
            info!("{} already downloaded", dest.display());
            return Ok(());
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        info!("Downloading {} to {}", uri, dest.display());

        match local_source(uri) {
            Some(path) => self.copy_local(&path, dest, progress).await,
            None => self.fetch_remote(uri, dest, progress).await,
        }
    }
}

/// Filesystem path for `file://` URIs and plain paths
fn local_source(uri: &str) -> Option<PathBuf> {
    if let Some(path) = uri.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    if uri.contains("://") {
        None
    } else {
        Some(PathBuf::from(uri))
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_local_source() {
        assert_eq!(local_source("file:///tmp/a.tar.gz"), Some(PathBuf::from("/tmp/a.tar.gz")));
        assert_eq!(local_source("vendor/a.tar.gz"), Some(PathBuf::from("vendor/a.tar.gz")));
        assert_eq!(local_source("https://example.com/a.tar.gz"), None);
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/src/a.tar.gz")),
            PathBuf::from("/tmp/src/a.tar.gz.part")
        );
    }

    #[tokio::test]
    async fn test_copies_local_file_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("origin.tar.gz");
        std::fs::write(&source, b"archive bytes").unwrap();
        let dest = dir.path().join("tmp").join("src").join("copy.tar.gz");

        let seen = Mutex::new(Vec::new());
        let progress = |current: u64, total: u64| seen.lock().unwrap().push((current, total));

        let uri = format!("file://{}", source.display());
        HttpDownloader::new().get(&uri, &dest, &progress).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"archive bytes");
        assert_eq!(*seen.lock().unwrap(), vec![(13, 13)]);
    }

    #[tokio::test]
    async fn test_existing_destination_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.tar.gz");
        std::fs::write(&dest, b"cached").unwrap();

        HttpDownloader::new()
            .get("https://invalid.example/a.tar.gz", &dest, &|_, _| {})
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_missing_local_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = HttpDownloader::new()
            .get(
                &dir.path().join("nope.tar.gz").display().to_string(),
                &dir.path().join("out.tar.gz"),
                &|_, _| {},
            )
            .await;

        assert!(result.is_err());
    }
}
