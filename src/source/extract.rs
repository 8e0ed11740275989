// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Archive extraction
//!
//! Handles `.tar.gz`, `.tgz` and plain `.tar` archives. Unpacking runs on
//! the blocking pool; progress (compressed bytes consumed) is relayed back
//! over a channel.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{Extractor, ProgressFn};

/// Supported archive layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    TarGz,
    Tar,
}

impl ArchiveFormat {
    fn detect(archive: &Path) -> Option<Self> {
        let name = archive.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Extracts tar archives with `tar` and `flate2`
#[derive(Debug, Default)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for ArchiveExtractor {
    async fn extract(&self, archive: &Path, out_dir: &Path, progress: &ProgressFn<'_>) -> Result<()> {
        let Some(format) = ArchiveFormat::detect(archive) else {
            bail!("Unsupported archive format: {}", archive.display());
        };

        info!("Extracting {} to {}", archive.display(), out_dir.display());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let archive = archive.to_path_buf();
        let out_dir = out_dir.to_path_buf();

        let handle = tokio::task::spawn_blocking(move || {
            extract_blocking(&archive, &out_dir, format, |current, total| {
                let _ = tx.send((current, total));
            })
        });

        while let Some((current, total)) = rx.recv().await {
            progress(current, total);
        }

        handle.await.context("Extraction task panicked")?
    }
}

fn extract_blocking<F>(archive: &Path, out_dir: &Path, format: ArchiveFormat, report: F) -> Result<()>
where
    F: Fn(u64, u64),
{
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create directory: {}", out_dir.display()))?;

    let file =
        File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);

    let counting = CountingReader::new(BufReader::new(file));
    let consumed = counting.counter();

    let reader: Box<dyn Read> = match format {
        ArchiveFormat::TarGz => Box::new(flate2::read::GzDecoder::new(counting)),
        ArchiveFormat::Tar => Box::new(counting),
    };

    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.set_overwrite(true);

    let mut entries = 0usize;
    for entry in tar
        .entries()
        .with_context(|| format!("Failed to read {}", archive.display()))?
    {
        let mut entry = entry.context("Corrupt archive entry")?;
        let path: PathBuf = entry.path().map(|p| p.into_owned()).unwrap_or_default();

        // unpack_in refuses entries that would land outside out_dir
        let unpacked = entry
            .unpack_in(out_dir)
            .with_context(|| format!("Failed to unpack {}", path.display()))?;
        if !unpacked {
            warn!("Skipping unsafe path in archive: {}", path.display());
            continue;
        }

        entries += 1;
        report(consumed.get(), total);
    }

    report(total, total);
    debug!("Unpacked {} entries", entries);
    Ok(())
}

/// Reader that counts the bytes pulled through it
struct CountingReader<R> {
    inner: R,
    count: std::rc::Rc<std::cell::Cell<u64>>,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            count: Default::default(),
        }
    }

    fn counter(&self) -> std::rc::Rc<std::cell::Cell<u64>> {
        self.count.clone()
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.set(self.count.get() + n as u64);
        Ok(n)
    }
}
