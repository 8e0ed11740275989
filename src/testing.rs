// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! In-memory collaborators for unit tests

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::pipeline::definition::strip_archive_suffix;
use crate::process::{CommandRunner, Invocation, ProcessFailure};
use crate::sink::{Level, LogSink};
use crate::source::{Downloader, Extractor, Patcher, ProgressFn};

/// Sink that keeps every message
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(Level, String)>>,
    progress: Mutex<Vec<(String, u64, u64)>>,
}

impl MemorySink {
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn progress_labels(&self) -> Vec<String> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .map(|(label, _, _)| label.clone())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        self.messages.lock().unwrap().push((level, message.to_string()));
    }

    fn progress(&self, label: &str, current: u64, total: u64) {
        self.progress
            .lock()
            .unwrap()
            .push((label.to_string(), current, total));
    }
}

/// Runner that records invocations instead of spawning anything
///
/// Invocations whose command line contains one of the `fail_on` needles
/// exit with code 2.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    fail_on: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.fail_on.push(needle.to_string());
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.invocations().iter().map(Invocation::command_line).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<(), ProcessFailure> {
        self.calls.lock().unwrap().push(invocation.clone());

        let line = invocation.command_line();
        if self.fail_on.iter().any(|needle| line.contains(needle)) {
            return Err(ProcessFailure::Exit {
                program: invocation.program.clone(),
                code: Some(2),
            });
        }
        Ok(())
    }
}

/// Downloader that writes a small placeholder archive
#[derive(Default)]
pub struct FakeDownloader {
    pub fail: bool,
    pub requests: Mutex<Vec<String>>,
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn get(&self, uri: &str, dest: &Path, progress: &ProgressFn<'_>) -> Result<()> {
        self.requests.lock().unwrap().push(uri.to_string());
        if self.fail {
            bail!("connection refused");
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, b"archive")?;
        progress(7, 7);
        Ok(())
    }
}

/// Extractor that creates the expected source directory with a bootstrap
/// script in it
#[derive(Default)]
pub struct FakeExtractor {
    pub fail: bool,
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, archive: &Path, out_dir: &Path, progress: &ProgressFn<'_>) -> Result<()> {
        if self.fail {
            bail!("unexpected end of archive");
        }
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let root = out_dir.join(strip_archive_suffix(&name));
        std::fs::create_dir_all(&root)?;
        std::fs::write(root.join("bootstrap"), b"#!/bin/sh\n")?;
        progress(1, 1);
        Ok(())
    }
}

/// Patcher that records the patches it was asked to apply
#[derive(Default)]
pub struct RecordingPatcher {
    pub fail_on: Option<String>,
    pub applied: Mutex<Vec<PathBuf>>,
}

impl RecordingPatcher {
    pub fn applied_names(&self) -> Vec<String> {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect()
    }
}

#[async_trait]
impl Patcher for RecordingPatcher {
    async fn apply(&self, _source_dir: &Path, patch_file: &Path, _strip: u32) -> Result<()> {
        self.applied.lock().unwrap().push(patch_file.to_path_buf());
        let name = patch_file.file_name().unwrap_or_default().to_string_lossy();
        if self.fail_on.as_deref() == Some(name.as_ref()) {
            bail!("hunk #1 FAILED");
        }
        Ok(())
    }
}
