// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

use std::ffi::OsString;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::definition::{BuildConfig, BuildPaths};
use crate::env::PathGuard;
use crate::events::{EventBus, TracingBus};
use crate::platform::PlatformDescriptor;
use crate::process::{CommandRunner, SystemRunner};
use crate::sink::LogSink;
use crate::source::{ArchiveExtractor, CommandPatcher, Downloader, Extractor, HttpDownloader, Patcher};

/// External collaborators used by the stages
#[derive(Clone)]
pub struct Services {
    pub runner: Arc<dyn CommandRunner>,
    pub downloader: Arc<dyn Downloader>,
    pub extractor: Arc<dyn Extractor>,
    pub patcher: Arc<dyn Patcher>,
    pub sink: Arc<dyn LogSink>,
    pub bus: Arc<dyn EventBus>,
}

impl Services {
    /// Collaborators that talk to the network, the filesystem and the host
    /// toolchain
    pub fn system(sink: Arc<dyn LogSink>) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(sink.clone()));

        Self {
            patcher: Arc::new(CommandPatcher::new(runner.clone())),
            runner,
            downloader: Arc::new(HttpDownloader::new()),
            extractor: Arc::new(ArchiveExtractor::new()),
            sink,
            bus: Arc::new(TracingBus),
        }
    }
}

/// State shared by the stages of one run
#[derive(Clone)]
pub struct BuildContext {
    pub config: Arc<BuildConfig>,
    pub paths: Arc<BuildPaths>,
    pub platform: Arc<PlatformDescriptor>,
    pub services: Services,
    /// The run's own search path; only the configure stage strips it and
    /// only the run finalizer restores it
    pub search_path: Arc<Mutex<PathGuard>>,
}

impl BuildContext {
    /// Current value of the run's search path
    pub async fn path_value(&self) -> OsString {
        self.search_path.lock().await.path().to_value()
    }
}
