// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Build pipeline
//!
//! Wires the stages into a task graph and runs it. Whatever happens, the
//! run ends with the search path restored and exactly one completion event
//! published.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::context::{BuildContext, Services};
use super::definition::{BuildConfig, BuildPaths};
use super::stages::{self, StageOutput, BOOTSTRAP, COMPILE, CONFIGURE, EXTRACT, FETCH, PATCH, PREPARE, STAGES};
use crate::env::{PathGuard, SearchPath};
use crate::errors::{BuildflowError, BuildflowResult};
use crate::events::{completion_topic, CompletionEvent, EventBus};
use crate::graph::{Finalizer, GraphExecutor, GraphOutcome, Task, TaskFailure, TaskGraph};
use crate::platform::PlatformDescriptor;
use crate::sink::LogSink;

/// A configured build, ready to run
pub struct BuildPipeline {
    config: Arc<BuildConfig>,
    paths: Arc<BuildPaths>,
    platform: Arc<PlatformDescriptor>,
    services: Services,
    search_path: SearchPath,
}

impl BuildPipeline {
    pub fn new(
        config: BuildConfig,
        paths: BuildPaths,
        platform: PlatformDescriptor,
        services: Services,
    ) -> Self {
        Self {
            config: Arc::new(config),
            paths: Arc::new(paths),
            platform: Arc::new(platform),
            services,
            search_path: SearchPath::from_env(),
        }
    }

    /// Use `path` instead of the process `PATH` as the run's search path
    pub fn with_search_path(mut self, path: SearchPath) -> Self {
        self.search_path = path;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn paths(&self) -> &BuildPaths {
        &self.paths
    }

    pub fn platform(&self) -> &PlatformDescriptor {
        &self.platform
    }

    fn context(&self) -> BuildContext {
        BuildContext {
            config: self.config.clone(),
            paths: self.paths.clone(),
            platform: self.platform.clone(),
            services: self.services.clone(),
            search_path: Arc::new(Mutex::new(PathGuard::new(self.search_path.clone()))),
        }
    }

    /// The stage graph, for display
    pub fn graph(&self) -> BuildflowResult<TaskGraph<StageOutput, BuildflowError>> {
        stage_graph(&self.context())
    }

    /// Run every stage, then restore the search path and publish the
    /// completion event
    pub async fn run(&self) -> BuildReport {
        let invocation = Uuid::new_v4().to_string();
        let topic = completion_topic(&self.config.name, &invocation);
        let ctx = self.context();

        let finalizer = Arc::new(RunFinalizer {
            search_path: ctx.search_path.clone(),
            sink: self.services.sink.clone(),
            bus: self.services.bus.clone(),
            topic: topic.clone(),
            invocation: invocation.clone(),
        });

        info!(
            invocation = %invocation,
            "Building {} {} ({}, {} jobs)",
            self.config.name,
            self.config.version,
            self.platform.family,
            self.platform.jobs
        );

        let outcome = match stage_graph(&ctx) {
            Ok(graph) => {
                GraphExecutor::<StageOutput, BuildflowError>::new()
                    .with_finalizer(finalizer)
                    .execute(graph)
                    .await
            }
            Err(error) => {
                let outcome = GraphOutcome {
                    results: HashMap::new(),
                    failure: Some(TaskFailure {
                        task: "graph".to_string(),
                        error,
                    }),
                    not_run: STAGES.iter().map(|s| s.to_string()).collect(),
                    duration: Duration::ZERO,
                };
                finalizer.finalize(&outcome).await;
                outcome
            }
        };

        let search_path = ctx.search_path.lock().await.path().clone();

        BuildReport {
            invocation,
            topic,
            results: outcome.results,
            failure: outcome.failure,
            not_run: outcome.not_run,
            duration: outcome.duration,
            search_path,
        }
    }
}

/// The seven build stages and their dependencies
fn stage_graph(ctx: &BuildContext) -> BuildflowResult<TaskGraph<StageOutput, BuildflowError>> {
    let (c1, c2, c3, c4, c5, c6, c7) = (
        ctx.clone(),
        ctx.clone(),
        ctx.clone(),
        ctx.clone(),
        ctx.clone(),
        ctx.clone(),
        ctx.clone(),
    );

    TaskGraph::builder()
        .task(
            Task::new(FETCH, &[], move |_| stages::fetch(c1))
                .with_description("Download the source archive"),
        )
        .task(
            Task::new(EXTRACT, &[FETCH], move |r| stages::extract(c2, r))
                .with_description("Unpack the archive"),
        )
        .task(
            Task::new(PATCH, &[EXTRACT], move |r| stages::patch(c3, r))
                .with_description("Apply patches"),
        )
        .task(
            Task::new(PREPARE, &[PATCH], move |_| stages::prepare(c4))
                .with_description("Choose bootstrap or configure"),
        )
        .task(
            Task::new(BOOTSTRAP, &[PREPARE], move |r| stages::bootstrap(c5, r))
                .with_description("Run the bootstrap script"),
        )
        .task(
            Task::new(CONFIGURE, &[PREPARE], move |r| stages::configure(c6, r))
                .with_description("Generate build files"),
        )
        .task(
            Task::new(COMPILE, &[BOOTSTRAP, CONFIGURE], move |r| stages::compile(c7, r))
                .with_description("Build and install"),
        )
        .build()
}

/// Restores the search path, reports the failure and publishes the
/// completion event
struct RunFinalizer {
    search_path: Arc<Mutex<PathGuard>>,
    sink: Arc<dyn LogSink>,
    bus: Arc<dyn EventBus>,
    topic: String,
    invocation: String,
}

#[async_trait]
impl Finalizer<StageOutput, BuildflowError> for RunFinalizer {
    async fn finalize(&self, outcome: &GraphOutcome<StageOutput, BuildflowError>) {
        let restored = self.search_path.lock().await.restore();
        if restored > 0 {
            self.sink
                .verbose(&format!("restored {} search path entries", restored));
        }

        if let Some(ref failure) = outcome.failure {
            self.sink
                .error(&format!("{} failed: {}", failure.task, failure.error));
        }

        self.bus.send(CompletionEvent {
            topic: self.topic.clone(),
            invocation: self.invocation.clone(),
            succeeded: outcome.is_success(),
            failed_stage: outcome.failure.as_ref().map(|f| f.task.clone()),
            error: outcome.failure.as_ref().map(|f| f.error.to_string()),
        });
    }
}

/// What a build run did
#[derive(Debug)]
pub struct BuildReport {
    pub invocation: String,
    /// Topic the completion event was published on
    pub topic: String,
    pub results: HashMap<String, StageOutput>,
    pub failure: Option<TaskFailure<BuildflowError>>,
    /// Stages that never started
    pub not_run: Vec<String>,
    pub duration: Duration,
    /// The run's search path after restoration
    pub search_path: SearchPath,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Install prefix on success, the first failure otherwise
    pub fn into_result(self) -> BuildflowResult<PathBuf> {
        if let Some(failure) = self.failure {
            return Err(failure.error);
        }

        self.results
            .get(COMPILE)
            .and_then(StageOutput::path)
            .map(PathBuf::from)
            .ok_or_else(|| BuildflowError::MissingTaskResult {
                task: "build".to_string(),
                dependency: COMPILE.to_string(),
            })
    }
}
