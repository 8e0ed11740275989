// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::Patcher;
use crate::process::{CommandRunner, Invocation};

/// Applies patches with the host `patch` program
pub struct CommandPatcher {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl CommandPatcher {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            program: "patch".to_string(),
        }
    }

    /// Use a different patch binary, e.g. `gpatch`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn invocation(&self, source_dir: &Path, patch_file: &Path, strip: u32) -> Invocation {
        Invocation::new(&self.program, source_dir)
            .arg(format!("-p{}", strip))
            .arg("--forward")
            .arg("--batch")
            .arg("-i")
            .arg(patch_file.display().to_string())
    }
}

#[async_trait]
impl Patcher for CommandPatcher {
    async fn apply(&self, source_dir: &Path, patch_file: &Path, strip: u32) -> Result<()> {
        let invocation = self.invocation(source_dir, patch_file, strip);
        self.runner
            .run(&invocation)
            .await
            .with_context(|| format!("Failed to apply {}", patch_file.display()))
    }
}
