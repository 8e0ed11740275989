// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Process runner backed by `tokio::process`
//!
//! Output is forwarded line by line while the program runs: standard output
//! at info level, standard error at warning level.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CommandRunner, Invocation, ProcessFailure};
use crate::sink::{Level, LogSink};

/// Runs programs on the host
pub struct SystemRunner {
    sink: Arc<dyn LogSink>,
}

impl SystemRunner {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<(), ProcessFailure> {
        debug!(
            "Running '{}' in {}",
            invocation.command_line(),
            invocation.working_dir.display()
        );

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| ProcessFailure::Spawn {
            program: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (status, _, _) = tokio::join!(
            child.wait(),
            forward_lines(stdout, self.sink.as_ref(), Level::Info),
            forward_lines(stderr, self.sink.as_ref(), Level::Warning),
        );

        let status = status.map_err(|e| ProcessFailure::Spawn {
            program: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ProcessFailure::Exit {
                program: invocation.program.clone(),
                code: status.code(),
            })
        }
    }
}

/// Send every line of `reader` to `sink`
///
/// Invalid UTF-8 is replaced rather than aborting the stream.
async fn forward_lines<R>(reader: Option<R>, sink: &dyn LogSink, level: Level)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                sink.log(level, line.trim_end_matches(['\r', '\n']));
            }
            Err(e) => {
                // The child must never block on a full pipe
                warn!("Stopped forwarding output: {}", e);
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    debug!("Discarding output failed: {}", e);
                }
                break;
            }
        }
    }
}
