// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! External process execution
//!
//! Stages never spawn processes themselves: they describe an
//! [`Invocation`] and hand it to a [`CommandRunner`].

mod system;

pub use system::SystemRunner;

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A program to run, with its arguments, directory and extra environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Variables set on top of the inherited environment
    pub env: Vec<(String, OsString)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, working_dir: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.as_ref().to_path_buf(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program and arguments as a single line, for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Why a process did not succeed
///
/// A program that cannot be started is reported the same way as one that
/// exits with an error: both are failures of the invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessFailure {
    #[error("failed to start '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("'{program}' exited with {}", exit_description(*code))]
    Exit { program: String, code: Option<i32> },
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Runs external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion
    async fn run(&self, invocation: &Invocation) -> Result<(), ProcessFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let inv = Invocation::new("make", "/tmp")
            .arg("-j4")
            .args(["all"])
            .env("PATH", "/usr/bin");
        assert_eq!(inv.command_line(), "make -j4 all");
        assert_eq!(inv.env, vec![("PATH".to_string(), OsString::from("/usr/bin"))]);
    }

    #[test]
    fn test_failure_messages() {
        let spawn = ProcessFailure::Spawn {
            program: "cmake".into(),
            reason: "No such file or directory".into(),
        };
        assert!(spawn.to_string().contains("failed to start 'cmake'"));

        let exit = ProcessFailure::Exit {
            program: "make".into(),
            code: Some(2),
        };
        assert_eq!(exit.to_string(), "'make' exited with code 2");
    }
}
