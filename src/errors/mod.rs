// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Error types for build runs
//!
//! Every stage failure is a distinct, named variant so callers can tell a
//! broken download from a broken patch without parsing messages.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for buildflow operations
pub type BuildflowResult<T> = Result<T, BuildflowError>;

/// Main error type for buildflow
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum BuildflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Graph Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Circular dependency detected between tasks: {}", tasks.join(" -> "))]
    #[diagnostic(
        code(buildflow::circular_dependency),
        help("Review the task dependencies to remove the cycle")
    )]
    CircularDependency { tasks: Vec<String> },

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    #[diagnostic(
        code(buildflow::unknown_dependency),
        help("Check that '{dependency}' is declared in the same graph")
    )]
    UnknownDependency { task: String, dependency: String },

    #[error("Task '{task}' is declared more than once")]
    #[diagnostic(code(buildflow::duplicate_task))]
    DuplicateTask { task: String },

    #[error("Task '{task}' expected a result from '{dependency}' which is not available")]
    #[diagnostic(code(buildflow::missing_task_result))]
    MissingTaskResult { task: String, dependency: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Stage Failures
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Download failed for '{uri}': {reason}")]
    #[diagnostic(code(buildflow::download_failed))]
    DownloadFailed { uri: String, reason: String },

    #[error("Extraction failed for '{}': {reason}", archive.display())]
    #[diagnostic(code(buildflow::extract_failed))]
    ExtractFailed { archive: PathBuf, reason: String },

    #[error("Patch '{file}' failed to apply: {reason}")]
    #[diagnostic(code(buildflow::patch_failed))]
    PatchFailed { file: String, reason: String },

    #[error("Bootstrap failed: {reason}")]
    #[diagnostic(code(buildflow::bootstrap_failed))]
    BootstrapFailed { reason: String },

    #[error("Configure failed: {reason}")]
    #[diagnostic(code(buildflow::configure_failed))]
    ConfigureFailed { reason: String },

    #[error("Build failed on target '{target}': {reason}")]
    #[diagnostic(code(buildflow::compile_failed))]
    CompileFailed { target: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Build configuration not found: {}", path.display())]
    #[diagnostic(
        code(buildflow::config_not_found),
        help("Create one with 'buildflow init' or write .buildflow.yaml manually")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid build configuration: {reason}")]
    #[diagnostic(code(buildflow::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to read file '{}': {error}", path.display())]
    #[diagnostic(code(buildflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{}': {error}", path.display())]
    #[diagnostic(code(buildflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Tool Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Tool '{tool}' not found")]
    #[diagnostic(code(buildflow::tool_not_found), help("{suggestion}"))]
    ToolNotFound { tool: String, suggestion: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(buildflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(buildflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(buildflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(buildflow::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(buildflow::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for BuildflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for BuildflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for BuildflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for BuildflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for BuildflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl BuildflowError {
    /// Create a tool not found error with installation suggestion
    pub fn tool_not_found(tool: &str) -> Self {
        let suggestion = RecoverySuggestion::install_tool(tool).action;

        Self::ToolNotFound {
            tool: tool.to_string(),
            suggestion,
        }
    }

    /// Name of the pipeline stage this error belongs to, if it is a stage failure
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::DownloadFailed { .. } => Some("fetch"),
            Self::ExtractFailed { .. } => Some("extract"),
            Self::PatchFailed { .. } => Some("patch"),
            Self::BootstrapFailed { .. } => Some("bootstrap"),
            Self::ConfigureFailed { .. } => Some("configure"),
            Self::CompileFailed { .. } => Some("compile"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let err = BuildflowError::PatchFailed {
            file: "001-fix.patch".into(),
            reason: "hunk failed".into(),
        };
        assert_eq!(err.stage(), Some("patch"));
        assert!(err.to_string().contains("001-fix.patch"));

        let err = BuildflowError::CompileFailed {
            target: "install".into(),
            reason: "exit code 2".into(),
        };
        assert_eq!(err.stage(), Some("compile"));
        assert!(err.to_string().starts_with("Build failed"));
    }

    #[test]
    fn test_graph_errors() {
        let err = BuildflowError::CircularDependency {
            tasks: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(err.to_string().contains("a -> b -> a"));
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_tool_not_found_has_suggestion() {
        let err = BuildflowError::tool_not_found("make");
        match err {
            BuildflowError::ToolNotFound { suggestion, .. } => {
                assert!(suggestion.contains("make"));
            }
            _ => panic!("Expected ToolNotFound"),
        }
    }
}
