// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from a failed build.

use super::BuildflowError;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest installing a missing tool
    pub fn install_tool(tool: &str) -> Self {
        match tool {
            "make" => Self {
                action: "Install make".into(),
                steps: vec!["GNU make drives the compile and install targets".into()],
                commands: vec![
                    "# Debian/Ubuntu:".into(),
                    "sudo apt install build-essential".into(),
                    "".into(),
                    "# macOS:".into(),
                    "xcode-select --install".into(),
                ],
            },
            "mingw32-make" => Self {
                action: "Install mingw32-make".into(),
                steps: vec![
                    "The MinGW toolchain provides the native build tool on Windows".into(),
                    "Make sure its bin directory is in PATH".into(),
                ],
                commands: vec![
                    "# Using MSYS2:".into(),
                    "pacman -S mingw-w64-x86_64-make".into(),
                ],
            },
            "cmake" => Self {
                action: "Install cmake or use the bootstrap strategy".into(),
                steps: vec![
                    "The configure strategy needs an existing cmake".into(),
                    "Set 'strategy: bootstrap' to build without one".into(),
                ],
                commands: vec!["buildflow build --strategy bootstrap".into()],
            },
            "sh" => Self {
                action: "Install a POSIX shell (sh)".into(),
                steps: vec!["The bootstrap script is run with sh".into()],
                commands: vec![],
            },
            "patch" => Self {
                action: "Install patch".into(),
                steps: vec!["Source patches are applied with the patch utility".into()],
                commands: vec![
                    "# Debian/Ubuntu:".into(),
                    "sudo apt install patch".into(),
                ],
            },
            _ => Self {
                action: format!("Install {}", tool),
                steps: vec![format!("Install {} and ensure it's in your PATH", tool)],
                commands: vec![],
            },
        }
    }

    /// Suggest fixing a circular dependency
    pub fn fix_circular_dependency(tasks: &[String]) -> Self {
        Self {
            action: "Remove circular dependency".into(),
            steps: vec![
                format!("Detected cycle: {}", tasks.join(" → ")),
                "Tasks must form a directed acyclic graph (DAG)".into(),
            ],
            commands: vec![
                "# Visualize the stage graph:".into(),
                "buildflow graph --format mermaid".into(),
            ],
        }
    }

    /// Suggest creating a build configuration
    pub fn create_config() -> Self {
        Self {
            action: "Create a build configuration".into(),
            steps: vec![
                "No .buildflow.yaml found in current directory".into(),
                "Write the defaults and edit the source URI and version".into(),
            ],
            commands: vec!["buildflow init".into()],
        }
    }

    /// Suggest what to do after a stage failure
    pub fn for_error(error: &BuildflowError) -> Option<Self> {
        match error {
            BuildflowError::DownloadFailed { uri, .. } => Some(Self {
                action: "Check the source archive URI".into(),
                steps: vec![
                    format!("Could not download {}", uri),
                    "A partial download is left in the temp root; remove it before retrying".into(),
                ],
                commands: vec![],
            }),
            BuildflowError::ExtractFailed { archive, .. } => Some(Self {
                action: "Remove the damaged archive and retry".into(),
                steps: vec![format!("Archive: {}", archive.display())],
                commands: vec![format!("rm {}", archive.display())],
            }),
            BuildflowError::PatchFailed { file, .. } => Some(Self {
                action: format!("Refresh patch '{}'", file),
                steps: vec![
                    "The patch no longer applies to this source version".into(),
                    "Rebase it or remove it from the patch directory".into(),
                ],
                commands: vec![],
            }),
            BuildflowError::CircularDependency { tasks } => {
                Some(Self::fix_circular_dependency(tasks))
            }
            BuildflowError::ConfigNotFound { .. } => Some(Self::create_config()),
            BuildflowError::ToolNotFound { tool, .. } => Some(Self::install_tool(tool)),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_failure_suggestion() {
        let err = BuildflowError::PatchFailed {
            file: "lin-cmake.patch".into(),
            reason: "exit code 1".into(),
        };
        let suggestion = RecoverySuggestion::for_error(&err).unwrap();
        assert!(suggestion.action.contains("lin-cmake.patch"));
    }

    #[test]
    fn test_no_suggestion_for_io() {
        let err = BuildflowError::Io { message: "boom".into() };
        assert!(RecoverySuggestion::for_error(&err).is_none());
    }

    #[test]
    fn test_display_lists_commands() {
        let text = RecoverySuggestion::install_tool("cmake").to_string();
        assert!(text.starts_with("→ Install cmake"));
        assert!(text.contains("buildflow build --strategy bootstrap"));
    }
}
