// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Progress indicators
//!
//! Provides progress bars for downloads and extraction, and a line based
//! stage tracker for the build summary.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar for determinate progress
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb.set_message(message.to_string());
    pb
}

/// Outcome of a stage as shown in the build summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMark {
    Done,
    Skipped,
    Failed,
    NotRun,
}

/// Tracks which stages of a run completed, for the final summary
pub struct StageProgress {
    stages: Vec<(String, StageMark)>,
}

impl StageProgress {
    pub fn new(stages: Vec<String>) -> Self {
        Self {
            stages: stages.into_iter().map(|s| (s, StageMark::NotRun)).collect(),
        }
    }

    pub fn mark(&mut self, stage: &str, mark: StageMark) {
        if let Some(entry) = self.stages.iter_mut().find(|(name, _)| name == stage) {
            entry.1 = mark;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stages
            .iter()
            .all(|(_, mark)| matches!(mark, StageMark::Done | StageMark::Skipped))
    }

    /// Print one line per stage
    pub fn print(&self) {
        use colored::Colorize;

        for (stage, mark) in &self.stages {
            match mark {
                StageMark::Done => println!("  {} {}", "✓".green(), stage.bold()),
                StageMark::Skipped => {
                    println!("  {} {} (skipped)", "○".dimmed(), stage.dimmed())
                }
                StageMark::Failed => println!("  {} {} failed", "✗".red(), stage.bold()),
                StageMark::NotRun => println!("  {} {}", "·".dimmed(), stage.dimmed()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_progress() {
        let mut progress = StageProgress::new(vec!["fetch".to_string(), "extract".to_string()]);

        assert!(!progress.is_complete());
        progress.mark("fetch", StageMark::Done);
        assert!(!progress.is_complete());
        progress.mark("extract", StageMark::Skipped);
        assert!(progress.is_complete());
        progress.mark("extract", StageMark::Failed);
        assert!(!progress.is_complete());
    }
}
