// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Leveled log sink
//!
//! Stages and the process runner report through a [`LogSink`] instead of
//! writing to the terminal directly, so hosts can route build output
//! wherever they like.

use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::ProgressBar;

use crate::utils::create_progress_bar;

/// Severity of a sink message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Info,
    Verbose,
    Warning,
    Error,
}

/// Destination for build output
pub trait LogSink: Send + Sync {
    /// Record a message at the given level
    fn log(&self, level: Level, message: &str);

    /// Report progress of a long running step
    fn progress(&self, label: &str, current: u64, total: u64);

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn verbose(&self, message: &str) {
        self.log(Level::Verbose, message);
    }

    fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Sink backed by `tracing`, with `indicatif` bars for progress
#[derive(Default)]
pub struct TracingSink {
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Info => tracing::info!("{}", message),
            Level::Verbose => tracing::debug!("{}", message),
            Level::Warning => tracing::warn!("{}", message),
            Level::Error => tracing::error!("{}", message),
        }
    }

    fn progress(&self, label: &str, current: u64, total: u64) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };

        let bar = bars
            .entry(label.to_string())
            .or_insert_with(|| create_progress_bar(total, label));

        if bar.length() != Some(total) {
            bar.set_length(total);
        }
        bar.set_position(current);

        if total > 0 && current >= total {
            bar.finish_and_clear();
            bars.remove(label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_removed_when_done() {
        let sink = TracingSink::new();
        sink.progress("download", 10, 100);
        assert_eq!(sink.bars.lock().unwrap().len(), 1);

        sink.progress("download", 100, 100);
        assert!(sink.bars.lock().unwrap().is_empty());
    }
}
