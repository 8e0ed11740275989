// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Path guard
//!
//! Temporarily removes search path entries and puts them back afterwards.
//! Each removal is recorded against the layout it was made on, so putting
//! the entries back in reverse order restores the original value exactly.

use std::ffi::{OsStr, OsString};
use tracing::{debug, warn};

use super::SearchPath;

/// One removed search path entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRecord {
    /// Index the entry had when it was removed
    pub index: usize,
    /// The removed entry
    pub value: OsString,
}

/// Remove every entry matching `predicate`, first match first
///
/// Returns the removals in the order they were made. An empty list means
/// nothing matched and `path` is unchanged.
pub fn scan_and_strip<P>(path: &mut SearchPath, predicate: P) -> Vec<PathRecord>
where
    P: Fn(&OsStr) -> bool,
{
    let mut records = Vec::new();

    while let Some(index) = path.position(&predicate) {
        let value = path.remove(index);
        debug!("Removed search path entry {:?} at index {}", value, index);
        records.push(PathRecord { index, value });
    }

    records
}

/// Re-insert removed entries, last removal first
pub fn restore(path: &mut SearchPath, records: Vec<PathRecord>) {
    for record in records.into_iter().rev() {
        debug!(
            "Restoring search path entry {:?} at index {}",
            record.value, record.index
        );
        path.insert(record.index, record.value);
    }
}

/// The search path of one build run, plus the removals made during it
///
/// Stripping happens at most once per run and restoring exactly once; both
/// are enforced here so stages can request a strip without coordinating.
#[derive(Debug)]
pub struct PathGuard {
    path: SearchPath,
    records: Vec<PathRecord>,
    stripped: bool,
    restored: bool,
}

impl PathGuard {
    pub fn new(path: SearchPath) -> Self {
        Self {
            path,
            records: Vec::new(),
            stripped: false,
            restored: false,
        }
    }

    /// The search path as the run currently sees it
    pub fn path(&self) -> &SearchPath {
        &self.path
    }

    /// Removals recorded so far
    pub fn records(&self) -> &[PathRecord] {
        &self.records
    }

    pub fn is_stripped(&self) -> bool {
        self.stripped
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    /// Strip entries matching `predicate`
    ///
    /// Only the first call has an effect; later calls return the records of
    /// the first one.
    pub fn strip<P>(&mut self, predicate: P) -> &[PathRecord]
    where
        P: Fn(&OsStr) -> bool,
    {
        if self.stripped {
            warn!("Search path was already stripped for this run, ignoring");
            return &self.records;
        }

        self.stripped = true;
        self.records = scan_and_strip(&mut self.path, predicate);
        &self.records
    }

    /// Put every removed entry back
    ///
    /// Returns how many entries were restored. Calling this a second time
    /// restores nothing.
    pub fn restore(&mut self) -> usize {
        if self.restored {
            return 0;
        }

        self.restored = true;
        let records = std::mem::take(&mut self.records);
        let count = records.len();
        restore(&mut self.path, records);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_sh(entry: &OsStr) -> bool {
        entry.to_string_lossy().contains("msys")
    }

    #[test]
    fn test_round_trip_restores_original() {
        let original = SearchPath::parse(
            r"C:\msys\bin;C:\mingw\bin;C:\msys\usr\bin;C:\Windows;C:\msys\local",
            ';',
        );
        let mut path = original.clone();

        let records = scan_and_strip(&mut path, has_sh);
        assert_eq!(records.len(), 3);
        assert_eq!(path.to_value(), r"C:\mingw\bin;C:\Windows");

        restore(&mut path, records);
        assert_eq!(path, original);
    }

    #[test]
    fn test_records_use_layout_at_removal_time() {
        let mut path = SearchPath::parse("a:x1:x2:b", ':');
        let records = scan_and_strip(&mut path, |e| e.to_string_lossy().starts_with('x'));

        assert_eq!(
            records,
            vec![
                PathRecord { index: 1, value: "x1".into() },
                PathRecord { index: 1, value: "x2".into() },
            ]
        );
    }

    #[test]
    fn test_no_match_is_identity() {
        let original = SearchPath::parse("/usr/bin:/bin", ':');
        let mut path = original.clone();

        let records = scan_and_strip(&mut path, |e| e == "/nowhere");
        assert!(records.is_empty());

        restore(&mut path, records);
        assert_eq!(path, original);
    }

    #[test]
    fn test_round_trip_every_entry_matches() {
        let original = SearchPath::parse("x:x:x", ':');
        let mut path = original.clone();

        let records = scan_and_strip(&mut path, |e| e == "x");
        assert!(path.is_empty());

        restore(&mut path, records);
        assert_eq!(path, original);
    }

    #[test]
    fn test_guard_strips_once_and_restores_once() {
        let mut guard = PathGuard::new(SearchPath::parse("a:sh:b:sh", ':'));

        assert_eq!(guard.strip(|e| e == "sh").len(), 2);
        assert_eq!(guard.path().to_value(), "a:b");

        // A second strip does not touch the path again
        assert_eq!(guard.strip(|e| e == "a").len(), 2);
        assert_eq!(guard.path().to_value(), "a:b");

        assert_eq!(guard.restore(), 2);
        assert_eq!(guard.path().to_value(), "a:sh:b:sh");
        assert!(guard.records().is_empty());

        assert_eq!(guard.restore(), 0);
        assert_eq!(guard.path().to_value(), "a:sh:b:sh");
    }

    #[test]
    fn test_guard_restore_without_strip() {
        let mut guard = PathGuard::new(SearchPath::parse("a:b", ':'));
        assert_eq!(guard.restore(), 0);
        assert!(guard.is_restored());
        assert!(!guard.is_stripped());
    }
}
