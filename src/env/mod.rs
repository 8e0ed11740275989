// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Search path handling
//!
//! A build run owns its own copy of the `PATH` value ([`SearchPath`]).
//! Subprocesses receive it explicitly, so stripping entries to work around
//! a shadowing toolchain never touches the process-wide environment.

mod path_guard;

pub use path_guard::{restore, scan_and_strip, PathGuard, PathRecord};

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// Name of the search path variable
pub const PATH_VAR: &str = "PATH";

/// Separator between search path entries on the host
#[inline]
pub fn path_separator() -> char {
    #[cfg(windows)]
    {
        ';'
    }
    #[cfg(not(windows))]
    {
        ':'
    }
}

/// An ordered list of search path entries
///
/// Entries are kept as `OsString` so a host value that is not valid UTF-8
/// survives a strip and restore unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    entries: Vec<OsString>,
    separator: char,
}

impl SearchPath {
    /// Split a raw variable value into entries
    ///
    /// Empty entries are kept so that joining gives back the same string.
    pub fn parse(value: &str, separator: char) -> Self {
        let entries = if value.is_empty() {
            Vec::new()
        } else {
            value.split(separator).map(OsString::from).collect()
        };

        Self { entries, separator }
    }

    /// Split a host value with the platform rules of [`std::env::split_paths`]
    pub fn from_os(value: &OsStr) -> Self {
        let entries = if value.is_empty() {
            Vec::new()
        } else {
            std::env::split_paths(value)
                .map(PathBuf::into_os_string)
                .collect()
        };

        Self {
            entries,
            separator: path_separator(),
        }
    }

    /// Snapshot the current process value of `PATH`
    pub fn from_env() -> Self {
        match std::env::var_os(PATH_VAR) {
            Some(value) => Self::from_os(&value),
            None => Self::parse("", path_separator()),
        }
    }

    pub fn entries(&self) -> &[OsString] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the first entry matching `predicate`
    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: Fn(&OsStr) -> bool,
    {
        self.entries.iter().position(|e| predicate(e.as_os_str()))
    }

    pub(crate) fn remove(&mut self, index: usize) -> OsString {
        self.entries.remove(index)
    }

    pub(crate) fn insert(&mut self, index: usize, entry: OsString) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
    }

    /// Join the entries back into a variable value
    ///
    /// Entries are joined verbatim: [`std::env::join_paths`] rejects entries
    /// that contain the separator, which would break the round trip.
    pub fn to_value(&self) -> OsString {
        let mut sep = [0u8; 4];
        let sep: &str = self.separator.encode_utf8(&mut sep);

        let mut value = OsString::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                value.push(sep);
            }
            value.push(entry);
        }
        value
    }
}

impl std::fmt::Display for SearchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value().to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_join() {
        let path = SearchPath::parse("/usr/bin:/bin::/opt/bin", ':');
        assert_eq!(path.len(), 4);
        assert_eq!(path.entries()[2], "");
        assert_eq!(path.to_value(), "/usr/bin:/bin::/opt/bin");
    }

    #[test]
    fn test_empty_value() {
        let path = SearchPath::parse("", ':');
        assert!(path.is_empty());
        assert_eq!(path.to_value(), "");
    }

    #[test]
    fn test_windows_separator() {
        let path = SearchPath::parse(r"C:\msys\bin;C:\mingw\bin", ';');
        assert_eq!(path.position(|e| e.to_string_lossy().contains("mingw")), Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_entry_survives() {
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"/usr/bin:/bin:/opt/caf\xe9");
        let mut path = SearchPath::from_os(raw);
        assert_eq!(path.len(), 3);
        assert_eq!(path.entries()[0], "/usr/bin");
        assert_eq!(path.entries()[2].as_bytes(), b"/opt/caf\xe9");

        let records = scan_and_strip(&mut path, |e| e == "/bin");
        assert_eq!(path.to_value(), OsStr::from_bytes(b"/usr/bin:/opt/caf\xe9"));

        restore(&mut path, records);
        assert_eq!(path.to_value(), raw);
    }

    #[cfg(unix)]
    #[test]
    fn test_from_os_keeps_empty_entries() {
        let path = SearchPath::from_os(OsStr::new("/usr/bin::/bin"));
        assert_eq!(path.len(), 3);
        assert_eq!(path.to_value(), "/usr/bin::/bin");
    }
}
