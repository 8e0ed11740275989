// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Host platform strategy
//!
//! Everything that differs between operating systems (tool names, the
//! generator handed to cmake, how many jobs to run) is resolved once into a
//! [`PlatformDescriptor`] and read from there.

use serde::{Deserialize, Serialize};

/// Operating system family of the build host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Darwin,
    Windows,
    Bsd,
    Other,
}

impl OsFamily {
    /// Family of the host this binary was built for
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::Darwin
        } else if cfg!(any(
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        )) {
            Self::Bsd
        } else {
            Self::Other
        }
    }

    /// Short name used as the prefix of family specific patch files
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Linux => "lin",
            Self::Darwin => "mac",
            Self::Windows => "win",
            Self::Bsd => "bsd",
            Self::Other => "unix",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// Resolved tool names and concurrency for one build run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformDescriptor {
    /// Host family
    pub family: OsFamily,
    /// Native build tool binary
    pub build_tool: String,
    /// Generator passed to `cmake -G`, `None` where configure is unsupported
    pub generator: Option<String>,
    /// Shell used to run the bootstrap script
    pub shell: String,
    /// Binary whose directory must be hidden from the search path while
    /// configuring, because it shadows the native toolchain
    pub shadowing_binary: Option<String>,
    /// Job count handed to the build tool and bootstrap
    pub jobs: usize,
    /// Whether `jobs` was set explicitly
    pub jobs_forced: bool,
}

impl PlatformDescriptor {
    /// Descriptor for the current host
    pub fn detect(jobs: Option<usize>) -> Self {
        Self::for_family(OsFamily::current(), num_cpus::get(), jobs)
    }

    /// Descriptor for a given family and core count
    ///
    /// Windows runs a single job unless `jobs` forces another count: its
    /// bootstrap toolchain is not safe under parallel execution.
    pub fn for_family(family: OsFamily, cores: usize, jobs: Option<usize>) -> Self {
        let default_jobs = match family {
            OsFamily::Windows => 1,
            _ => cores.max(1),
        };

        let (build_tool, generator, shadowing_binary) = match family {
            OsFamily::Windows => (
                "mingw32-make",
                Some("MinGW Makefiles"),
                Some("sh.exe".to_string()),
            ),
            OsFamily::Linux | OsFamily::Darwin | OsFamily::Bsd => {
                ("make", Some("Unix Makefiles"), None)
            }
            OsFamily::Other => ("make", None, None),
        };

        Self {
            family,
            build_tool: build_tool.to_string(),
            generator: generator.map(String::from),
            shell: "sh".to_string(),
            shadowing_binary,
            jobs: jobs.filter(|j| *j > 0).unwrap_or(default_jobs),
            jobs_forced: jobs.is_some_and(|j| j > 0),
        }
    }

    /// Whether the generator based configure step can run on this host
    pub fn supports_configure(&self) -> bool {
        self.generator.is_some()
    }

    /// Job flag for the build tool, e.g. `-j4`
    pub fn job_flag(&self) -> String {
        format!("-j{}", self.jobs)
    }
}
