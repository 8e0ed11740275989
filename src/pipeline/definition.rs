// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Build configuration
//!
//! Defines the schema for .buildflow.yaml files. One configuration record
//! drives the whole pipeline; there is no per-version code.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{BuildflowError, BuildflowResult};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".buildflow.yaml";

/// Build configuration from .buildflow.yaml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Package name
    #[serde(default = "default_name")]
    pub name: String,

    /// Package version
    #[serde(default = "default_version")]
    pub version: String,

    /// Source archive URI
    #[serde(default = "default_src")]
    pub src: String,

    /// Install prefix
    #[serde(default = "default_out")]
    pub out: PathBuf,

    /// Directory holding the patches to apply
    #[serde(default = "default_patches")]
    pub patches: PathBuf,

    /// Download and extraction root
    #[serde(default)]
    pub temp_root: Option<PathBuf>,

    /// Explicit job count; overrides the platform default
    #[serde(default)]
    pub jobs: Option<usize>,

    /// How the source tree is prepared for compiling
    #[serde(default)]
    pub strategy: Strategy,

    /// Expected BLAKE3 digest of the archive (hex)
    #[serde(default)]
    pub checksum: Option<String>,

    /// Path components stripped when applying patches
    #[serde(default = "default_strip")]
    pub strip: u32,
}

fn default_name() -> String {
    "cmake".to_string()
}

fn default_version() -> String {
    "3.26.4".to_string()
}

fn default_src() -> String {
    "http://www.cmake.org/files/v3.26/cmake-3.26.4.tar.gz".to_string()
}

fn default_out() -> PathBuf {
    PathBuf::from("./usr")
}

fn default_patches() -> PathBuf {
    PathBuf::from("patches")
}

fn default_strip() -> u32 {
    1
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            src: default_src(),
            out: default_out(),
            patches: default_patches(),
            temp_root: None,
            jobs: None,
            strategy: Strategy::default(),
            checksum: None,
            strip: default_strip(),
        }
    }
}

/// How the source tree gets configured before compiling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Configure when the platform supports it and cmake is available,
    /// bootstrap otherwise
    #[default]
    Auto,
    /// Run the source tree's own bootstrap script
    Bootstrap,
    /// Run cmake with the platform generator
    Configure,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Bootstrap => write!(f, "bootstrap"),
            Self::Configure => write!(f, "configure"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "bootstrap" => Ok(Self::Bootstrap),
            "configure" => Ok(Self::Configure),
            _ => Err(format!("Unknown strategy: {}", s)),
        }
    }
}

impl BuildConfig {
    /// Load configuration from a YAML, JSON or TOML file
    pub fn from_file(path: &Path) -> BuildflowResult<Self> {
        if !path.exists() {
            return Err(BuildflowError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BuildflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse configuration from YAML
    pub fn from_yaml(yaml: &str) -> BuildflowResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    pub fn from_json(json: &str) -> BuildflowResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    pub fn from_toml(text: &str) -> BuildflowResult<Self> {
        toml::from_str(text).map_err(Into::into)
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> BuildflowResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// File name of the source archive, taken from the last URI segment
    pub fn archive_name(&self) -> Option<&str> {
        let without_query = self.src.split(['?', '#']).next().unwrap_or_default();
        without_query
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
    }
}

/// Archive suffixes removed to get the extracted directory name
pub const ARCHIVE_SUFFIXES: &[&str] = &[
    ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".txz", ".tar", ".zip",
];

/// Name of the directory an archive unpacks into: its name without the
/// compression suffix
pub fn strip_archive_suffix(archive: &str) -> &str {
    ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| archive.strip_suffix(suffix))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(archive)
}

/// Absolute locations used by one build run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    /// Root for downloads and extraction
    pub temp_root: PathBuf,
    /// Directory archives are downloaded to and extracted in
    pub src_root: PathBuf,
    /// Downloaded archive
    pub archive: PathBuf,
    /// Install prefix
    pub out: PathBuf,
    /// Patch directory
    pub patches: PathBuf,
}

impl BuildPaths {
    /// Resolve the configured paths against `base_dir`
    pub fn resolve(config: &BuildConfig, base_dir: &Path) -> BuildflowResult<Self> {
        let archive_name = config
            .archive_name()
            .ok_or_else(|| BuildflowError::InvalidConfig {
                reason: format!("Cannot derive an archive file name from '{}'", config.src),
                help: Some("The source URI must end with the archive file name".into()),
            })?;

        let absolute = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        };

        let temp_root = match config.temp_root {
            Some(ref root) => absolute(root),
            None => default_temp_root(base_dir),
        };
        let src_root = temp_root.join("src");

        Ok(Self {
            archive: src_root.join(archive_name),
            src_root,
            temp_root,
            out: normalize(&absolute(&config.out)),
            patches: absolute(&config.patches),
        })
    }

    /// Source directory produced by extracting the archive
    pub fn source_dir(&self) -> PathBuf {
        let name = self
            .archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.src_root.join(strip_archive_suffix(&name))
    }
}

/// Per-user cache directory, or `.buildflow/tmp` under `base_dir`
fn default_temp_root(base_dir: &Path) -> PathBuf {
    directories::ProjectDirs::from("", "", "buildflow")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| base_dir.join(".buildflow").join("tmp"))
}

/// Drop `.` components so prefixes read cleanly in tool arguments
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}
