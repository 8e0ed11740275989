// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Configuration validation
//!
//! Validates a build configuration before anything is downloaded.

use std::path::Path;

use crate::errors::BuildflowResult;
use crate::pipeline::{BuildConfig, Strategy};
use crate::platform::PlatformDescriptor;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a build configuration
    pub fn validate(config: &BuildConfig) -> BuildflowResult<ValidationResult> {
        let mut result = ValidationResult::new();

        if config.name.trim().is_empty() {
            result.add_error("Package name is empty");
        }

        if config.version.trim().is_empty() {
            result.add_warning("Package version is empty");
        }

        Self::validate_source(config, &mut result);

        if config.out.as_os_str().is_empty() {
            result.add_error("Install prefix 'out' is empty");
        }

        if config.jobs == Some(0) {
            result.add_warning("'jobs: 0' is ignored, the platform default is used");
        }

        if let Some(ref checksum) = config.checksum {
            let is_hex = checksum.chars().all(|c| c.is_ascii_hexdigit());
            if checksum.len() != 64 || !is_hex {
                result.add_error(&format!(
                    "Checksum '{}' is not a 64 character BLAKE3 hex digest",
                    checksum
                ));
            }
        }

        Ok(result)
    }

    fn validate_source(config: &BuildConfig, result: &mut ValidationResult) {
        if config.src.trim().is_empty() {
            result.add_error("Source URI 'src' is empty");
            return;
        }

        let Some(archive) = config.archive_name() else {
            result.add_error(&format!(
                "Source URI '{}' does not end with an archive file name",
                config.src
            ));
            return;
        };

        let known = crate::pipeline::definition::ARCHIVE_SUFFIXES
            .iter()
            .any(|suffix| archive.ends_with(suffix));
        if !known {
            result.add_warning(&format!(
                "Archive '{}' has an unrecognised suffix; the extracted directory is assumed to be '{}'",
                archive, archive
            ));
        }

        if config.src.starts_with("http://") && config.checksum.is_none() {
            result.add_warning(
                "Source is fetched over plain HTTP without a checksum; consider setting 'checksum'",
            );
        }
    }

    /// Check the configuration against the host (runtime validation)
    pub fn validate_host(
        config: &BuildConfig,
        platform: &PlatformDescriptor,
        base_path: &Path,
    ) -> Vec<String> {
        let mut problems = Vec::new();

        if config.strategy == Strategy::Configure && !platform.supports_configure() {
            problems.push(format!(
                "Strategy 'configure' is not supported on {} hosts",
                platform.family
            ));
        }

        let patches = base_path.join(&config.patches);
        if patches.exists() && !patches.is_dir() {
            problems.push(format!(
                "Patch location {} is not a directory",
                config.patches.display()
            ));
        }

        problems
    }
}

/// Result of configuration validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
