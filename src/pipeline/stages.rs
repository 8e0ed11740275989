// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Build stages
//!
//! Each stage reads what it needs from the results of the stages before it
//! and from the [`BuildContext`]. Stages never change the process working
//! directory or environment: directories and the search path travel with
//! each [`Invocation`].

use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::context::BuildContext;
use super::definition::Strategy;
use crate::env::PATH_VAR;
use crate::errors::{BuildflowError, BuildflowResult};
use crate::graph::TaskResults;
use crate::platform::{OsFamily, PlatformDescriptor};
use crate::process::Invocation;

pub const FETCH: &str = "fetch";
pub const EXTRACT: &str = "extract";
pub const PATCH: &str = "patch";
pub const PREPARE: &str = "prepare";
pub const BOOTSTRAP: &str = "bootstrap";
pub const CONFIGURE: &str = "configure";
pub const COMPILE: &str = "compile";

/// Stage names in declaration order
pub const STAGES: [&str; 7] = [FETCH, EXTRACT, PATCH, PREPARE, BOOTSTRAP, CONFIGURE, COMPILE];

/// Subdirectory of the source tree generated build files go to
pub const BUILD_SUBDIR: &str = "build-release";

const RELEASE_FLAG: &str = "-DCMAKE_BUILD_TYPE:STRING=Release";

/// How the source tree was prepared, once resolved for the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStrategy {
    Bootstrap,
    Configure,
}

impl std::fmt::Display for BuildStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bootstrap => write!(f, "bootstrap"),
            Self::Configure => write!(f, "configure"),
        }
    }
}

/// Result of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput {
    /// Downloaded archive
    Archive(PathBuf),
    /// Extracted source tree
    SourceDir(PathBuf),
    /// Names of the applied patches, in order
    Patched(Vec<String>),
    Prepared(BuildStrategy),
    /// Directory the build tool runs in
    BuildDir(PathBuf),
    /// Conditional stage whose branch was not taken
    Skipped,
    /// Install prefix
    Installed(PathBuf),
}

impl StageOutput {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Archive(p) | Self::SourceDir(p) | Self::BuildDir(p) | Self::Installed(p) => {
                Some(p)
            }
            _ => None,
        }
    }

    pub fn strategy(&self) -> Option<BuildStrategy> {
        match self {
            Self::Prepared(strategy) => Some(*strategy),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

fn path_of(results: &TaskResults<StageOutput>, task: &str, dependency: &str) -> BuildflowResult<PathBuf> {
    results
        .require(task, dependency)?
        .path()
        .map(Path::to_path_buf)
        .ok_or_else(|| BuildflowError::MissingTaskResult {
            task: task.to_string(),
            dependency: dependency.to_string(),
        })
}

fn strategy_of(results: &TaskResults<StageOutput>, task: &str) -> BuildflowResult<BuildStrategy> {
    results
        .require(task, PREPARE)?
        .strategy()
        .ok_or_else(|| BuildflowError::MissingTaskResult {
            task: task.to_string(),
            dependency: PREPARE.to_string(),
        })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Download the source archive
pub async fn fetch(ctx: BuildContext) -> BuildflowResult<StageOutput> {
    let uri = ctx.config.src.clone();
    let dest = ctx.paths.archive.clone();
    let sink = ctx.services.sink.clone();

    sink.info(&format!("fetching {}", uri));
    let progress = move |current: u64, total: u64| sink.progress("download", current, total);

    ctx.services
        .downloader
        .get(&uri, &dest, &progress)
        .await
        .map_err(|e| BuildflowError::DownloadFailed {
            uri: uri.clone(),
            reason: format!("{:#}", e),
        })?;

    if let Some(ref expected) = ctx.config.checksum {
        verify_checksum(&dest, expected)
            .await
            .map_err(|reason| BuildflowError::DownloadFailed { uri, reason })?;
    }

    Ok(StageOutput::Archive(dest))
}

/// Compare the BLAKE3 digest of `archive` with `expected`
///
/// A mismatching archive is removed so the next run downloads it again.
async fn verify_checksum(archive: &Path, expected: &str) -> Result<(), String> {
    let path = archive.to_path_buf();
    let actual = tokio::task::spawn_blocking(move || -> std::io::Result<blake3::Hash> {
        let mut hasher = blake3::Hasher::new();
        hasher.update_reader(std::fs::File::open(&path)?)?;
        Ok(hasher.finalize())
    })
    .await
    .map_err(|e| format!("checksum task failed: {}", e))?
    .map_err(|e| format!("cannot read {}: {}", archive.display(), e))?
    .to_hex();

    if actual.as_str().eq_ignore_ascii_case(expected) {
        return Ok(());
    }

    let _ = tokio::fs::remove_file(archive).await;
    Err(format!(
        "checksum mismatch: expected {}, got {}",
        expected,
        actual.as_str()
    ))
}

/// Unpack the archive next to it
pub async fn extract(ctx: BuildContext, results: TaskResults<StageOutput>) -> BuildflowResult<StageOutput> {
    let archive = path_of(&results, EXTRACT, FETCH)?;
    let sink = ctx.services.sink.clone();

    sink.info(&format!("extracting {}", file_name(&archive)));
    let progress = move |current: u64, total: u64| sink.progress("extract", current, total);

    ctx.services
        .extractor
        .extract(&archive, &ctx.paths.src_root, &progress)
        .await
        .map_err(|e| BuildflowError::ExtractFailed {
            archive: archive.clone(),
            reason: format!("{:#}", e),
        })?;

    let source = ctx.paths.source_dir();
    if !source.is_dir() {
        return Err(BuildflowError::ExtractFailed {
            archive,
            reason: format!("expected source directory {} was not created", source.display()),
        });
    }

    Ok(StageOutput::SourceDir(source))
}

/// Patch files of `dir` that apply to `family`, in application order
///
/// A file applies when its name is `<digits>...patch` or
/// `<family prefix>-...patch`. A missing directory holds no patches.
pub fn select_patches(dir: &Path, family: OsFamily) -> BuildflowResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let selector = Regex::new(&format!(
        r"^([0-9]+|{}-).*\.patch$",
        regex::escape(family.prefix())
    ))
    .map_err(|e| BuildflowError::InvalidConfig {
        reason: e.to_string(),
        help: None,
    })?;

    let pattern = format!("{}/*.patch", glob::Pattern::escape(&dir.to_string_lossy()));

    let mut patches: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .filter(|p| selector.is_match(&file_name(p)))
        .collect();

    patches.sort_by_key(|p| file_name(p));
    Ok(patches)
}

/// Apply the selected patches to the source tree
pub async fn patch(ctx: BuildContext, results: TaskResults<StageOutput>) -> BuildflowResult<StageOutput> {
    let source = path_of(&results, PATCH, EXTRACT)?;
    let patches = select_patches(&ctx.paths.patches, ctx.platform.family)?;
    let sink = &ctx.services.sink;

    if patches.is_empty() {
        sink.verbose("no patches to apply");
        return Ok(StageOutput::Patched(Vec::new()));
    }

    let mut applied = Vec::with_capacity(patches.len());
    for file in patches {
        let name = file_name(&file);
        sink.info(&format!("applying {}", name));

        ctx.services
            .patcher
            .apply(&source, &file, ctx.config.strip)
            .await
            .map_err(|e| BuildflowError::PatchFailed {
                file: name.clone(),
                reason: format!("{:#}", e),
            })?;

        applied.push(name);
    }

    Ok(StageOutput::Patched(applied))
}

/// Pick bootstrap or configure for this host
///
/// `cmake_available` is only consulted for [`Strategy::Auto`].
pub fn resolve_strategy<F>(
    requested: Strategy,
    platform: &PlatformDescriptor,
    cmake_available: F,
) -> BuildflowResult<BuildStrategy>
where
    F: FnOnce() -> bool,
{
    match requested {
        Strategy::Bootstrap => Ok(BuildStrategy::Bootstrap),
        Strategy::Configure if platform.supports_configure() => Ok(BuildStrategy::Configure),
        Strategy::Configure => Err(BuildflowError::ConfigureFailed {
            reason: format!("configure is not supported on {} hosts", platform.family),
        }),
        Strategy::Auto if platform.supports_configure() && cmake_available() => {
            Ok(BuildStrategy::Configure)
        }
        Strategy::Auto => Ok(BuildStrategy::Bootstrap),
    }
}

/// Decide how the source tree gets configured
pub async fn prepare(ctx: BuildContext) -> BuildflowResult<StageOutput> {
    let path_value = ctx.path_value().await;
    let cwd = ctx.paths.temp_root.clone();

    let strategy = resolve_strategy(ctx.config.strategy, &ctx.platform, || {
        which::which_in("cmake", Some(&path_value), &cwd).is_ok()
    })?;

    ctx.services
        .sink
        .info(&format!("preparing the build with {}", strategy));
    Ok(StageOutput::Prepared(strategy))
}

/// Run the source tree's own bootstrap script
pub async fn bootstrap(ctx: BuildContext, results: TaskResults<StageOutput>) -> BuildflowResult<StageOutput> {
    let sink = &ctx.services.sink;
    if strategy_of(&results, BOOTSTRAP)? != BuildStrategy::Bootstrap {
        sink.verbose("bootstrap not required");
        return Ok(StageOutput::Skipped);
    }

    let source = path_of(&results, BOOTSTRAP, EXTRACT)?;
    let script = source.join("bootstrap");
    make_executable(&script)
        .await
        .map_err(|e| BuildflowError::BootstrapFailed {
            reason: format!("cannot make {} executable: {}", script.display(), e),
        })?;

    let invocation = Invocation::new(&ctx.platform.shell, &source)
        .arg("bootstrap")
        .arg(format!("--parallel={}", ctx.platform.jobs))
        .arg(format!("--prefix={}", ctx.paths.out.display()))
        .arg("--")
        .arg(RELEASE_FLAG)
        .env(PATH_VAR, ctx.path_value().await);

    sink.info(&format!("bootstrapping {} {}", ctx.config.name, ctx.config.version));
    ctx.services
        .runner
        .run(&invocation)
        .await
        .map_err(|e| BuildflowError::BootstrapFailed {
            reason: e.to_string(),
        })?;

    Ok(StageOutput::BuildDir(source))
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = tokio::fs::metadata(path).await?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    tokio::fs::set_permissions(path, permissions).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Generate build files with cmake in a dedicated build directory
pub async fn configure(ctx: BuildContext, results: TaskResults<StageOutput>) -> BuildflowResult<StageOutput> {
    let sink = &ctx.services.sink;
    if strategy_of(&results, CONFIGURE)? != BuildStrategy::Configure {
        sink.verbose("configure not required");
        return Ok(StageOutput::Skipped);
    }

    let source = path_of(&results, CONFIGURE, EXTRACT)?;
    let generator = ctx
        .platform
        .generator
        .clone()
        .ok_or_else(|| BuildflowError::ConfigureFailed {
            reason: format!("no generator for {} hosts", ctx.platform.family),
        })?;

    let path_value = {
        let mut guard = ctx.search_path.lock().await;
        if let Some(ref binary) = ctx.platform.shadowing_binary {
            let hidden = guard
                .strip(|entry| Path::new(entry).join(binary).is_file())
                .len();
            if hidden > 0 {
                sink.verbose(&format!(
                    "hiding {} search path entries providing {}",
                    hidden, binary
                ));
            }
        }
        guard.path().to_value()
    };

    let build_dir = source.join(BUILD_SUBDIR);
    tokio::fs::create_dir_all(&build_dir)
        .await
        .map_err(|e| BuildflowError::ConfigureFailed {
            reason: format!("cannot create {}: {}", build_dir.display(), e),
        })?;

    let invocation = Invocation::new("cmake", &build_dir)
        .arg("-G")
        .arg(generator)
        .arg(format!("-DCMAKE_INSTALL_PREFIX:PATH={}", ctx.paths.out.display()))
        .arg(RELEASE_FLAG)
        .arg(source.display().to_string())
        .env(PATH_VAR, path_value);

    sink.info(&format!("configuring {} {}", ctx.config.name, ctx.config.version));
    ctx.services
        .runner
        .run(&invocation)
        .await
        .map_err(|e| BuildflowError::ConfigureFailed {
            reason: e.to_string(),
        })?;

    Ok(StageOutput::BuildDir(build_dir))
}

/// Build the default target, then install
pub async fn compile(ctx: BuildContext, results: TaskResults<StageOutput>) -> BuildflowResult<StageOutput> {
    let build_dir = [BOOTSTRAP, CONFIGURE]
        .iter()
        .filter_map(|stage| results.get(stage))
        .find_map(StageOutput::path)
        .map(Path::to_path_buf)
        .ok_or_else(|| BuildflowError::MissingTaskResult {
            task: COMPILE.to_string(),
            dependency: format!("{} or {}", BOOTSTRAP, CONFIGURE),
        })?;

    let sink = &ctx.services.sink;
    let path_value = ctx.path_value().await;
    sink.info(&format!("begin building of {} {}", ctx.config.name, ctx.config.version));

    for target in ["all", "install"] {
        let invocation = Invocation::new(&ctx.platform.build_tool, &build_dir)
            .arg(ctx.platform.job_flag())
            .arg(target)
            .env(PATH_VAR, path_value.clone());

        ctx.services
            .runner
            .run(&invocation)
            .await
            .map_err(|e| BuildflowError::CompileFailed {
                target: target.to_string(),
                reason: e.to_string(),
            })?;
    }

    sink.info(&format!("{} is built and installed", ctx.config.name));
    Ok(StageOutput::Installed(ctx.paths.out.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"").unwrap();
        }
    }

    fn names(patches: &[PathBuf]) -> Vec<String> {
        patches.iter().map(|p| file_name(p)).collect()
    }

    #[test]
    fn test_select_patches_orders_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        touch(
            dir.path(),
            &[
                "lin-c.patch",
                "002-b.patch",
                "001-a.patch",
                "win-d.patch",
                "readme.patch",
                "003-notes.txt",
            ],
        );

        let linux = select_patches(dir.path(), OsFamily::Linux).unwrap();
        assert_eq!(names(&linux), vec!["001-a.patch", "002-b.patch", "lin-c.patch"]);

        let windows = select_patches(dir.path(), OsFamily::Windows).unwrap();
        assert_eq!(names(&windows), vec!["001-a.patch", "002-b.patch", "win-d.patch"]);
    }

    #[test]
    fn test_select_patches_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let patches = select_patches(&dir.path().join("missing"), OsFamily::Darwin).unwrap();
        assert!(patches.is_empty());
    }

    #[test]
    fn test_resolve_strategy() {
        let linux = PlatformDescriptor::for_family(OsFamily::Linux, 4, None);
        let other = PlatformDescriptor::for_family(OsFamily::Other, 4, None);

        assert_eq!(
            resolve_strategy(Strategy::Auto, &linux, || true).unwrap(),
            BuildStrategy::Configure
        );
        assert_eq!(
            resolve_strategy(Strategy::Auto, &linux, || false).unwrap(),
            BuildStrategy::Bootstrap
        );
        assert_eq!(
            resolve_strategy(Strategy::Auto, &other, || true).unwrap(),
            BuildStrategy::Bootstrap
        );
        assert_eq!(
            resolve_strategy(Strategy::Bootstrap, &linux, || panic!("not consulted")).unwrap(),
            BuildStrategy::Bootstrap
        );
        assert!(matches!(
            resolve_strategy(Strategy::Configure, &other, || true),
            Err(BuildflowError::ConfigureFailed { .. })
        ));
    }

    #[test]
    fn test_stage_output_accessors() {
        assert_eq!(
            StageOutput::BuildDir(PathBuf::from("/b")).path(),
            Some(Path::new("/b"))
        );
        assert_eq!(StageOutput::Skipped.path(), None);
        assert_eq!(
            StageOutput::Prepared(BuildStrategy::Configure).strategy(),
            Some(BuildStrategy::Configure)
        );
        assert!(StageOutput::Skipped.is_skipped());
    }

    #[tokio::test]
    async fn test_checksum_mismatch_removes_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.tar.gz");
        std::fs::write(&archive, b"payload").unwrap();

        let good = blake3::hash(b"payload").to_hex().to_string();
        verify_checksum(&archive, &good.to_uppercase()).await.unwrap();

        let err = verify_checksum(&archive, &"0".repeat(64)).await.unwrap_err();
        assert!(err.contains("checksum mismatch"));
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn test_checksum_of_multi_chunk_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("big.tar");
        let payload: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&archive, &payload).unwrap();

        let good = blake3::hash(&payload).to_hex().to_string();
        verify_checksum(&archive, &good).await.unwrap();
        assert!(archive.exists());
    }

    #[tokio::test]
    async fn test_checksum_of_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify_checksum(&dir.path().join("gone.tar"), &"0".repeat(64))
            .await
            .unwrap_err();
        assert!(err.starts_with("cannot read"));
    }
}
