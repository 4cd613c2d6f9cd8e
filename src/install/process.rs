//! Reuse decision and `bundle install` invocation

use crate::cache::{ChecksumCalculator, SlotMetadata};
use crate::error::{GemlayerError, GemlayerResult};
use crate::install::directives::InstallDirectives;
use crate::install::executable::{command_line, Executable, Execution, ExecutionOutput};
use crate::install::scope::ConfigScope;
use crate::install::version::VersionResolver;
use crate::ui::LogEmitter;
use async_trait::async_trait;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Manifest, relative to the working directory
pub const GEMFILE: &str = "Gemfile";

/// Lock file, relative to the working directory
pub const GEMFILE_LOCK: &str = "Gemfile.lock";

/// Vendored gem cache used when bundler reports no `cache_path`
pub const DEFAULT_CACHE_PATH: &str = "vendor/cache";

/// Outcome of comparing a slot against the current source tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallDecision {
    /// The install must run
    pub should_run: bool,
    /// Fingerprint of Gemfile + Gemfile.lock, empty without a lockfile
    pub checksum: String,
    /// Ruby version currently installed
    pub runtime_version: String,
}

/// Decides whether gems must be installed and installs them
#[async_trait]
pub trait InstallProcess: Send + Sync {
    /// Compare the metadata recorded with a slot against the current tree.
    ///
    /// The returned checksum and version are always the current ones, so
    /// they can be recorded whether or not the install runs.
    async fn should_run(
        &self,
        prior: Option<&SlotMetadata>,
        working_dir: &Path,
    ) -> GemlayerResult<InstallDecision>;

    /// Install the gems of `working_dir` into `slot_path`
    async fn execute(
        &self,
        working_dir: &Path,
        slot_path: &Path,
        directives: &InstallDirectives,
        keep_build_files: bool,
    ) -> GemlayerResult<()>;
}

/// [`InstallProcess`] shelling out to bundler
pub struct BundleInstallProcess<E, V, C> {
    executable: E,
    resolver: V,
    calculator: C,
    emitter: LogEmitter,
}

impl<E, V, C> BundleInstallProcess<E, V, C>
where
    E: Executable,
    V: VersionResolver,
    C: ChecksumCalculator,
{
    pub fn new(executable: E, resolver: V, calculator: C, emitter: LogEmitter) -> Self {
        Self {
            executable,
            resolver,
            calculator,
            emitter,
        }
    }

    async fn run<I, S>(
        &self,
        args: I,
        scope: &ConfigScope,
        working_dir: &Path,
    ) -> GemlayerResult<ExecutionOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (key, value) = scope.env();
        let execution = Execution::new(args)
            .with_env(key, value)
            .with_dir(working_dir);

        self.emitter.subprocess(&format!(
            "Running '{}'",
            command_line(self.executable.name(), &execution.args)
        ));

        self.executable.execute(execution).await
    }

    async fn install(
        &self,
        working_dir: &Path,
        slot_path: &Path,
        scope: &ConfigScope,
        directives: &InstallDirectives,
        keep_build_files: bool,
    ) -> GemlayerResult<()> {
        for (key, value) in directives.iter() {
            self.run(["config", "--global", key, value], scope, working_dir)
                .await?;
        }

        let output = self
            .run(
                ["config", "--global", "cache_path", "--parseable"],
                scope,
                working_dir,
            )
            .await?;

        let cache_path = working_dir.join(parse_cache_path(&output.stdout));
        let mut args = vec!["install"];
        if path_exists(&cache_path).await? {
            debug!("Found vendored gems at {}", cache_path.display());
            args.push("--local");
        }

        self.run(args, scope, working_dir).await?;

        if !keep_build_files {
            let slot = slot_path.to_path_buf();
            let removed = tokio::task::spawn_blocking(move || remove_build_files(&slot))
                .await
                .map_err(|e| GemlayerError::Internal(format!("build file cleanup: {}", e)))??;
            debug!("Removed {} extension build leftover(s)", removed);
        }

        Ok(())
    }
}

#[async_trait]
impl<E, V, C> InstallProcess for BundleInstallProcess<E, V, C>
where
    E: Executable,
    V: VersionResolver,
    C: ChecksumCalculator,
{
    async fn should_run(
        &self,
        prior: Option<&SlotMetadata>,
        working_dir: &Path,
    ) -> GemlayerResult<InstallDecision> {
        let runtime_version = self.resolver.lookup().await?;

        let version_match = match prior {
            Some(metadata) => self
                .resolver
                .compare_major_minor(&metadata.runtime_version, &runtime_version)?,
            None => true,
        };

        let lock = working_dir.join(GEMFILE_LOCK);
        let checksum = if path_exists(&lock).await? {
            let gemfile = working_dir.join(GEMFILE);
            self.calculator
                .sum(&[gemfile.as_path(), lock.as_path()])
                .await?
        } else {
            String::new()
        };

        let cache_match = prior.is_some_and(|m| m.cache_sha == checksum);
        let should_run = !cache_match || !version_match;

        debug!(
            "Install decision: should_run={} (checksum match={}, ruby match={})",
            should_run, cache_match, version_match
        );

        Ok(InstallDecision {
            should_run,
            checksum,
            runtime_version,
        })
    }

    async fn execute(
        &self,
        working_dir: &Path,
        slot_path: &Path,
        directives: &InstallDirectives,
        keep_build_files: bool,
    ) -> GemlayerResult<()> {
        let scope = ConfigScope::new(working_dir, slot_path);
        let projected = scope.project().await?;

        let installed = self
            .install(working_dir, slot_path, &scope, directives, keep_build_files)
            .await;
        if !projected {
            return installed;
        }

        // Restore on every exit path; an install failure outranks a restore failure
        let restored = scope.restore().await;
        installed.and(restored)
    }
}

/// Cache directory from `bundle config --global cache_path --parseable`
/// output (`cache_path=path/to/cache`)
pub fn parse_cache_path(output: &str) -> &str {
    output
        .split_once('=')
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CACHE_PATH)
}

async fn path_exists(path: &Path) -> GemlayerResult<bool> {
    match fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(GemlayerError::io(format!("checking {}", path.display()), e)),
    }
}

/// Remove native extension build leftovers from an installed slot.
///
/// Sources are kept under `ruby/<version>/gems/<gem>/ext` and compiler logs
/// under `ruby/<version>/extensions`; both embed build paths and timestamps.
pub fn remove_build_files(slot_path: &Path) -> GemlayerResult<usize> {
    let root = slot_path.join("ruby");
    if !root.is_dir() {
        return Ok(0);
    }

    let mut doomed: Vec<(PathBuf, bool)> = Vec::new();
    let mut walker = WalkDir::new(&root).min_depth(1).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| {
            GemlayerError::io(format!("walking {}", root.display()), e.into())
        })?;

        let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
        let parts: Vec<&str> = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();

        let is_dir = entry.file_type().is_dir();
        match parts.as_slice() {
            [_, "gems", _, "ext"] if is_dir => {
                doomed.push((entry.path().to_path_buf(), true));
                walker.skip_current_dir();
            }
            [_, "extensions", .., name]
                if !is_dir && (*name == "gem_make.out" || *name == "mkmf.log") =>
            {
                doomed.push((entry.path().to_path_buf(), false));
            }
            _ => {}
        }
    }

    for (path, is_dir) in &doomed {
        let removed = if *is_dir {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        removed.map_err(|e| GemlayerError::io(format!("removing {}", path.display()), e))?;
    }

    Ok(doomed.len())
}
