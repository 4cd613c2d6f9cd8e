//! In-memory doubles for the subprocess, version, checksum and install seams
//!
//! Each double records how it was called and answers from a script set up
//! by the test. Errors are handed out once: the first matching call takes it.

use crate::cache::{ChecksumCalculator, SlotMetadata};
use crate::error::{GemlayerError, GemlayerResult};
use crate::install::{
    Executable, Execution, ExecutionOutput, InstallDecision, InstallDirectives, InstallProcess,
    VersionResolver,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use walkdir::WalkDir;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn take_ok<T: Clone>(slot: &Mutex<Option<GemlayerError>>, value: &T) -> GemlayerResult<T> {
    match lock(slot).take() {
        Some(err) => Err(err),
        None => Ok(value.clone()),
    }
}

/// Scripted [`Executable`]
///
/// Responses are matched by substring against the space-joined arguments;
/// the most recently registered match wins. Unmatched calls succeed with
/// empty output.
#[derive(Debug)]
pub struct FakeExecutable {
    name: String,
    responses: Mutex<Vec<(String, GemlayerResult<ExecutionOutput>)>>,
    executions: Mutex<Vec<Execution>>,
}

impl FakeExecutable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(Vec::new()),
            executions: Mutex::new(Vec::new()),
        }
    }

    /// Answer calls whose arguments contain `pattern`
    pub fn respond_to(&self, pattern: &str, response: GemlayerResult<ExecutionOutput>) {
        lock(&self.responses).push((pattern.to_string(), response));
    }

    /// Every execution seen so far, in order
    pub fn executions(&self) -> Vec<Execution> {
        lock(&self.executions).clone()
    }
}

#[async_trait]
impl Executable for FakeExecutable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, execution: Execution) -> GemlayerResult<ExecutionOutput> {
        let joined = execution.args.join(" ");
        lock(&self.executions).push(execution);

        let mut responses = lock(&self.responses);
        let Some(index) = responses
            .iter()
            .rposition(|(pattern, _)| joined.contains(pattern.as_str()))
        else {
            return Ok(ExecutionOutput::default());
        };

        if let Ok(output) = &responses[index].1 {
            return Ok(output.clone());
        }
        responses.remove(index).1
    }
}

/// Scripted [`VersionResolver`]
#[derive(Debug)]
pub struct FakeVersionResolver {
    version: String,
    matches: bool,
    lookup_error: Mutex<Option<GemlayerError>>,
    compare_error: Mutex<Option<GemlayerError>>,
    compare_calls: Mutex<Vec<(String, String)>>,
}

impl FakeVersionResolver {
    /// Report `version`; every comparison matches
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            matches: true,
            lookup_error: Mutex::new(None),
            compare_error: Mutex::new(None),
            compare_calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the result of every comparison
    pub fn with_match(mut self, matches: bool) -> Self {
        self.matches = matches;
        self
    }

    pub fn fail_lookup(self, err: GemlayerError) -> Self {
        *lock(&self.lookup_error) = Some(err);
        self
    }

    pub fn fail_compare(self, err: GemlayerError) -> Self {
        *lock(&self.compare_error) = Some(err);
        self
    }

    /// `(cached, current)` pairs passed to `compare_major_minor`
    pub fn compare_calls(&self) -> Vec<(String, String)> {
        lock(&self.compare_calls).clone()
    }
}

#[async_trait]
impl VersionResolver for FakeVersionResolver {
    async fn lookup(&self) -> GemlayerResult<String> {
        take_ok(&self.lookup_error, &self.version)
    }

    fn compare_major_minor(&self, cached: &str, current: &str) -> GemlayerResult<bool> {
        lock(&self.compare_calls).push((cached.to_string(), current.to_string()));
        take_ok(&self.compare_error, &self.matches)
    }
}

/// Scripted [`ChecksumCalculator`]
#[derive(Debug)]
pub struct FakeCalculator {
    sum: String,
    error: Mutex<Option<GemlayerError>>,
    calls: Mutex<Vec<Vec<PathBuf>>>,
}

impl FakeCalculator {
    pub fn new(sum: impl Into<String>) -> Self {
        Self {
            sum: sum.into(),
            error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(self, err: GemlayerError) -> Self {
        *lock(&self.error) = Some(err);
        self
    }

    /// Path lists passed to `sum`
    pub fn calls(&self) -> Vec<Vec<PathBuf>> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl ChecksumCalculator for FakeCalculator {
    async fn sum(&self, paths: &[&Path]) -> GemlayerResult<String> {
        lock(&self.calls).push(paths.iter().map(|p| p.to_path_buf()).collect());
        take_ok(&self.error, &self.sum)
    }
}

/// One recorded `should_run` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShouldRunCall {
    pub prior: Option<SlotMetadata>,
    pub working_dir: PathBuf,
}

/// One recorded `execute` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteCall {
    pub working_dir: PathBuf,
    pub slot_path: PathBuf,
    pub directives: InstallDirectives,
    pub keep_build_files: bool,
    /// Files present in the slot when the install started, relative and sorted
    pub slot_files: Vec<PathBuf>,
}

/// Scripted [`InstallProcess`]
///
/// Queued decisions are handed out in order; once the queue is empty the
/// decision given to `new` repeats. `execute` writes the configured files
/// into the slot.
#[derive(Debug)]
pub struct FakeInstallProcess {
    decisions: Mutex<VecDeque<InstallDecision>>,
    last: InstallDecision,
    installs: Vec<(PathBuf, String)>,
    should_run_error: Mutex<Option<GemlayerError>>,
    execute_error: Mutex<Option<GemlayerError>>,
    should_run_calls: Mutex<Vec<ShouldRunCall>>,
    execute_calls: Mutex<Vec<ExecuteCall>>,
}

impl FakeInstallProcess {
    pub fn new(should_run: bool, checksum: &str, runtime_version: &str) -> Self {
        Self {
            decisions: Mutex::new(VecDeque::new()),
            last: InstallDecision {
                should_run,
                checksum: checksum.to_string(),
                runtime_version: runtime_version.to_string(),
            },
            installs: Vec::new(),
            should_run_error: Mutex::new(None),
            execute_error: Mutex::new(None),
            should_run_calls: Mutex::new(Vec::new()),
            execute_calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a decision ahead of the default one
    pub fn then(self, should_run: bool, checksum: &str, runtime_version: &str) -> Self {
        lock(&self.decisions).push_back(InstallDecision {
            should_run,
            checksum: checksum.to_string(),
            runtime_version: runtime_version.to_string(),
        });
        self
    }

    /// Write `contents` to `relative` inside the slot on every install
    pub fn installs(mut self, relative: impl Into<PathBuf>, contents: &str) -> Self {
        self.installs.push((relative.into(), contents.to_string()));
        self
    }

    pub fn fail_should_run(self, err: GemlayerError) -> Self {
        *lock(&self.should_run_error) = Some(err);
        self
    }

    pub fn fail_execute(self, err: GemlayerError) -> Self {
        *lock(&self.execute_error) = Some(err);
        self
    }

    pub fn should_run_calls(&self) -> Vec<ShouldRunCall> {
        lock(&self.should_run_calls).clone()
    }

    pub fn execute_calls(&self) -> Vec<ExecuteCall> {
        lock(&self.execute_calls).clone()
    }
}

fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}

#[async_trait]
impl InstallProcess for FakeInstallProcess {
    async fn should_run(
        &self,
        prior: Option<&SlotMetadata>,
        working_dir: &Path,
    ) -> GemlayerResult<InstallDecision> {
        lock(&self.should_run_calls).push(ShouldRunCall {
            prior: prior.cloned(),
            working_dir: working_dir.to_path_buf(),
        });

        if let Some(err) = lock(&self.should_run_error).take() {
            return Err(err);
        }

        match lock(&self.decisions).pop_front() {
            Some(decision) => Ok(decision),
            None => Ok(self.last.clone()),
        }
    }

    async fn execute(
        &self,
        working_dir: &Path,
        slot_path: &Path,
        directives: &InstallDirectives,
        keep_build_files: bool,
    ) -> GemlayerResult<()> {
        lock(&self.execute_calls).push(ExecuteCall {
            working_dir: working_dir.to_path_buf(),
            slot_path: slot_path.to_path_buf(),
            directives: directives.clone(),
            keep_build_files,
            slot_files: list_files(slot_path),
        });

        if let Some(err) = lock(&self.execute_error).take() {
            return Err(err);
        }

        for (relative, contents) in &self.installs {
            let path = slot_path.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| GemlayerError::io(format!("creating {}", parent.display()), e))?;
            }
            std::fs::write(&path, contents)
                .map_err(|e| GemlayerError::io(format!("writing {}", path.display()), e))?;
        }

        Ok(())
    }
}
