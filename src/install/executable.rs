//! Subprocess seam
//!
//! Every external tool (`bundle`, `ruby`) is reached through the
//! [`Executable`] trait so the install logic can be exercised against an
//! in-memory double.

use crate::error::{GemlayerError, GemlayerResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Max number of output lines kept in subprocess error messages.
const ERROR_TAIL_LINES: usize = 50;

/// One invocation of an executable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// Arguments (without the program name)
    pub args: Vec<String>,
    /// Extra environment variables layered over the inherited environment
    pub env: Vec<(String, String)>,
    /// Working directory of the child process
    pub dir: Option<PathBuf>,
}

impl Execution {
    /// Create an execution with the given arguments
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            dir: None,
        }
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Value of an environment variable set on this execution
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Captured output of a finished execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutput {
    /// Output with only stdout
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Stdout followed by stderr
    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&self.stderr);
        }
        combined
    }
}

/// An external program that can be run with arguments
#[async_trait]
pub trait Executable: Send + Sync {
    /// Program name, used in logs and errors
    fn name(&self) -> &str;

    /// Run to completion, returning captured output.
    ///
    /// A non-zero exit is an error carrying the captured output.
    async fn execute(&self, execution: Execution) -> GemlayerResult<ExecutionOutput>;
}

/// Runs a real program found on PATH (or at an explicit path)
#[derive(Debug, Clone)]
pub struct CommandExecutable {
    program: String,
}

impl CommandExecutable {
    /// Create an executable for `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Executable for CommandExecutable {
    fn name(&self) -> &str {
        &self.program
    }

    async fn execute(&self, execution: Execution) -> GemlayerResult<ExecutionOutput> {
        let cmd_line = command_line(&self.program, &execution.args);
        debug!("Executing: {}", cmd_line);

        let mut command = Command::new(&self.program);
        command
            .args(&execution.args)
            .envs(execution.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(ref dir) = execution.dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|e| GemlayerError::command_failed(cmd_line.clone(), e))?;

        let captured = ExecutionOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if output.status.success() {
            Ok(captured)
        } else {
            Err(GemlayerError::command_exec(
                cmd_line,
                output.status.to_string(),
                error_output(&captured.stdout, &captured.stderr),
            ))
        }
    }
}

/// Render a program and its arguments for logs
pub fn command_line(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Extract the useful tail of subprocess output for error diagnostics.
///
/// Combines stdout and stderr, then keeps the last `ERROR_TAIL_LINES` lines.
pub(crate) fn error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > ERROR_TAIL_LINES {
        lines[total - ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}
