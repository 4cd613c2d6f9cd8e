//! Error types for gemlayer
//!
//! All modules use `GemlayerResult<T>` as their return type. Every error
//! aborts the build; nothing is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gemlayer operations
pub type GemlayerResult<T> = Result<T, GemlayerError>;

/// All errors that can occur while orchestrating a gem install
#[derive(Error, Debug)]
pub enum GemlayerError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("failed to parse {name}: {reason}")]
    EnvInvalid { name: String, reason: String },

    #[error("Build plan not found: {0}")]
    PlanNotFound(PathBuf),

    // Cache errors
    #[error("Failed to read checksum input {path}: {source}")]
    CacheChecksumRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid layer document {path}: {reason}")]
    LayerInvalid { path: PathBuf, reason: String },

    // Runtime version errors
    #[error("no string matching 'ruby (\\d+\\.\\d+\\.\\d+)' found in: {output}")]
    VersionNotFound { output: String },

    #[error("Invalid version {version:?}: {source}")]
    VersionParse {
        version: String,
        #[source]
        source: semver::Error,
    },

    // IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}: {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to execute {command} ({status}) output:\n{output}")]
    CommandExecution {
        command: String,
        status: String,
        output: String,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GemlayerError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error (the process could not be spawned)
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error carrying the captured output
    pub fn command_exec(
        command: impl Into<String>,
        status: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::CommandExecution {
            command: command.into(),
            status: status.into(),
            output: output.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CommandFailed { command, .. } if command.starts_with("bundle") => {
                Some("Make sure bundler is installed and on PATH (or pass --bundle)")
            }
            Self::CommandFailed { command, .. } if command.starts_with("ruby") => {
                Some("Make sure ruby is installed and on PATH (or pass --ruby)")
            }
            Self::EnvInvalid { .. } => Some("Boolean variables accept true/false, t/f or 1/0"),
            Self::PlanNotFound(_) => Some("Pass --plan or set CNB_BP_PLAN_PATH"),
            _ => None,
        }
    }
}
