//! Configuration for gemlayer
//!
//! Behaviour switches come from the process environment; the build plan and
//! buildpack descriptor are TOML files provided by the platform.

pub mod schema;

pub use schema::{BuildpackInfo, BuildpackPlan, PlanEntry, PlanEntryMetadata};

use crate::error::{GemlayerError, GemlayerResult};
use schema::BuildpackDescriptor;
use std::ffi::OsString;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Keep native extension sources and build logs in installed slots
pub const KEEP_BUILD_FILES_ENV: &str = "BP_KEEP_GEM_EXTENSION_BUILD_FILES";

/// `DEBUG` enables debug logging
pub const LOG_LEVEL_ENV: &str = "BP_LOG_LEVEL";

const KNOWN_VARS: [&str; 2] = [KEEP_BUILD_FILES_ENV, LOG_LEVEL_ENV];

/// Settings read from the process environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Environment {
    /// Skip removal of extension build leftovers
    pub keep_build_files: bool,

    /// Debug logging requested through `BP_LOG_LEVEL`
    pub debug: bool,
}

impl Environment {
    /// Read settings from `NAME=value` style pairs
    pub fn from_vars<I, K, V>(vars: I) -> GemlayerResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut env = Self::default();

        for (name, value) in vars {
            match name.as_ref() {
                KEEP_BUILD_FILES_ENV => {
                    env.keep_build_files = parse_bool(value.as_ref()).map_err(|reason| {
                        GemlayerError::EnvInvalid {
                            name: KEEP_BUILD_FILES_ENV.to_string(),
                            reason,
                        }
                    })?;
                }
                LOG_LEVEL_ENV => env.debug = value.as_ref().eq_ignore_ascii_case("debug"),
                _ => {}
            }
        }

        Ok(env)
    }

    /// Read settings from the process environment
    pub fn from_env() -> GemlayerResult<Self> {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Read settings from raw OS pairs. Only the variables gemlayer reads
    /// must be valid UTF-8; everything else is skipped untouched.
    pub fn from_os_vars<I>(vars: I) -> GemlayerResult<Self>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut known = Vec::new();

        for (name, value) in vars {
            let Some(name) = name.to_str().filter(|name| KNOWN_VARS.contains(name)) else {
                continue;
            };

            let value = value.into_string().map_err(|raw| GemlayerError::EnvInvalid {
                name: name.to_string(),
                reason: format!("value {:?} is not valid UTF-8", raw),
            })?;
            known.push((name.to_string(), value));
        }

        Self::from_vars(known)
    }
}

/// Parse a boolean the way build platforms spell them
pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("invalid boolean {:?}", other)),
    }
}

/// Load the build plan
pub async fn load_plan(path: &Path) -> GemlayerResult<BuildpackPlan> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GemlayerError::PlanNotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(GemlayerError::io(
                format!("reading plan from {}", path.display()),
                e,
            ))
        }
    };

    toml::from_str(&content).map_err(|e| GemlayerError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load `buildpack.toml` from the buildpack directory, falling back to the
/// built-in identity when there is none
pub async fn load_buildpack_info(dir: Option<&Path>) -> GemlayerResult<BuildpackInfo> {
    let Some(dir) = dir else {
        return Ok(BuildpackInfo::default());
    };

    let path = dir.join("buildpack.toml");
    if !path.exists() {
        debug!("No descriptor at {}, using defaults", path.display());
        return Ok(BuildpackInfo::default());
    }

    let content = fs::read_to_string(&path)
        .await
        .map_err(|e| GemlayerError::io(format!("reading {}", path.display()), e))?;

    let descriptor: BuildpackDescriptor =
        toml::from_str(&content).map_err(|e| GemlayerError::ConfigInvalid {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    Ok(descriptor.buildpack)
}
