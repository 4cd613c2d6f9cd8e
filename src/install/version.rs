//! Ruby version lookup and comparison

use crate::error::{GemlayerError, GemlayerResult};
use crate::install::executable::{Executable, Execution};
use async_trait::async_trait;
use regex::Regex;
use semver::Version;
use std::sync::OnceLock;
use tracing::debug;

/// Resolves the installed runtime version and compares versions
#[async_trait]
pub trait VersionResolver: Send + Sync {
    /// Version of the runtime installed in the build environment
    async fn lookup(&self) -> GemlayerResult<String>;

    /// True when `current` has the same major and minor as `cached`
    fn compare_major_minor(&self, cached: &str, current: &str) -> GemlayerResult<bool>;
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"ruby (\d+\.\d+\.\d+)").expect("valid version regex"))
}

fn parse_version(version: &str) -> GemlayerResult<Version> {
    Version::parse(version.trim()).map_err(|e| GemlayerError::VersionParse {
        version: version.to_string(),
        source: e,
    })
}

/// Asks `ruby --version`
pub struct RubyVersionResolver<E> {
    executable: E,
}

impl<E: Executable> RubyVersionResolver<E> {
    /// Create a resolver running the given ruby executable
    pub fn new(executable: E) -> Self {
        Self { executable }
    }
}

#[async_trait]
impl<E: Executable> VersionResolver for RubyVersionResolver<E> {
    async fn lookup(&self) -> GemlayerResult<String> {
        let output = self
            .executable
            .execute(Execution::new(["--version"]))
            .await?
            .combined();

        let version = version_pattern()
            .captures(&output)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| GemlayerError::VersionNotFound {
                output: output.trim().to_string(),
            })?;

        debug!("Resolved ruby version {}", version);
        Ok(version)
    }

    fn compare_major_minor(&self, cached: &str, current: &str) -> GemlayerResult<bool> {
        let cached = parse_version(cached)?;
        let current = parse_version(current)?;
        Ok(cached.major == current.major && cached.minor == current.minor)
    }
}
