//! Content fingerprints for checksum inputs
//!
//! A fingerprint covers the named files in order: each file contributes its
//! file name, its length and its bytes. Same files, same order, same bytes =
//! same fingerprint, across runs and processes.

use crate::error::{GemlayerError, GemlayerResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Produces a stable fingerprint over an ordered set of files
#[async_trait]
pub trait ChecksumCalculator: Send + Sync {
    /// Fingerprint the given files, in the given order
    async fn sum(&self, paths: &[&Path]) -> GemlayerResult<String>;
}

/// SHA256 fingerprint, lowercase hex
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Calculator;

impl Sha256Calculator {
    /// Create a new calculator
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChecksumCalculator for Sha256Calculator {
    async fn sum(&self, paths: &[&Path]) -> GemlayerResult<String> {
        if paths.is_empty() {
            return Ok(String::new());
        }

        let mut hasher = Sha256::new();

        for path in paths {
            let contents = fs::read(path)
                .await
                .map_err(|e| GemlayerError::CacheChecksumRead {
                    path: path.to_path_buf(),
                    source: e,
                })?;

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update((contents.len() as u64).to_le_bytes());
            hasher.update(&contents);
        }

        let sum = hex::encode(hasher.finalize());
        debug!("Checksum over {} file(s): {}", paths.len(), sum);
        Ok(sum)
    }
}
