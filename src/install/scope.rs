//! Local bundler configuration borrowed during an install
//!
//! A developer may keep a `.bundle/config` in the source tree. Before an
//! install it is backed up to `.bundle/config.bak` and projected into the
//! slot as `<slot>/config`; bundler is pointed at the projected copy through
//! `BUNDLE_USER_CONFIG`. After the install the local file is put back from
//! the backup.

use crate::error::{GemlayerError, GemlayerResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Local configuration, relative to the working directory
pub const LOCAL_CONFIG: &str = ".bundle/config";

/// Backup of the local configuration, relative to the working directory
pub const LOCAL_CONFIG_BACKUP: &str = ".bundle/config.bak";

/// Name of the projected configuration inside a slot
pub const PROJECTED_CONFIG: &str = "config";

/// Variable pointing bundler at its user-level configuration
pub const USER_CONFIG_ENV: &str = "BUNDLE_USER_CONFIG";

/// Projected configuration path of a slot
pub fn projected_config(slot_path: &Path) -> PathBuf {
    slot_path.join(PROJECTED_CONFIG)
}

async fn exists(path: &Path) -> GemlayerResult<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| GemlayerError::io(format!("checking {}", path.display()), e))
}

async fn copy(from: &Path, to: &Path) -> GemlayerResult<()> {
    fs::copy(from, to).await.map_err(|e| {
        GemlayerError::io(
            format!("copying {} to {}", from.display(), to.display()),
            e,
        )
    })?;
    Ok(())
}

async fn remove_file(path: &Path) -> GemlayerResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(GemlayerError::io(format!("removing {}", path.display()), e)),
    }
}

/// Scope of one install against one slot
#[derive(Debug, Clone)]
pub struct ConfigScope {
    local: PathBuf,
    backup: PathBuf,
    slot_path: PathBuf,
    projected: PathBuf,
}

impl ConfigScope {
    /// Scope for installing from `working_dir` into `slot_path`
    pub fn new(working_dir: &Path, slot_path: &Path) -> Self {
        Self {
            local: working_dir.join(LOCAL_CONFIG),
            backup: working_dir.join(LOCAL_CONFIG_BACKUP),
            slot_path: slot_path.to_path_buf(),
            projected: projected_config(slot_path),
        }
    }

    /// Path bundler must read its user configuration from
    pub fn projected(&self) -> &Path {
        &self.projected
    }

    /// Environment pair isolating bundler to the projected configuration
    pub fn env(&self) -> (String, String) {
        (
            USER_CONFIG_ENV.to_string(),
            self.projected.display().to_string(),
        )
    }

    /// Drop the stale projection and, if a local configuration exists,
    /// project it into the slot. Returns whether anything was projected;
    /// only then does the local file need [`restore`](Self::restore).
    ///
    /// A backup left by an interrupted run is restored over the local file
    /// first, so the projection always starts from the developer's version.
    pub async fn project(&self) -> GemlayerResult<bool> {
        remove_file(&self.projected).await?;

        if !exists(&self.local).await? {
            debug!("No local bundler configuration at {}", self.local.display());
            return Ok(false);
        }

        fs::create_dir_all(&self.slot_path).await.map_err(|e| {
            GemlayerError::io(format!("creating slot {}", self.slot_path.display()), e)
        })?;

        if exists(&self.backup).await? {
            debug!("Restoring {} from previous backup", self.local.display());
            copy(&self.backup, &self.local).await?;
        }

        copy(&self.local, &self.projected).await?;
        copy(&self.local, &self.backup).await?;

        debug!(
            "Projected {} into {}",
            self.local.display(),
            self.projected.display()
        );
        Ok(true)
    }

    /// Put the local configuration back from its backup, if there is one.
    /// The backup itself is kept.
    pub async fn restore(&self) -> GemlayerResult<()> {
        if exists(&self.backup).await? {
            copy(&self.backup, &self.local).await?;
            debug!("Restored {}", self.local.display());
        }
        Ok(())
    }
}

/// Remove the local configuration and its backup from the working directory
pub async fn cleanup(working_dir: &Path) -> GemlayerResult<()> {
    remove_file(&working_dir.join(LOCAL_CONFIG)).await?;
    remove_file(&working_dir.join(LOCAL_CONFIG_BACKUP)).await?;
    Ok(())
}
