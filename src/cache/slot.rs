//! Cache slot persistence
//!
//! A slot is a directory under the layers directory plus a sibling TOML
//! document (`<name>.toml`) holding its role flags and fingerprint metadata.
//! Slots survive across builds; the host persists and restores them.

use crate::error::{GemlayerError, GemlayerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Metadata key names. These are a contract with the host that stores the
/// slot documents between builds.
pub mod keys {
    /// Stack (base image) identity the slot was built against
    pub const STACK: &str = "stack";
    /// Content fingerprint of Gemfile + Gemfile.lock
    pub const CACHE_SHA: &str = "cache_sha";
    /// Ruby version the gems were installed with
    pub const RUNTIME_VERSION: &str = "runtime_version";
}

/// Which phase a slot serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotRole {
    /// Gems available while building (keeps development/test groups)
    Build,
    /// Gems shipped in the final image
    Launch,
}

impl SlotRole {
    /// Directory and document name of the slot
    pub fn slot_name(&self) -> &'static str {
        match self {
            Self::Build => "build-gems",
            Self::Launch => "launch-gems",
        }
    }

    /// Role flags written to the slot document
    pub fn flags(&self) -> SlotFlags {
        match self {
            Self::Build => SlotFlags {
                build: true,
                launch: false,
                cache: true,
            },
            Self::Launch => SlotFlags {
                build: false,
                launch: true,
                cache: false,
            },
        }
    }

    /// Directory (inside the slot) holding its environment files
    pub fn env_dir(&self) -> &'static str {
        match self {
            Self::Build => "env.build",
            Self::Launch => "env.launch",
        }
    }

    /// Both roles, in the order they must be processed
    pub fn all() -> [Self; 2] {
        [Self::Build, Self::Launch]
    }
}

impl fmt::Display for SlotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Launch => write!(f, "launch"),
        }
    }
}

/// Role flags persisted with a slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotFlags {
    /// Visible to later build steps
    pub build: bool,
    /// Exported into the launch image
    pub launch: bool,
    /// Kept across builds even when not exported
    pub cache: bool,
}

/// Fingerprint metadata of a built slot.
///
/// Always written as a whole; a document missing any of the keys is read
/// back as "never built".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMetadata {
    pub stack: String,
    pub cache_sha: String,
    pub runtime_version: String,
}

impl SlotMetadata {
    /// Build metadata from its parts
    pub fn new(
        stack: impl Into<String>,
        cache_sha: impl Into<String>,
        runtime_version: impl Into<String>,
    ) -> Self {
        Self {
            stack: stack.into(),
            cache_sha: cache_sha.into(),
            runtime_version: runtime_version.into(),
        }
    }

    /// Read metadata from a raw TOML table, requiring every key
    pub fn from_table(table: &toml::Table) -> Option<Self> {
        let get = |key: &str| table.get(key).and_then(|v| v.as_str()).map(str::to_string);

        Some(Self {
            stack: get(keys::STACK)?,
            cache_sha: get(keys::CACHE_SHA)?,
            runtime_version: get(keys::RUNTIME_VERSION)?,
        })
    }
}

/// On-disk form of `<name>.toml`
#[derive(Debug, Default, Serialize, Deserialize)]
struct SlotDocument {
    #[serde(default)]
    build: bool,
    #[serde(default)]
    launch: bool,
    #[serde(default)]
    cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<toml::Table>,
}

/// One persisted, addressable cache directory
#[derive(Debug, Clone)]
pub struct CacheSlot {
    /// Slot name (`build-gems` or `launch-gems`)
    pub name: String,
    /// Which phase the slot serves
    pub role: SlotRole,
    /// Directory owned by this slot
    pub path: PathBuf,
    /// Role flags
    pub flags: SlotFlags,
    /// Metadata recorded by the last build, if any
    pub metadata: Option<SlotMetadata>,
    /// Environment files (`NAME.default` -> value) exported by the slot
    pub env: BTreeMap<String, String>,
}

impl CacheSlot {
    /// Stack recorded by the previous build
    pub fn recorded_stack(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.stack.as_str())
    }

    /// Register an environment default (`NAME.default`)
    pub fn env_default(&mut self, name: &str, value: impl Into<String>) {
        self.env.insert(format!("{}.default", name), value.into());
    }

    /// Clear all content and metadata, leaving an empty directory
    pub async fn reset(&mut self) -> GemlayerResult<()> {
        debug!("Resetting slot {}", self.path.display());

        match fs::remove_dir_all(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(GemlayerError::io(
                    format!("clearing slot {}", self.path.display()),
                    e,
                ))
            }
        }

        fs::create_dir_all(&self.path).await.map_err(|e| {
            GemlayerError::io(format!("creating slot {}", self.path.display()), e)
        })?;

        self.metadata = None;
        self.env.clear();
        Ok(())
    }
}

/// The layers directory holding every slot
#[derive(Debug, Clone)]
pub struct Layers {
    path: PathBuf,
}

impl Layers {
    /// Use `path` as the layers directory
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Layers directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{}.toml", name))
    }

    /// Fetch (or create) the slot for a role.
    ///
    /// Flags always come from the role; metadata comes from the stored
    /// document when it is complete.
    pub async fn get(&self, role: SlotRole) -> GemlayerResult<CacheSlot> {
        let name = role.slot_name();
        let slot_path = self.path.join(name);

        fs::create_dir_all(&slot_path).await.map_err(|e| {
            GemlayerError::io(format!("creating slot {}", slot_path.display()), e)
        })?;

        let metadata = self.read_metadata(name).await?;

        Ok(CacheSlot {
            name: name.to_string(),
            role,
            path: slot_path,
            flags: role.flags(),
            metadata,
            env: BTreeMap::new(),
        })
    }

    /// Read the metadata of a slot without creating anything
    pub async fn peek(&self, role: SlotRole) -> GemlayerResult<Option<SlotMetadata>> {
        self.read_metadata(role.slot_name()).await
    }

    async fn read_metadata(&self, name: &str) -> GemlayerResult<Option<SlotMetadata>> {
        let doc_path = self.document_path(name);

        let content = match fs::read_to_string(&doc_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GemlayerError::io(
                    format!("reading {}", doc_path.display()),
                    e,
                ))
            }
        };

        let doc: SlotDocument =
            toml::from_str(&content).map_err(|e| GemlayerError::LayerInvalid {
                path: doc_path.clone(),
                reason: e.to_string(),
            })?;

        let metadata = doc.metadata.as_ref().and_then(SlotMetadata::from_table);
        if doc.metadata.is_some() && metadata.is_none() {
            debug!(
                "Ignoring incomplete metadata in {}, treating slot as never built",
                doc_path.display()
            );
        }

        Ok(metadata)
    }

    /// Write the slot document and its environment files
    pub async fn persist(&self, slot: &CacheSlot) -> GemlayerResult<()> {
        let metadata = match &slot.metadata {
            Some(m) => Some(toml::Table::try_from(m)?),
            None => None,
        };

        let doc = SlotDocument {
            build: slot.flags.build,
            launch: slot.flags.launch,
            cache: slot.flags.cache,
            metadata,
        };

        let doc_path = self.document_path(&slot.name);
        let content = toml::to_string(&doc)?;
        fs::write(&doc_path, content)
            .await
            .map_err(|e| GemlayerError::io(format!("writing {}", doc_path.display()), e))?;

        if !slot.env.is_empty() {
            let env_dir = slot.path.join(slot.role.env_dir());
            fs::create_dir_all(&env_dir).await.map_err(|e| {
                GemlayerError::io(format!("creating {}", env_dir.display()), e)
            })?;

            for (file, value) in &slot.env {
                let env_path = env_dir.join(file);
                fs::write(&env_path, value).await.map_err(|e| {
                    GemlayerError::io(format!("writing {}", env_path.display()), e)
                })?;
            }
        }

        debug!("Persisted slot {}", doc_path.display());
        Ok(())
    }

    /// Reset a slot and persist its cleared document.
    ///
    /// Afterwards the store reads the slot as never built, even if nothing
    /// else is written for it.
    pub async fn clear(&self, slot: &mut CacheSlot) -> GemlayerResult<()> {
        slot.reset().await?;
        self.persist(slot).await
    }
}
