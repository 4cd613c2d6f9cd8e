//! Build plan and buildpack descriptor schemas
//!
//! The plan is handed to the build by the platform (`CNB_BP_PLAN_PATH`):
//!
//! ```toml
//! [[entries]]
//! name = "gems"
//!
//! [entries.metadata]
//! build = true
//! launch = true
//! ```

use serde::{Deserialize, Serialize};

/// Name of the plan entries requesting installed gems
pub const GEMS_ENTRY: &str = "gems";

/// Requirements resolved for this buildpack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildpackPlan {
    pub entries: Vec<PlanEntry>,
}

impl BuildpackPlan {
    /// Entries with the given name
    pub fn entries_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PlanEntry> {
        self.entries.iter().filter(move |entry| entry.name == name)
    }
}

/// One requirement placed by this or a later buildpack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,

    #[serde(default)]
    pub metadata: PlanEntryMetadata,
}

impl PlanEntry {
    /// Entry with the given phase requirements
    pub fn new(name: impl Into<String>, build: bool, launch: bool) -> Self {
        Self {
            name: name.into(),
            metadata: PlanEntryMetadata { build, launch },
        }
    }
}

/// Phases an entry is needed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanEntryMetadata {
    /// Needed by later build steps
    pub build: bool,

    /// Needed in the final image
    pub launch: bool,
}

/// `buildpack.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildpackDescriptor {
    pub buildpack: BuildpackInfo,
}

/// Identity printed in the build log title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildpackInfo {
    pub id: String,
    pub name: String,
    pub version: String,
}

impl Default for BuildpackInfo {
    fn default() -> Self {
        Self {
            id: "gemlayer/bundle-install".to_string(),
            name: "Bundle Install".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
