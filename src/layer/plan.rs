//! Build plan requirements
//!
//! Several buildpacks may ask for gems; each entry can request them at build
//! time, at launch, or both. The requirements are OR-ed together.

use crate::cache::SlotRole;
use crate::config::schema::{BuildpackPlan, GEMS_ENTRY};
use serde::Serialize;

/// Phases gems are needed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayerTypes {
    pub build: bool,
    pub launch: bool,
}

impl LayerTypes {
    /// Whether the slot serving `role` is needed
    pub fn needs(&self, role: SlotRole) -> bool {
        match role {
            SlotRole::Build => self.build,
            SlotRole::Launch => self.launch,
        }
    }
}

/// Merge every entry named `name`
pub fn merge_layer_types(plan: &BuildpackPlan, name: &str) -> LayerTypes {
    plan.entries_named(name)
        .fold(LayerTypes::default(), |types, entry| LayerTypes {
            build: types.build || entry.metadata.build,
            launch: types.launch || entry.metadata.launch,
        })
}

/// Merge the `gems` entries
pub fn gem_layer_types(plan: &BuildpackPlan) -> LayerTypes {
    merge_layer_types(plan, GEMS_ENTRY)
}
