//! Layer orchestration
//!
//! Decides per slot whether cached gems can be reused, installs them when
//! they cannot, and records the cache key each slot was built with.

pub mod orchestrate;
pub mod plan;

pub use orchestrate::{
    build, copy_tree, inspect, BuildContext, BuildResult, SlotOutcome, SlotReport, SlotState,
};
pub use plan::{gem_layer_types, merge_layer_types, LayerTypes};
