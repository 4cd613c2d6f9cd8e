//! Persistent gem cache slots
//!
//! Two slots live under the layers directory: `build-gems` for the build
//! phase and `launch-gems` for the final image. Each records the cache key
//! it was built with.
//!
//! # Cache Key
//!
//! - SHA256 fingerprint of `Gemfile` + `Gemfile.lock` (empty when there is
//!   no lockfile)
//! - Ruby major.minor (patch upgrades keep the cache)
//! - Stack identity (a different stack clears the slot)
//!
//! # Slot States
//!
//! | State | Description |
//! |-------|-------------|
//! | NotNeeded | Role not requested by the build plan |
//! | Fetched | Slot directory and document loaded |
//! | StackInvalidated | Recorded stack differs, slot cleared |
//! | DecidedReuse | Key matches, nothing runs |
//! | DecidedRebuild | Key differs, install will run |
//! | Rebuilt | Install finished, new metadata recorded |

pub mod checksum;
pub mod slot;

pub use checksum::{ChecksumCalculator, Sha256Calculator};
pub use slot::{keys, CacheSlot, Layers, SlotFlags, SlotMetadata, SlotRole};
