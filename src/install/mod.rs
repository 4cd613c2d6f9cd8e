//! Gem installation
//!
//! `should_run` compares a slot's recorded cache key with the current source
//! tree; `execute` runs bundler against a slot with the developer's local
//! configuration projected into it.
//!
//! # Install Sequence
//!
//! 1. Project `.bundle/config` into `<slot>/config` (backup in `.bundle/config.bak`)
//! 2. `bundle config --global <key> <value>` for each directive, by key
//! 3. `bundle config --global cache_path --parseable`
//! 4. `bundle install`, with `--local` when the vendored cache exists
//! 5. Restore `.bundle/config` from the backup

pub mod directives;
pub mod executable;
pub mod process;
pub mod scope;
pub mod version;

pub use directives::InstallDirectives;
pub use executable::{CommandExecutable, Executable, Execution, ExecutionOutput};
pub use process::{BundleInstallProcess, InstallDecision, InstallProcess};
pub use scope::ConfigScope;
pub use version::{RubyVersionResolver, VersionResolver};
