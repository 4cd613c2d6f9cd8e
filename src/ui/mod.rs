//! UI module for buildpack progress output
//!
//! Output follows the indented buildpack log layout so it reads naturally in
//! platform build logs. Styling is only applied on an interactive terminal.
//!
//! # Example
//!
//! ```rust,ignore
//! use gemlayer::ui::{LogEmitter, UiContext};
//!
//! let emitter = LogEmitter::stdout(UiContext::detect());
//! emitter.title("Bundle Install", "0.3.0");
//! emitter.process("Executing build environment install process");
//! emitter.subprocess("Running 'bundle install'");
//! ```

mod context;
mod emitter;

pub use context::UiContext;
pub use emitter::{format_duration, LogEmitter, SharedBuffer};
