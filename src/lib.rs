//! gemlayer - cached bundle install for buildpack builds
//!
//! Installs an application's gems into persistent build and launch cache
//! slots, skipping the install when the Gemfile fingerprint, the ruby
//! major.minor and the stack are unchanged.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
#[cfg(test)]
pub(crate) mod fakes;
pub mod install;
pub mod layer;
pub mod ui;

pub use error::{GemlayerError, GemlayerResult};
