//! CLI argument definitions using clap derive

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// gemlayer - cached bundle install for buildpack builds
///
/// Installs an application's gems into a build slot and a launch slot,
/// reusing previous installs while Gemfile.lock, the ruby major.minor and
/// the stack stay the same.
#[derive(Parser, Debug)]
#[command(name = "gemlayer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Diagnostic log format
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install gems into the requested slots, reusing them when possible
    Build(BuildArgs),

    /// Show what a build would do with each slot
    Status(StatusArgs),
}

/// Where the build runs and which tools it uses
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Application source directory (defaults to current directory)
    #[arg(short, long, env = "CNB_APP_DIR")]
    pub working_dir: Option<PathBuf>,

    /// Directory holding the cache slots
    #[arg(short, long, env = "CNB_LAYERS_DIR")]
    pub layers_dir: PathBuf,

    /// Build plan file
    #[arg(short, long, env = "CNB_BP_PLAN_PATH")]
    pub plan: PathBuf,

    /// Stack identity; a change clears cached gems
    #[arg(long, env = "CNB_STACK_ID", default_value = "")]
    pub stack: String,

    /// Directory containing buildpack.toml
    #[arg(long, env = "CNB_BUILDPACK_DIR")]
    pub buildpack_dir: Option<PathBuf>,

    /// Bundler executable
    #[arg(long, default_value = "bundle")]
    pub bundle: String,

    /// Ruby executable
    #[arg(long, default_value = "ruby")]
    pub ruby: String,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Output format for the status command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

/// Format of tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
