//! CLI command implementations

pub mod build;
pub mod status;

pub use build::execute as build;
pub use status::execute as status;

use crate::cache::{Layers, Sha256Calculator};
use crate::cli::args::SourceArgs;
use crate::config;
use crate::error::{GemlayerError, GemlayerResult};
use crate::install::{BundleInstallProcess, CommandExecutable, RubyVersionResolver};
use crate::layer::BuildContext;
use crate::ui::LogEmitter;
use tracing::debug;

/// Install process backed by the real bundler and ruby
pub type SystemInstallProcess =
    BundleInstallProcess<CommandExecutable, RubyVersionResolver<CommandExecutable>, Sha256Calculator>;

/// Resolve paths and load the plan and buildpack descriptor
pub async fn build_context(source: &SourceArgs) -> GemlayerResult<BuildContext> {
    let working_dir = match &source.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| GemlayerError::io("getting current directory", e))?,
    };

    let plan = config::load_plan(&source.plan).await?;
    let buildpack = config::load_buildpack_info(source.buildpack_dir.as_deref()).await?;

    debug!(
        "Working dir {}, layers {}, stack {:?}",
        working_dir.display(),
        source.layers_dir.display(),
        source.stack
    );

    Ok(BuildContext {
        working_dir,
        layers: Layers::new(&source.layers_dir),
        stack: source.stack.clone(),
        plan,
        buildpack,
    })
}

/// Wire the install process to the configured executables
pub fn install_process(source: &SourceArgs, emitter: LogEmitter) -> SystemInstallProcess {
    BundleInstallProcess::new(
        CommandExecutable::new(&source.bundle),
        RubyVersionResolver::new(CommandExecutable::new(&source.ruby)),
        Sha256Calculator::new(),
        emitter,
    )
}
