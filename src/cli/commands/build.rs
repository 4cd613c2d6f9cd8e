//! Build command - install or reuse the gem slots

use super::{build_context, install_process};
use crate::cli::args::BuildArgs;
use crate::config::Environment;
use crate::error::GemlayerResult;
use crate::layer::{self, SlotState};
use crate::ui::{LogEmitter, UiContext};
use tracing::info;

/// Execute the build command
pub async fn execute(args: BuildArgs, env: &Environment) -> GemlayerResult<()> {
    let ctx = build_context(&args.source).await?;
    let emitter = LogEmitter::stdout(UiContext::detect());
    let process = install_process(&args.source, emitter.clone());

    let result = layer::build(&ctx, &process, env, &emitter).await?;

    let rebuilt = result
        .slots
        .iter()
        .filter(|outcome| outcome.state == SlotState::Rebuilt)
        .count();
    info!(
        "{} slot(s) processed, {} rebuilt",
        result.slots.len(),
        rebuilt
    );

    Ok(())
}
