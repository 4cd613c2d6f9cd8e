//! Two-slot build
//!
//! Runs the build slot first, then the launch slot. A launch slot that must
//! be rebuilt starts from a copy of the build slot, so bundler only has to
//! drop the development and test groups instead of installing everything
//! again.

use crate::cache::{CacheSlot, Layers, SlotMetadata, SlotRole};
use crate::config::{BuildpackInfo, BuildpackPlan, Environment};
use crate::error::{GemlayerError, GemlayerResult};
use crate::install::scope::{self, projected_config, USER_CONFIG_ENV};
use crate::install::{InstallDecision, InstallDirectives, InstallProcess};
use crate::layer::plan::gem_layer_types;
use crate::ui::{format_duration, LogEmitter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Environment directories written for a slot's own phase
const SLOT_ENV_DIRS: [&str; 3] = ["env", "env.build", "env.launch"];

/// Everything a build needs to know about its surroundings
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Application source tree
    pub working_dir: PathBuf,
    /// Slot store
    pub layers: Layers,
    /// Current stack identity
    pub stack: String,
    /// Resolved build plan
    pub plan: BuildpackPlan,
    /// Identity printed in the log title
    pub buildpack: BuildpackInfo,
}

/// Where a slot ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// Not requested by the plan
    NotNeeded,
    /// Loaded from the store
    Fetched,
    /// Built against another stack and cleared
    StackInvalidated,
    /// Cache key matches; nothing ran
    DecidedReuse,
    /// Cache key differs; install pending
    DecidedRebuild,
    /// Installed and recorded
    Rebuilt,
}

/// A slot after the build
#[derive(Debug, Clone)]
pub struct SlotOutcome {
    pub slot: CacheSlot,
    pub state: SlotState,
    /// The recorded stack differed and the slot was cleared first
    pub stack_invalidated: bool,
}

/// Slots produced by a build, build slot first
#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    pub slots: Vec<SlotOutcome>,
}

impl BuildResult {
    /// Final state of the slot serving `role`
    pub fn state(&self, role: SlotRole) -> SlotState {
        self.slot(role)
            .map(|outcome| outcome.state)
            .unwrap_or(SlotState::NotNeeded)
    }

    pub fn slot(&self, role: SlotRole) -> Option<&SlotOutcome> {
        self.slots.iter().find(|outcome| outcome.slot.role == role)
    }
}

/// Read-only view of what a build would do with a slot
#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    pub role: SlotRole,
    pub name: &'static str,
    pub state: SlotState,
    /// Metadata currently recorded with the slot
    pub recorded: Option<SlotMetadata>,
    /// Cache key of the current tree, when the slot is needed
    pub current: Option<InstallDecision>,
}

/// Install (or reuse) the gem slots requested by the plan.
///
/// Any failure aborts the whole build; slots already persisted keep what was
/// written for them.
pub async fn build(
    ctx: &BuildContext,
    process: &dyn InstallProcess,
    env: &Environment,
    emitter: &LogEmitter,
) -> GemlayerResult<BuildResult> {
    emitter.title(&ctx.buildpack.name, &ctx.buildpack.version);

    let types = gem_layer_types(&ctx.plan);
    debug!("Gems needed: build={} launch={}", types.build, types.launch);

    let mut result = BuildResult::default();
    let mut finished_build_slot: Option<PathBuf> = None;

    for role in SlotRole::all() {
        if !types.needs(role) {
            debug!("{} slot not needed", role);
            continue;
        }

        let copy_from = match role {
            SlotRole::Launch => finished_build_slot.as_deref(),
            SlotRole::Build => None,
        };

        let outcome = build_slot(ctx, process, env, emitter, role, copy_from).await?;
        if role == SlotRole::Build {
            finished_build_slot = Some(outcome.slot.path.clone());
        }
        result.slots.push(outcome);
    }

    scope::cleanup(&ctx.working_dir).await?;

    Ok(result)
}

async fn build_slot(
    ctx: &BuildContext,
    process: &dyn InstallProcess,
    env: &Environment,
    emitter: &LogEmitter,
    role: SlotRole,
    copy_from: Option<&Path>,
) -> GemlayerResult<SlotOutcome> {
    let mut slot = ctx.layers.get(role).await?;
    let mut state = SlotState::Fetched;

    let stale_stack = slot
        .recorded_stack()
        .filter(|recorded| *recorded != ctx.stack)
        .map(str::to_string);

    if let Some(recorded) = &stale_stack {
        emitter.process(&format!(
            "Stack upgraded from {} to {}, clearing cached gems",
            recorded, ctx.stack
        ));
        ctx.layers.clear(&mut slot).await?;
        state = SlotState::StackInvalidated;
    }
    let stack_invalidated = stale_stack.is_some();
    debug!("{} slot {:?}", role, state);

    let decision = process
        .should_run(slot.metadata.as_ref(), &ctx.working_dir)
        .await?;

    slot.env_default(
        USER_CONFIG_ENV,
        projected_config(&slot.path).display().to_string(),
    );

    if !decision.should_run && !stack_invalidated {
        emitter.process(&format!("Reusing cached layer {}", slot.path.display()));
        emitter.break_line();
        ctx.layers.persist(&slot).await?;

        return Ok(SlotOutcome {
            slot,
            state: SlotState::DecidedReuse,
            stack_invalidated,
        });
    }
    debug!("{} slot {:?}", role, SlotState::DecidedRebuild);

    if let Some(source) = copy_from {
        debug!(
            "Seeding {} from {}",
            slot.path.display(),
            source.display()
        );
        let (source, dest) = (source.to_path_buf(), slot.path.clone());
        tokio::task::spawn_blocking(move || copy_tree(&source, &dest, &SLOT_ENV_DIRS))
            .await
            .map_err(|e| GemlayerError::Internal(format!("seeding slot: {}", e)))??;
    }

    emitter.process(&format!("Executing {} environment install process", role));
    let started = Instant::now();

    let directives = InstallDirectives::for_role(role, &slot.path);
    process
        .execute(&ctx.working_dir, &slot.path, &directives, env.keep_build_files)
        .await?;

    emitter.action(&format!("Completed in {}", format_duration(started.elapsed())));
    emitter.break_line();

    slot.metadata = Some(SlotMetadata::new(
        ctx.stack.clone(),
        decision.checksum,
        decision.runtime_version,
    ));
    emitter.environment(&role.to_string(), &slot.env);
    ctx.layers.persist(&slot).await?;

    info!("Installed gems into {}", slot.path.display());

    Ok(SlotOutcome {
        slot,
        state: SlotState::Rebuilt,
        stack_invalidated,
    })
}

/// Report what a build would do with each slot, without touching the slots
/// or running the installer
pub async fn inspect(
    ctx: &BuildContext,
    process: &dyn InstallProcess,
) -> GemlayerResult<Vec<SlotReport>> {
    let types = gem_layer_types(&ctx.plan);
    let mut reports = Vec::new();

    for role in SlotRole::all() {
        let recorded = ctx.layers.peek(role).await?;

        if !types.needs(role) {
            reports.push(SlotReport {
                role,
                name: role.slot_name(),
                state: SlotState::NotNeeded,
                recorded,
                current: None,
            });
            continue;
        }

        let stale_stack = recorded
            .as_ref()
            .is_some_and(|metadata| metadata.stack != ctx.stack);
        let prior = if stale_stack { None } else { recorded.as_ref() };

        let decision = process.should_run(prior, &ctx.working_dir).await?;
        let state = if stale_stack {
            SlotState::StackInvalidated
        } else if decision.should_run {
            SlotState::DecidedRebuild
        } else {
            SlotState::DecidedReuse
        };

        reports.push(SlotReport {
            role,
            name: role.slot_name(),
            state,
            recorded,
            current: Some(decision),
        });
    }

    Ok(reports)
}

/// Copy the content of `source` into `dest`, overwriting files that exist in
/// both. Top-level entries named in `skip` are left out; symlinks are copied
/// as links.
pub fn copy_tree(source: &Path, dest: &Path, skip: &[&str]) -> GemlayerResult<()> {
    let walker = WalkDir::new(source).min_depth(1).into_iter().filter_entry(|entry| {
        entry.depth() != 1
            || !entry
                .file_name()
                .to_str()
                .is_some_and(|name| skip.contains(&name))
    });

    for entry in walker {
        let entry = entry.map_err(|e| {
            GemlayerError::io(format!("walking {}", source.display()), e.into())
        })?;

        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| GemlayerError::Internal(e.to_string()))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        let copied = if file_type.is_dir() {
            std::fs::create_dir_all(&target)
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)
        } else {
            std::fs::copy(entry.path(), &target).map(|_| ())
        };

        copied.map_err(|e| {
            GemlayerError::io(
                format!(
                    "copying {} to {}",
                    entry.path().display(),
                    target.display()
                ),
                e,
            )
        })?;
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    let points_to = std::fs::read_link(link)?;
    match std::fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::os::unix::fs::symlink(points_to, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::copy(link, target).map(|_| ())
}
