//! Workflow transition engine.
//!
//! Interprets command effects, drives step chains, and owns the persistence
//! protocol: the snapshot is written atomically *before* a step call is
//! issued, the per-instance lock is released while the call is awaited, and
//! the outcome is interpreted only if the instance's epoch did not move in
//! the meantime. A superseded outcome is discarded; the command that
//! superseded it drives the new chain.

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use super::effect::{EffectKind, Transition};
use super::{Workflow, WorkflowDef, WorkflowSnapshot, WorkflowStatus};
use crate::component::{ComponentRef, EntityId};
use crate::context::{CommandContext, WorkflowContext};
use crate::error::{Error, Result};
use crate::runtime::locks::LockMap;
use crate::store::StateStore;

/// Result of running one command through the engine.
pub(crate) struct CommandOutcome<R> {
    /// The reply chosen by the command handler.
    pub reply: R,
    /// Names of the steps entered while driving the chain, in order.
    pub steps_entered: Vec<String>,
}

/// Execute one command against a workflow instance.
///
/// Runs the handler against the decoded snapshot, interprets the effect, and
/// — if the effect transitioned into a step — drives the step chain until
/// the instance pauses, ends, or is superseded by a newer command.
pub(crate) async fn execute<W, S>(
    workflow: &W,
    def: &WorkflowDef<W::State>,
    store: &S,
    locks: &LockMap,
    ctx: CommandContext,
    command: W::Command,
) -> Result<CommandOutcome<W::Reply>>
where
    W: Workflow,
    S: StateStore,
{
    let component = ComponentRef::new(W::TYPE, ctx.entity_id().clone());
    let guard = locks.acquire(&component).await;

    let (revision, mut snapshot) = load(store, &component).await?;
    let command_id = ctx.command_id();
    let workflow_ctx = WorkflowContext::new(
        ctx,
        snapshot.current_step_name().map(str::to_owned),
        snapshot.finished(),
    );

    let state = decode_state::<W>(&snapshot)?;
    let effect = workflow.handle(state.as_ref(), command, &workflow_ctx);

    match effect.kind {
        EffectKind::Error(message) => {
            debug!(component = %component, command_id = %command_id, "command rejected");
            Err(Error::CommandRejected(message))
        }
        EffectKind::Reply(reply) => Ok(CommandOutcome {
            reply,
            steps_entered: Vec::new(),
        }),
        EffectKind::Transitional {
            update,
            transition,
            reply,
        } => {
            if snapshot.finished() {
                return Err(Error::WorkflowFinished { component });
            }

            if let Some(new_state) = update {
                snapshot.state = Some(serde_json::to_value(&new_state)?);
            }
            apply_transition(def, &component, &mut snapshot, transition, None)?;
            let revision = persist(store, &component, revision, &snapshot).await?;

            let steps_entered =
                drive::<W, S>(def, store, locks, &component, guard, snapshot, revision).await?;
            Ok(CommandOutcome {
                reply,
                steps_entered,
            })
        }
    }
}

/// Re-issue the pending step call of an instance persisted as running.
///
/// Recovery entrypoint: after a crash or a step failure, the snapshot still
/// says `Running { step, input }`, and this drives the chain from there.
/// A no-op for instances that are not running.
pub(crate) async fn resume<W, S>(
    def: &WorkflowDef<W::State>,
    store: &S,
    locks: &LockMap,
    entity_id: EntityId,
) -> Result<Vec<String>>
where
    W: Workflow,
    S: StateStore,
{
    let component = ComponentRef::new(W::TYPE, entity_id);
    let guard = locks.acquire(&component).await;

    let Some((revision, snapshot)) = load_existing(store, &component).await? else {
        return Ok(Vec::new());
    };
    if !matches!(snapshot.status, WorkflowStatus::Running { .. }) {
        return Ok(Vec::new());
    }

    info!(component = %component, step = ?snapshot.current_step_name(), "resuming pending step");
    drive::<W, S>(def, store, locks, &component, guard, snapshot, revision).await
}

/// Drive the step chain until the instance leaves the running status.
///
/// The lock is released across each call await and re-acquired to interpret
/// the outcome; the epoch check guards against a command that transitioned
/// the instance while the call was in flight.
async fn drive<W, S>(
    def: &WorkflowDef<W::State>,
    store: &S,
    locks: &LockMap,
    component: &ComponentRef,
    mut guard: OwnedMutexGuard<()>,
    mut snapshot: WorkflowSnapshot,
    mut revision: u64,
) -> Result<Vec<String>>
where
    W: Workflow,
    S: StateStore,
{
    let mut entered = Vec::new();

    loop {
        let WorkflowStatus::Running { step, input } = &snapshot.status else {
            break;
        };
        let step_name = step.clone();
        let input = input.clone();
        let epoch = snapshot.epoch;

        let step_def = def.step(&step_name).ok_or_else(|| Error::UnknownStep {
            component: component.clone(),
            step: step_name.clone(),
        })?;
        let call = step_def.call.clone();
        entered.push(step_name.clone());

        debug!(component = %component, step = %step_name, "executing step call");
        drop(guard);
        let call_result = call(input).await;
        guard = locks.acquire(component).await;

        let Some((new_revision, new_snapshot)) = load_existing(store, component).await? else {
            break;
        };
        revision = new_revision;
        snapshot = new_snapshot;

        if snapshot.epoch != epoch {
            warn!(
                component = %component,
                step = %step_name,
                "discarding superseded step outcome"
            );
            break;
        }

        let output = match call_result {
            Ok(output) => output,
            Err(source) => {
                // The snapshot still says Running at this step; resume can
                // re-issue the call.
                warn!(component = %component, step = %step_name, error = %source, "step call failed");
                return Err(Error::StepFailed {
                    component: component.clone(),
                    step: step_name,
                    message: format!("{source:#}"),
                });
            }
        };

        let state = decode_state::<W>(&snapshot)?;
        let effect = (step_def.transform)(state.as_ref(), output)?;

        if let Some(new_state) = effect.update {
            snapshot.state = Some(serde_json::to_value(&new_state)?);
        }
        snapshot.last_completed_step = Some(step_name.clone());
        apply_transition(def, component, &mut snapshot, effect.transition, Some(step_name))?;
        revision = persist(store, component, revision, &snapshot).await?;

        if snapshot.finished() {
            debug!(component = %component, "workflow finished");
        }
    }

    Ok(entered)
}

/// Apply a terminal transition to the snapshot and bump its epoch.
///
/// `completed_step` is the step whose transformation produced the transition,
/// when it came out of a step rather than a command handler; a pause retains
/// that identity so a later command can resume from it.
fn apply_transition<S>(
    def: &WorkflowDef<S>,
    component: &ComponentRef,
    snapshot: &mut WorkflowSnapshot,
    transition: Transition,
    completed_step: Option<String>,
) -> Result<()> {
    match transition {
        Transition::To { step, input } => {
            if !def.contains_step(&step) {
                return Err(Error::UnknownStep {
                    component: component.clone(),
                    step,
                });
            }
            snapshot.status = WorkflowStatus::Running {
                step,
                input: input?,
            };
        }
        Transition::Pause => {
            let step =
                completed_step.or_else(|| snapshot.current_step_name().map(str::to_owned));
            snapshot.status = WorkflowStatus::Paused { step };
        }
        Transition::End => {
            snapshot.status = WorkflowStatus::Finished;
        }
    }
    snapshot.epoch += 1;
    Ok(())
}

async fn load<S: StateStore>(
    store: &S,
    component: &ComponentRef,
) -> Result<(u64, WorkflowSnapshot)> {
    Ok(load_existing(store, component)
        .await?
        .unwrap_or((0, WorkflowSnapshot::new())))
}

async fn load_existing<S: StateStore>(
    store: &S,
    component: &ComponentRef,
) -> Result<Option<(u64, WorkflowSnapshot)>> {
    match store.load_state(component).await? {
        Some(versioned) => Ok(Some((
            versioned.revision,
            serde_json::from_value(versioned.payload)?,
        ))),
        None => Ok(None),
    }
}

async fn persist<S: StateStore>(
    store: &S,
    component: &ComponentRef,
    revision: u64,
    snapshot: &WorkflowSnapshot,
) -> Result<u64> {
    store
        .persist_state(component, revision, serde_json::to_value(snapshot)?)
        .await
}

fn decode_state<W: Workflow>(snapshot: &WorkflowSnapshot) -> Result<Option<W::State>> {
    snapshot
        .state
        .as_ref()
        .map(|value| serde_json::from_value(value.clone()))
        .transpose()
        .map_err(Error::from)
}
