//! Command execution cycle for value entities.

use tracing::debug;

use super::effect::{StateOp, Terminal};
use super::ValueEntity;
use crate::component::{ComponentRef, ForwardRequest, Outcome};
use crate::context::CommandContext;
use crate::error::{Error, Result};
use crate::runtime::locks::LockMap;
use crate::store::StateStore;

/// Execute one command against a value entity.
///
/// Loads the stored state (or the empty state for an unseen instance), runs
/// the business handler, and interprets the effect: an update replaces the
/// stored value under the loaded revision, a delete removes it, and an error
/// leaves the store untouched.
pub(crate) async fn execute<C, S>(
    store: &S,
    locks: &LockMap,
    ctx: CommandContext,
    command: C::Command,
) -> Result<Outcome<C::Reply>>
where
    C: ValueEntity,
    S: StateStore,
{
    let component = ComponentRef::new(C::TYPE, ctx.entity_id().clone());
    let _guard = locks.acquire(&component).await;

    let stored = store.load_state(&component).await?;
    let (revision, state) = match stored {
        Some(versioned) => (
            versioned.revision,
            serde_json::from_value(versioned.payload)?,
        ),
        None => (0, C::empty_state()),
    };

    let effect = C::handle(&state, command, &ctx);
    let (op, terminal) = effect.into_parts();

    if let Terminal::Error(message) = terminal {
        debug!(component = %component, command_id = %ctx.command_id(), "command rejected");
        return Err(Error::CommandRejected(message));
    }

    let state = match op {
        Some(StateOp::Update(new_state)) => {
            let payload = serde_json::to_value(&new_state)?;
            store.persist_state(&component, revision, payload).await?;
            debug!(component = %component, command_id = %ctx.command_id(), "state updated");
            new_state
        }
        Some(StateOp::Delete) => {
            store.delete_state(&component, revision).await?;
            debug!(component = %component, command_id = %ctx.command_id(), "state deleted");
            C::empty_state()
        }
        None => state,
    };

    match terminal {
        Terminal::Reply(reply) => Ok(Outcome::Reply(reply.resolve(&state))),
        Terminal::Forward { target, payload } => Ok(Outcome::Forward(ForwardRequest {
            target,
            payload: payload?,
        })),
        Terminal::Error(_) => unreachable!("error terminal handled before persistence"),
    }
}
