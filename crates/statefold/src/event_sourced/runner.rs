//! Command execution cycle for event-sourced entities.

use tracing::debug;

use super::dispatch::EventDispatch;
use super::effect::Terminal;
use super::EventSourcedEntity;
use crate::component::{ComponentRef, ForwardRequest, Outcome};
use crate::context::CommandContext;
use crate::error::{Error, Result};
use crate::event_sourced::EventName;
use crate::runtime::locks::LockMap;
use crate::store::{EventStore, NewEvent};

/// Execute one command against an event-sourced entity.
///
/// The cycle:
/// 1. Acquire the per-instance lock.
/// 2. Load the event log and replay it into the current state.
/// 3. Run the business handler, producing an effect.
/// 4. Interpret the effect: append staged events with the expected sequence
///    (all-or-nothing, optimistic), fold them with the same appliers used in
///    replay, and resolve the terminal reply against the post-fold state.
///
/// An error effect aborts with nothing persisted; concurrent log movement
/// surfaces as a sequence conflict with nothing persisted either.
pub(crate) async fn execute<C, S>(
    store: &S,
    locks: &LockMap,
    dispatch: &EventDispatch<C>,
    ctx: CommandContext,
    command: C::Command,
) -> Result<Outcome<C::Reply>>
where
    C: EventSourcedEntity,
    S: EventStore,
{
    let component = ComponentRef::new(C::TYPE, ctx.entity_id().clone());
    let _guard = locks.acquire(&component).await;

    let log = store.load_events(&component).await?;
    let sequence = log.last().map(|event| event.sequence).unwrap_or(0);
    let state = dispatch.replay(&component, &log)?;

    let effect = C::handle(&state, command, &ctx);
    let (staged, terminal) = effect.into_parts();

    if let Terminal::Error(message) = terminal {
        debug!(component = %component, command_id = %ctx.command_id(), "command rejected");
        return Err(Error::CommandRejected(message));
    }

    // Append first, fold with the replay appliers second: the state handed to
    // the reply is exactly what a fresh replay would reconstruct.
    let state = match staged {
        Some(events) => {
            let batch: Vec<NewEvent> = events
                .iter()
                .map(|event| {
                    Ok(NewEvent {
                        event_type: event.event_name().to_string(),
                        payload: serde_json::to_value(event)?,
                    })
                })
                .collect::<Result<_>>()?;

            let appended = batch.len();
            store.append_events(&component, sequence, batch).await?;
            debug!(
                component = %component,
                command_id = %ctx.command_id(),
                events = appended,
                "events appended"
            );

            events.into_iter().fold(state, C::apply)
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
