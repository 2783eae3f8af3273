//! Deterministic in-process simulation harness.
//!
//! The test kits substitute for the external invoker and the persistence
//! layer: each `handle` call runs a command through the *same* runner or
//! engine code the service uses, against an in-memory store, and returns an
//! assertion-friendly result object — the reply or rejection, the events
//! appended, the post-command state, and (for workflows) the steps entered.
//!
//! Determinism: the harness pins the invocation clock to the epoch and
//! derives command ids from an invocation counter, so two identical command
//! sequences produce identical results. Business rejections land inside the
//! result object; configuration and infrastructure failures surface as
//! `Err`, matching the error taxonomy of the real service.
//!
//! # Example
//!
//! ```ignore
//! let mut kit = EventSourcedTestKit::<CounterEntity>::new()?;
//!
//! let rejected = kit.handle(CounterCommand::Increase { value: 5 }).await?;
//! assert_eq!(rejected.error(), "wrong value: 5");
//!
//! let result = kit.handle(CounterCommand::Increase { value: 6 }).await?;
//! assert_eq!(*result.reply(), 6);
//! assert_eq!(result.state().value, 6);
//! ```

mod event_sourced;
mod value_entity;
mod workflow;

pub use event_sourced::{EventSourcedResult, EventSourcedTestKit};
pub use value_entity::{ValueEntityResult, ValueEntityTestKit};
pub use workflow::{WorkflowResult, WorkflowTestKit};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::component::EntityId;
use crate::context::{CommandContext, Metadata};

/// Default entity id used by kits created without an explicit id.
pub(crate) const DEFAULT_ENTITY_ID: &str = "testkit-entity";

/// Build a deterministic command context for the nth invocation.
pub(crate) fn command_context(
    entity_id: &EntityId,
    invocation: u64,
    metadata: Metadata,
) -> CommandContext {
    CommandContext::new(
        entity_id.clone(),
        Uuid::from_u128(invocation as u128),
        metadata,
        OffsetDateTime::UNIX_EPOCH,
    )
}
