//! Value (key-value) entities.
//!
//! The simpler sibling of the event-sourced entity: state is stored directly
//! and replaced atomically on each accepted command, with no event log. Use
//! it when history is not worth the bookkeeping — auditability traded for
//! simplicity.

mod effect;
pub(crate) mod runner;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use effect::{DeleteState, Effect, UpdateState};

use crate::context::CommandContext;

/// An entity whose state is stored directly and overwritten per command.
///
/// [`handle`](Self::handle) must be deterministic and side-effect free; an
/// update effect replaces the stored state atomically, and an error effect
/// leaves it untouched.
pub trait ValueEntity: Send + Sync + 'static {
    /// Stored state. Serialized as a whole on every accepted update.
    type State: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Decoded commands routed to [`handle`](Self::handle).
    type Command: DeserializeOwned + Send;

    /// Reply payload returned to the invoker.
    type Reply: Serialize + Send;

    /// Component type identifier, stable across deployments.
    const TYPE: &'static str;

    /// The state of an instance no command has touched yet.
    fn empty_state() -> Self::State;

    /// Decide what should happen for a command against the current state.
    fn handle(
        state: &Self::State,
        command: Self::Command,
        ctx: &CommandContext,
    ) -> Effect<Self::State, Self::Reply>;
}
