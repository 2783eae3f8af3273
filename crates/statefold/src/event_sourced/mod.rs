//! Event-sourced entities.
//!
//! An event-sourced entity never stores its state directly: the append-only
//! event log is the source of truth, and state is the fold of that log from
//! [`EventSourcedEntity::empty_state`] through [`EventSourcedEntity::apply`].
//! Command handlers return an [`Effect`] describing what to persist and how
//! to reply; the runner interprets it, appends the events, folds them with
//! the same appliers used during replay, and resolves the reply against the
//! post-fold state.
//!
//! # Example
//!
//! ```ignore
//! struct CounterEntity;
//!
//! impl EventSourcedEntity for CounterEntity {
//!     type State = Counter;
//!     type Command = CounterCommand;
//!     type Event = CounterEvent;
//!     type Reply = i32;
//!
//!     const TYPE: &'static str = "counter";
//!
//!     fn empty_state() -> Counter {
//!         Counter { value: 0 }
//!     }
//!
//!     fn handle(state: &Counter, command: CounterCommand, _ctx: &CommandContext)
//!         -> Effect<Counter, CounterEvent, i32>
//!     {
//!         match command {
//!             CounterCommand::Increase { value } if value % 3 != 0 => {
//!                 Effect::error(format!("wrong value: {value}"))
//!             }
//!             CounterCommand::Increase { value } => {
//!                 Effect::persist(CounterEvent::ValueIncreased { value })
//!                     .then_reply_with(|counter| counter.value)
//!             }
//!             CounterCommand::Get => Effect::reply(state.value),
//!         }
//!     }
//!
//!     fn apply(state: Counter, event: CounterEvent) -> Counter {
//!         match event {
//!             CounterEvent::ValueIncreased { value } => Counter {
//!                 value: state.value + value,
//!             },
//!         }
//!     }
//! }
//! ```

mod dispatch;
mod effect;
pub(crate) mod runner;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub(crate) use dispatch::EventDispatch;
pub use effect::{Effect, Persist};

use crate::context::CommandContext;

/// Exposes the stable event-type tag of each event enum variant.
///
/// The tag keys the replay dispatch table: every tag in [`NAMES`](Self::NAMES)
/// gets a registered applier when an entity definition is built, and a stored
/// event whose tag is absent from the table aborts replay as schema drift.
///
/// Derive with `#[derive(EventName)]` from `statefold-macros`; the variant
/// identifier becomes the tag.
pub trait EventName {
    /// Every event-type tag this enum can produce.
    const NAMES: &'static [&'static str];

    /// The tag of this particular event.
    fn event_name(&self) -> &'static str;
}

/// An entity whose state is the fold of an immutable event log.
///
/// [`handle`](Self::handle) and [`apply`](Self::apply) must be deterministic
/// and side-effect free — no wall-clock reads, no randomness, no I/O. Side
/// effects are expressed through the returned [`Effect`] and performed by the
/// runtime interpreting it.
pub trait EventSourcedEntity: Send + Sync + 'static {
    /// Derived state, reconstructed by replaying events. Never persisted.
    type State: Clone + Send + Sync;

    /// Decoded commands routed to [`handle`](Self::handle).
    type Command: DeserializeOwned + Send;

    /// Facts recorded to the event log.
    type Event: EventName + Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Reply payload returned to the invoker.
    type Reply: Serialize + Send;

    /// Component type identifier, stable across deployments.
    const TYPE: &'static str;

    /// The state before any event has been applied.
    fn empty_state() -> Self::State;

    /// Decide what should happen for a command against the current state.
    fn handle(
        state: &Self::State,
        command: Self::Command,
        ctx: &CommandContext,
    ) -> Effect<Self::State, Self::Event, Self::Reply>;

    /// Fold one event into the state.
    ///
    /// Used both for replay and for folding freshly persisted events, which
    /// is what guarantees replay equivalence.
    fn apply(state: Self::State, event: Self::Event) -> Self::State;
}
