//! Stateful components with a declarative effect algebra.
//!
//! Statefold lets a service declare **event-sourced entities**, **value
//! entities**, and **multi-step workflows** whose command handlers never
//! mutate state directly: they return an effect describing what should happen
//! — persist events, replace state, transition to a step, pause, end, reply,
//! reject, or forward — and the runtime interprets it.
//!
//! - **Pure functional core** — handlers and event appliers are deterministic
//!   with no side effects
//! - **Event sourcing** — entity state is reconstructed by replaying events
//!   through the same appliers that fold freshly persisted ones
//! - **Workflow engine** — named steps with async calls, driven through a
//!   persisted state machine with at-least-once step execution
//! - **Simulation harness** — test kits drive the real runners over an
//!   in-memory store, deterministically and network-free
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                         StatefoldService                               │
//! │                                                                        │
//! │   invoke(type, id, command, metadata)                                  │
//! │     1. Route to the registered component entry                         │
//! │     2. Acquire the per-instance lock                                   │
//! │     3. Load + replay (event-sourced) / load state (value, workflow)    │
//! │     4. handle(state, command, ctx) → Effect                            │
//! │     5. Interpret: append events / replace state / drive step chain     │
//! │     6. Resolve the terminal reply (or resolve forwards, bounded)       │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use statefold::event_sourced::{Effect, EventSourcedEntity};
//! use statefold::{CommandContext, EventName};
//!
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
//!
//! let service = StatefoldService::builder(MemoryStore::new())
//!     .register_event_sourced::<CounterEntity>()
//!     .build()?;
//! ```
//!
//! # Design Documentation
//!
//! See `DESIGN.md` for architectural decisions.

// Allow the crate to reference itself as `statefold` for macro-generated code
extern crate self as statefold;

mod component;
mod context;
mod error;
pub mod event_sourced;
mod runtime;
mod service;
pub mod store;
pub mod testkit;
pub mod value_entity;
pub mod workflow;

pub use component::{ComponentRef, EntityId, ForwardRequest};
pub use context::{CommandContext, Metadata, WorkflowContext};
pub use error::{Error, ErrorKind, Result};
pub use event_sourced::{EventName, EventSourcedEntity};
pub use nonempty::NonEmpty;
pub use runtime::{ServiceBuilder, ServiceConfig};
pub use service::StatefoldService;
pub use store::{EventStore, MemoryStore, NewEvent, StateStore, StoredEvent, VersionedState};
pub use testkit::{
    EventSourcedResult, EventSourcedTestKit, ValueEntityResult, ValueEntityTestKit,
    WorkflowResult, WorkflowTestKit,
};
pub use value_entity::ValueEntity;
pub use workflow::{Step, Workflow, WorkflowDef, WorkflowSnapshot, WorkflowStatus};

// Re-export derive macros
pub use statefold_macros::EventName;
