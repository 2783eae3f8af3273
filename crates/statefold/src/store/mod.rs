//! Storage contracts for component persistence.
//!
//! The core does not own durable storage; it specifies ordering and atomicity
//! requirements on an external log/store pair and ships [`MemoryStore`] as the
//! in-process implementation used by the simulation harness and embedded
//! setups.
//!
//! - [`EventStore`] — append-only event logs for event-sourced entities.
//! - [`StateStore`] — revisioned single-value state for value entities and
//!   workflow snapshots.
//!
//! Both contracts are optimistic: writers pass the sequence/revision they
//! expect to extend, and the store must reject the whole write if the stored
//! position advanced concurrently.

mod memory;

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

pub use memory::MemoryStore;

use crate::component::ComponentRef;
use crate::error::Result;

/// An event accepted into a log, with its envelope metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Position in the entity's log (1-based, dense, append order).
    pub sequence: u64,
    /// Event-type tag used for replay dispatch.
    pub event_type: String,
    /// Event payload as JSON.
    pub payload: Value,
    /// When the store accepted the event.
    pub recorded_at: OffsetDateTime,
}

/// An event to be appended, before the store assigns its envelope.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Event-type tag used for replay dispatch.
    pub event_type: String,
    /// Event payload as JSON.
    pub payload: Value,
}

/// A stored single-value state with its revision.
#[derive(Debug, Clone)]
pub struct VersionedState {
    /// Monotonic revision, starting at 1 for the first persisted state.
    pub revision: u64,
    /// State payload as JSON.
    pub payload: Value,
}

/// Append-only event log storage.
///
/// One log per component instance, single writer per instance (the runtime
/// serializes commands per id), ordered by append sequence. Appends are
/// all-or-nothing: either every event in the batch is stored or none is.
pub trait EventStore: Send + Sync + Clone + 'static {
    /// Load the full event log for a component instance, ordered by sequence.
    ///
    /// Returns an empty vector for an unseen instance.
    fn load_events(
        &self,
        component: &ComponentRef,
    ) -> impl Future<Output = Result<Vec<StoredEvent>>> + Send;

    /// Append a batch of events, expecting the log to currently end at
    /// `expected_sequence` (0 for an empty log).
    ///
    /// Fails the whole batch with a sequence conflict if the log advanced
    /// concurrently. Returns the sequence of the last appended event.
    fn append_events(
        &self,
        component: &ComponentRef,
        expected_sequence: u64,
        events: Vec<NewEvent>,
    ) -> impl Future<Output = Result<u64>> + Send;
}

/// Revisioned single-value state storage.
///
/// Used by value entities and by the workflow engine for its snapshots. Every
/// write replaces the whole value atomically, guarded by the expected
/// revision.
pub trait StateStore: Send + Sync + Clone + 'static {
    /// Load the stored state for a component instance, if any.
    fn load_state(
        &self,
        component: &ComponentRef,
    ) -> impl Future<Output = Result<Option<VersionedState>>> + Send;

    /// Replace the stored state, expecting the current revision to be
    /// `expected_revision` (0 if no state has been persisted yet).
    ///
    /// Returns the new revision.
    fn persist_state(
        &self,
        component: &ComponentRef,
        expected_revision: u64,
        payload: Value,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Remove the stored state, expecting the current revision.
    ///
    /// Deleting an absent state is a no-op when `expected_revision` is 0.
    fn delete_state(
        &self,
        component: &ComponentRef,
        expected_revision: u64,
    ) -> impl Future<Output = Result<()>> + Send;
}
