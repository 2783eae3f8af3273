//! In-memory store for tests and embedded use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use time::OffsetDateTime;

use super::{EventStore, NewEvent, StateStore, StoredEvent, VersionedState};
use crate::component::ComponentRef;
use crate::error::{Error, Result};

/// In-process implementation of [`EventStore`] and [`StateStore`].
///
/// Backs the simulation harness and any embedded deployment that does not
/// need durability. Cloning is cheap and clones share the same underlying
/// data.
///
/// # Example
///
/// ```
/// use statefold::{ComponentRef, MemoryStore, NewEvent};
/// use statefold::store::EventStore;
/// use serde_json::json;
///
/// # async fn demo() -> statefold::Result<()> {
/// let store = MemoryStore::new();
/// let component = ComponentRef::new("counter", "c-1");
///
/// let last = store
///     .append_events(
///         &component,
///         0,
///         vec![NewEvent {
///             event_type: "ValueIncreased".into(),
///             payload: json!({ "type": "ValueIncreased", "value": 6 }),
///         }],
///     )
///     .await?;
/// assert_eq!(last, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    logs: HashMap<ComponentRef, Vec<StoredEvent>>,
    states: HashMap<ComponentRef, VersionedState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the stored event log for a component instance.
    ///
    /// Test helper; the trait surface is what the runtime uses.
    pub fn stored_events(&self, component: &ComponentRef) -> Vec<StoredEvent> {
        let inner = self.inner.lock().expect("memory store poisoned");
        inner.logs.get(component).cloned().unwrap_or_default()
    }

    /// Number of events stored for a component instance.
    pub fn event_count(&self, component: &ComponentRef) -> u64 {
        let inner = self.inner.lock().expect("memory store poisoned");
        inner.logs.get(component).map(|log| log.len() as u64).unwrap_or(0)
    }
}

impl EventStore for MemoryStore {
    async fn load_events(&self, component: &ComponentRef) -> Result<Vec<StoredEvent>> {
        Ok(self.stored_events(component))
    }

    async fn append_events(
        &self,
        component: &ComponentRef,
        expected_sequence: u64,
        events: Vec<NewEvent>,
    ) -> Result<u64> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let log = inner.logs.entry(component.clone()).or_default();

        let actual = log.len() as u64;
        if actual != expected_sequence {
            return Err(Error::SequenceConflict {
                component: component.clone(),
                expected: expected_sequence,
                actual,
            });
        }

        let recorded_at = OffsetDateTime::now_utc();
        for event in events {
            let sequence = log.len() as u64 + 1;
            log.push(StoredEvent {
                sequence,
                event_type: event.event_type,
                payload: event.payload,
                recorded_at,
            });
        }

        Ok(log.len() as u64)
    }
}

impl StateStore for MemoryStore {
    async fn load_state(&self, component: &ComponentRef) -> Result<Option<VersionedState>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner.states.get(component).cloned())
    }

    async fn persist_state(
        &self,
        component: &ComponentRef,
        expected_revision: u64,
        payload: Value,
    ) -> Result<u64> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let actual = inner.states.get(component).map(|s| s.revision).unwrap_or(0);
        if actual != expected_revision {
            return Err(Error::RevisionConflict {
                component: component.clone(),
                expected: expected_revision,
                actual,
            });
        }

        let revision = expected_revision + 1;
        inner
            .states
            .insert(component.clone(), VersionedState { revision, payload });
        Ok(revision)
    }

    async fn delete_state(&self, component: &ComponentRef, expected_revision: u64) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let actual = inner.states.get(component).map(|s| s.revision).unwrap_or(0);
        if actual != expected_revision {
            return Err(Error::RevisionConflict {
                component: component.clone(),
                expected: expected_revision,
                actual,
            });
        }
        inner.states.remove(component);
        Ok(())
    }
}
