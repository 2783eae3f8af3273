//! Replay dispatch table.
//!
//! Built once per entity registration: every event-type tag the entity can
//! produce maps to a decode-and-apply closure. Replay dispatches stored
//! events through this table by tag, so a log entry whose tag the current
//! definition no longer knows fails fatally instead of silently producing a
//! partial fold.

use std::collections::HashMap;

use serde_json::Value;

use super::EventSourcedEntity;
use crate::component::ComponentRef;
use crate::error::{Error, Result};
use crate::event_sourced::EventName;
use crate::store::StoredEvent;

type Applier<C> = Box<
    dyn Fn(
            <C as EventSourcedEntity>::State,
            &Value,
        ) -> std::result::Result<<C as EventSourcedEntity>::State, serde_json::Error>
        + Send
        + Sync,
>;

/// Event-type tag to applier mapping for one entity type.
pub(crate) struct EventDispatch<C: EventSourcedEntity> {
    appliers: HashMap<&'static str, Applier<C>>,
}

impl<C: EventSourcedEntity> EventDispatch<C> {
    /// Build the table from the entity's declared event types.
    ///
    /// Fails eagerly on a duplicated tag; this runs at registration, before
    /// any command is accepted.
    pub(crate) fn build() -> Result<Self> {
        let mut appliers: HashMap<&'static str, Applier<C>> = HashMap::new();

        for &name in C::Event::NAMES {
            let applier: Applier<C> = Box::new(|state, payload: &Value| {
                let event: C::Event = serde_json::from_value(payload.clone())?;
                Ok(C::apply(state, event))
            });
            if appliers.insert(name, applier).is_some() {
                return Err(Error::DuplicateEventType {
                    entity_type: C::TYPE,
                    event_type: name,
                });
            }
        }

        Ok(Self { appliers })
    }

    /// Fold the full log into the current state.
    pub(crate) fn replay(
        &self,
        component: &ComponentRef,
        events: &[StoredEvent],
    ) -> Result<C::State> {
        let mut state = C::empty_state();
        for event in events {
            state = self.apply_stored(component, state, event)?;
        }
        Ok(state)
    }

    fn apply_stored(
        &self,
        component: &ComponentRef,
        state: C::State,
        event: &StoredEvent,
    ) -> Result<C::State> {
        let applier = self.appliers.get(event.event_type.as_str()).ok_or_else(|| {
            Error::UnregisteredEventType {
                component: component.clone(),
                event_type: event.event_type.clone(),
            }
        })?;

        applier(state, &event.payload).map_err(|source| Error::EventDecode {
            component: component.clone(),
            sequence: event.sequence,
            source,
        })
    }
}
