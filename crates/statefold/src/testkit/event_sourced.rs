//! Test kit for event-sourced entities.

use crate::component::{ComponentRef, ForwardRequest, Outcome};
use crate::context::Metadata;
use crate::error::{Error, Result};
use crate::event_sourced::{EventDispatch, EventSourcedEntity};
use crate::runtime::locks::LockMap;
use crate::store::MemoryStore;
use crate::{event_sourced, EntityId};

/// Drives one event-sourced entity instance through full command cycles
/// without external infrastructure.
///
/// Every `handle` call replays the accumulated log, runs the handler, and
/// interprets the effect exactly as the service would — append, fold, reply.
pub struct EventSourcedTestKit<C: EventSourcedEntity> {
    store: MemoryStore,
    locks: LockMap,
    dispatch: EventDispatch<C>,
    component: ComponentRef,
    invocations: u64,
}

impl<C: EventSourcedEntity> EventSourcedTestKit<C> {
    /// Create a kit for a fresh instance with a default entity id.
    pub fn new() -> Result<Self> {
        Self::with_entity_id(super::DEFAULT_ENTITY_ID)
    }

    /// Create a kit for a fresh instance with the given entity id.
    pub fn with_entity_id(entity_id: impl Into<EntityId>) -> Result<Self> {
        Ok(Self {
            store: MemoryStore::new(),
            locks: LockMap::new(),
            dispatch: EventDispatch::<C>::build()?,
            component: ComponentRef::new(C::TYPE, entity_id),
            invocations: 0,
        })
    }

    /// The entity id this kit drives.
    pub fn entity_id(&self) -> &EntityId {
        self.component.entity_id()
    }

    /// Run one command through the full cycle.
    ///
    /// Business rejections land inside the returned result; configuration
    /// and infrastructure failures surface as `Err`.
    pub async fn handle(&mut self, command: C::Command) -> Result<EventSourcedResult<C>> {
        self.handle_with_metadata(command, Metadata::new()).await
    }

    /// Run one command with invocation metadata.
    pub async fn handle_with_metadata(
        &mut self,
        command: C::Command,
        metadata: Metadata,
    ) -> Result<EventSourcedResult<C>> {
        self.invocations += 1;
        let ctx = super::command_context(self.component.entity_id(), self.invocations, metadata);
        let appended_from = self.store.event_count(&self.component) as usize;

        let outcome = event_sourced::runner::execute(
            &self.store,
            &self.locks,
            &self.dispatch,
            ctx,
            command,
        )
        .await;

        let (reply, error, forward) = match outcome {
            Ok(Outcome::Reply(reply)) => (Some(reply), None, None),
            Ok(Outcome::Forward(forward)) => (None, None, Some(forward)),
            Err(Error::CommandRejected(message)) => (None, Some(message), None),
            Err(other) => return Err(other),
        };

        let log = self.store.stored_events(&self.component);
        let events = log[appended_from..]
            .iter()
            .map(|event| serde_json::from_value(event.payload.clone()))
            .collect::<std::result::Result<Vec<C::Event>, _>>()?;
        let state = self.dispatch.replay(&self.component, &log)?;

        Ok(EventSourcedResult {
            reply,
            error,
            forward,
            events,
            state,
        })
    }

    /// Replay the accumulated log into the current state.
    pub async fn current_state(&self) -> Result<C::State> {
        let log = self.store.stored_events(&self.component);
        self.dispatch.replay(&self.component, &log)
    }

    /// All events appended across every command so far.
    pub fn all_events(&self) -> Result<Vec<C::Event>> {
        self.store
            .stored_events(&self.component)
            .iter()
            .map(|event| serde_json::from_value(event.payload.clone()).map_err(Error::from))
            .collect()
    }

    /// The backing in-memory store, for log-level assertions.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

/// Outcome of one command against an [`EventSourcedTestKit`].
pub struct EventSourcedResult<C: EventSourcedEntity> {
    reply: Option<C::Reply>,
    error: Option<String>,
    forward: Option<ForwardRequest>,
    events: Vec<C::Event>,
    state: C::State,
}

impl<C: EventSourcedEntity> EventSourcedResult<C> {
    /// Whether the command produced a reply.
    pub fn is_reply(&self) -> bool {
        self.reply.is_some()
    }

    /// Whether the command was rejected.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the command was forwarded to another component.
    pub fn is_forward(&self) -> bool {
        self.forward.is_some()
    }

    /// The reply payload.
    ///
    /// # Panics
    ///
    /// Panics if the command did not produce a reply.
    pub fn reply(&self) -> &C::Reply {
        match (&self.reply, &self.error) {
            (Some(reply), _) => reply,
            (None, Some(error)) => panic!("expected a reply, but the command was rejected: {error}"),
            (None, None) => panic!("expected a reply, but the command was forwarded"),
        }
    }

    /// The rejection message.
    ///
    /// # Panics
    ///
    /// Panics if the command was not rejected.
    pub fn error(&self) -> &str {
        self.error
            .as_deref()
            .expect("expected a rejection, but the command succeeded")
    }

    /// The forward request.
    ///
    /// # Panics
    ///
    /// Panics if the command was not forwarded.
    pub fn forward(&self) -> &ForwardRequest {
        self.forward
            .as_ref()
            .expect("expected a forward, but the command produced none")
    }

    /// The events appended by this command, in order.
    pub fn events(&self) -> &[C::Event] {
        &self.events
    }

    /// The state after this command, reconstructed by replay.
    pub fn state(&self) -> &C::State {
        &self.state
    }
}
