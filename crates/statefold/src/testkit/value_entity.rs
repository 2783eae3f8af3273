//! Test kit for value entities.

use crate::component::{ComponentRef, ForwardRequest, Outcome};
use crate::context::Metadata;
use crate::error::{Error, Result};
use crate::runtime::locks::LockMap;
use crate::store::{MemoryStore, StateStore};
use crate::value_entity::ValueEntity;
use crate::{value_entity, EntityId};

/// Drives one value entity instance through full command cycles without
/// external infrastructure.
pub struct ValueEntityTestKit<C: ValueEntity> {
    store: MemoryStore,
    locks: LockMap,
    component: ComponentRef,
    invocations: u64,
    _marker: std::marker::PhantomData<fn() -> C>,
}

impl<C: ValueEntity> ValueEntityTestKit<C> {
    /// Create a kit for a fresh instance with a default entity id.
    pub fn new() -> Self {
        Self::with_entity_id(super::DEFAULT_ENTITY_ID)
    }

    /// Create a kit for a fresh instance with the given entity id.
    pub fn with_entity_id(entity_id: impl Into<EntityId>) -> Self {
        Self {
            store: MemoryStore::new(),
            locks: LockMap::new(),
            component: ComponentRef::new(C::TYPE, entity_id),
            invocations: 0,
            _marker: std::marker::PhantomData,
        }
    }

    /// The entity id this kit drives.
    pub fn entity_id(&self) -> &EntityId {
        self.component.entity_id()
    }

    /// Run one command through the full cycle.
    ///
    /// Business rejections land inside the returned result; configuration
    /// and infrastructure failures surface as `Err`.
    pub async fn handle(&mut self, command: C::Command) -> Result<ValueEntityResult<C>> {
        self.handle_with_metadata(command, Metadata::new()).await
    }

    /// Run one command with invocation metadata.
    pub async fn handle_with_metadata(
        &mut self,
        command: C::Command,
        metadata: Metadata,
    ) -> Result<ValueEntityResult<C>> {
        self.invocations += 1;
        let ctx = super::command_context(self.component.entity_id(), self.invocations, metadata);

        let outcome =
            value_entity::runner::execute::<C, _>(&self.store, &self.locks, ctx, command).await;

        let (reply, error, forward) = match outcome {
            Ok(Outcome::Reply(reply)) => (Some(reply), None, None),
            Ok(Outcome::Forward(forward)) => (None, None, Some(forward)),
            Err(Error::CommandRejected(message)) => (None, Some(message), None),
            Err(other) => return Err(other),
        };

        Ok(ValueEntityResult {
            reply,
            error,
            forward,
            state: self.current_state().await?,
        })
    }

    /// The currently stored state, or the empty state if none is stored.
    pub async fn current_state(&self) -> Result<C::State> {
        match self.store.load_state(&self.component).await? {
            Some(versioned) => Ok(serde_json::from_value(versioned.payload)?),
            None => Ok(C::empty_state()),
        }
    }

    /// The backing in-memory store, for revision-level assertions.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

/// Outcome of one command against a [`ValueEntityTestKit`].
pub struct ValueEntityResult<C: ValueEntity> {
    reply: Option<C::Reply>,
    error: Option<String>,
    forward: Option<ForwardRequest>,
    state: C::State,
}

impl<C: ValueEntity> ValueEntityResult<C> {
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

    /// The stored state after this command (the empty state if deleted or
    /// never stored).
    pub fn state(&self) -> &C::State {
        &self.state
    }
}
