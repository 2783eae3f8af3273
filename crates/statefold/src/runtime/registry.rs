//! Component registry and service builder.
//!
//! Components register against a shared store; the registry erases their
//! concrete types behind [`ComponentEntry`] so one table can route any
//! component kind, while each entry routes back into fully typed runner code.
//! The registry is populated at startup and immutable afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::config::ServiceConfig;
use super::locks::LockMap;
use crate::component::{EntityId, Outcome};
use crate::context::CommandContext;
use crate::error::{Error, Result};
use crate::event_sourced::{EventDispatch, EventSourcedEntity};
use crate::service::StatefoldService;
use crate::store::{EventStore, StateStore};
use crate::value_entity::ValueEntity;
use crate::workflow::{Workflow, WorkflowDef};
use crate::{event_sourced, value_entity, workflow};

/// Type-erased component entry for dynamic dispatch.
///
/// Allows the registry to store different component kinds in a single map
/// while preserving type-safe execution inside each entry.
#[async_trait]
pub(crate) trait ComponentEntry: Send + Sync {
    /// Execute a command for this component type.
    ///
    /// Deserializes the command payload and routes it to the typed runner;
    /// the reply comes back serialized.
    async fn invoke(&self, ctx: CommandContext, payload: Value) -> Result<Outcome<Value>>;

    /// Re-issue the pending step call of a workflow instance.
    ///
    /// Fails for non-workflow components.
    async fn resume(&self, entity_id: EntityId) -> Result<()>;
}

/// Typed entry for an event-sourced entity.
struct EventSourcedEntry<C, S>
where
    C: EventSourcedEntity,
    S: EventStore,
{
    store: S,
    locks: Arc<LockMap>,
    dispatch: EventDispatch<C>,
}

#[async_trait]
impl<C, S> ComponentEntry for EventSourcedEntry<C, S>
where
    C: EventSourcedEntity,
    S: EventStore,
{
    async fn invoke(&self, ctx: CommandContext, payload: Value) -> Result<Outcome<Value>> {
        let command: C::Command = serde_json::from_value(payload)?;
        let outcome =
            event_sourced::runner::execute(&self.store, &self.locks, &self.dispatch, ctx, command)
                .await?;
        serialize_outcome(outcome)
    }

    async fn resume(&self, _entity_id: EntityId) -> Result<()> {
        Err(Error::NotAWorkflow(C::TYPE.to_string()))
    }
}

/// Typed entry for a value entity.
struct ValueEntityEntry<C, S>
where
    C: ValueEntity,
    S: StateStore,
{
    store: S,
    locks: Arc<LockMap>,
    _marker: std::marker::PhantomData<fn() -> C>,
}

#[async_trait]
impl<C, S> ComponentEntry for ValueEntityEntry<C, S>
where
    C: ValueEntity,
    S: StateStore,
{
    async fn invoke(&self, ctx: CommandContext, payload: Value) -> Result<Outcome<Value>> {
        let command: C::Command = serde_json::from_value(payload)?;
        let outcome =
            value_entity::runner::execute::<C, S>(&self.store, &self.locks, ctx, command).await?;
        serialize_outcome(outcome)
    }

    async fn resume(&self, _entity_id: EntityId) -> Result<()> {
        Err(Error::NotAWorkflow(C::TYPE.to_string()))
    }
}

/// Typed entry for a workflow, holding the instance and its built definition.
struct WorkflowEntry<W, S>
where
    W: Workflow,
    S: StateStore,
{
    workflow: Arc<W>,
    def: Arc<WorkflowDef<W::State>>,
    store: S,
    locks: Arc<LockMap>,
}

#[async_trait]
impl<W, S> ComponentEntry for WorkflowEntry<W, S>
where
    W: Workflow,
    S: StateStore,
{
    async fn invoke(&self, ctx: CommandContext, payload: Value) -> Result<Outcome<Value>> {
        let command: W::Command = serde_json::from_value(payload)?;
        let outcome = workflow::engine::execute(
            self.workflow.as_ref(),
            &self.def,
            &self.store,
            &self.locks,
            ctx,
            command,
        )
        .await?;
        Ok(Outcome::Reply(serde_json::to_value(&outcome.reply)?))
    }

    async fn resume(&self, entity_id: EntityId) -> Result<()> {
        workflow::engine::resume::<W, S>(&self.def, &self.store, &self.locks, entity_id).await?;
        Ok(())
    }
}

fn serialize_outcome<R: serde::Serialize>(outcome: Outcome<R>) -> Result<Outcome<Value>> {
    match outcome {
        Outcome::Reply(reply) => Ok(Outcome::Reply(serde_json::to_value(&reply)?)),
        Outcome::Forward(forward) => Ok(Outcome::Forward(forward)),
    }
}

/// Registry mapping component types to their entries.
///
/// Built once by [`ServiceBuilder`], read-only afterwards.
pub(crate) struct ComponentRegistry {
    entries: HashMap<&'static str, Box<dyn ComponentEntry>>,
}

impl ComponentRegistry {
    /// Look up a component entry by type.
    pub(crate) fn get(&self, component_type: &str) -> Option<&dyn ComponentEntry> {
        self.entries.get(component_type).map(Box::as_ref)
    }

    /// Returns the number of registered components.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Builder for constructing a [`StatefoldService`].
///
/// Register components against a shared store, then build. Configuration
/// defects — duplicate component types, duplicate event tags, invalid step
/// graphs — are deferred and surface from [`build`](Self::build), so startup
/// fails fast instead of limping along with a partial registry.
///
/// # Example
///
/// ```ignore
/// let service = StatefoldService::builder(MemoryStore::new())
///     .register_event_sourced::<CounterEntity>()
///     .register_value_entity::<WalletEntity>()
///     .register_workflow(TransferWorkflow::new(bank))
///     .build()?;
/// ```
pub struct ServiceBuilder<S> {
    store: S,
    locks: Arc<LockMap>,
    entries: HashMap<&'static str, Box<dyn ComponentEntry>>,
    first_error: Option<Error>,
    config: ServiceConfig,
}

impl<S> ServiceBuilder<S> {
    pub(crate) fn new(store: S) -> Self {
        Self {
            store,
            locks: Arc::new(LockMap::new()),
            entries: HashMap::new(),
            first_error: None,
            config: ServiceConfig::default(),
        }
    }

    fn insert(&mut self, component_type: &'static str, entry: Box<dyn ComponentEntry>) {
        if self.entries.contains_key(component_type) {
            if self.first_error.is_none() {
                self.first_error = Some(Error::DuplicateComponentType(component_type.to_string()));
            }
            return;
        }
        self.entries.insert(component_type, entry);
    }

    /// Set the service configuration.
    ///
    /// If not called, uses [`ServiceConfig::default()`].
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the service.
    ///
    /// Returns the first configuration error encountered during
    /// registration, if any.
    pub fn build(self) -> Result<StatefoldService> {
        if let Some(error) = self.first_error {
            return Err(error);
        }

        let registry = ComponentRegistry {
            entries: self.entries,
        };
        info!(components = registry.len(), "component registry built");
        Ok(StatefoldService::new(Arc::new(registry), self.config))
    }
}

impl<S> ServiceBuilder<S>
where
    S: EventStore,
{
    /// Register an event-sourced entity type.
    ///
    /// Builds and validates the entity's replay dispatch table eagerly.
    pub fn register_event_sourced<C>(mut self) -> Self
    where
        C: EventSourcedEntity,
    {
        match EventDispatch::<C>::build() {
            Ok(dispatch) => {
                let entry = EventSourcedEntry {
                    store: self.store.clone(),
                    locks: Arc::clone(&self.locks),
                    dispatch,
                };
                self.insert(C::TYPE, Box::new(entry));
            }
            Err(error) => {
                if self.first_error.is_none() {
                    self.first_error = Some(error);
                }
            }
        }
        self
    }
}

impl<S> ServiceBuilder<S>
where
    S: StateStore,
{
    /// Register a value entity type.
    pub fn register_value_entity<C>(mut self) -> Self
    where
        C: ValueEntity,
    {
        let entry = ValueEntityEntry::<C, S> {
            store: self.store.clone(),
            locks: Arc::clone(&self.locks),
            _marker: std::marker::PhantomData,
        };
        self.insert(C::TYPE, Box::new(entry));
        self
    }

    /// Register a workflow, building its step definition eagerly.
    ///
    /// The instance carries whatever collaborators its steps need; the
    /// definition it builds is validated here and shared read-only across
    /// all workflow instances.
    pub fn register_workflow<W>(mut self, workflow: W) -> Self
    where
        W: Workflow,
    {
        match workflow.definition() {
            Ok(def) => {
                let entry = WorkflowEntry {
                    workflow: Arc::new(workflow),
                    def: Arc::new(def),
                    store: self.store.clone(),
                    locks: Arc::clone(&self.locks),
                };
                self.insert(W::TYPE, Box::new(entry));
            }
            Err(error) => {
                if self.first_error.is_none() {
                    self.first_error = Some(error);
                }
            }
        }
        self
    }
}
