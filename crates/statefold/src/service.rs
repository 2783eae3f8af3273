//! App-facing service entrypoint.

use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::component::{EntityId, Outcome};
use crate::context::{CommandContext, Metadata};
use crate::error::{Error, Result};
use crate::runtime::{ComponentRegistry, ServiceBuilder, ServiceConfig};
use crate::store::{EventStore, StateStore};

/// The single entrypoint for dispatching commands to registered components.
///
/// Holds the immutable component registry built at startup. Cloning is cheap;
/// clones share the registry, the store handles, and the per-instance locks.
///
/// # Example
///
/// ```ignore
/// let service = StatefoldService::builder(MemoryStore::new())
///     .register_event_sourced::<CounterEntity>()
///     .build()?;
///
/// let reply = service
///     .invoke("counter", "c-1", json!({ "type": "Increase", "value": 6 }), Metadata::new())
///     .await?;
/// assert_eq!(reply, json!(6));
/// ```
#[derive(Clone)]
pub struct StatefoldService {
    registry: Arc<ComponentRegistry>,
    config: ServiceConfig,
}

impl StatefoldService {
    pub(crate) fn new(registry: Arc<ComponentRegistry>, config: ServiceConfig) -> Self {
        Self { registry, config }
    }

    /// Create a new service builder over a store.
    pub fn builder<S>(store: S) -> ServiceBuilder<S>
    where
        S: EventStore + StateStore,
    {
        ServiceBuilder::new(store)
    }

    /// Dispatch a decoded command to a component instance and return the
    /// terminal reply payload.
    ///
    /// A business rejection surfaces as
    /// [`Error::CommandRejected`]; forward effects are resolved by
    /// re-dispatching to the target component, up to the configured hop
    /// limit.
    pub async fn invoke(
        &self,
        component_type: &str,
        entity_id: impl Into<EntityId>,
        payload: Value,
        metadata: Metadata,
    ) -> Result<Value> {
        let mut component_type = component_type.to_string();
        let mut entity_id = entity_id.into();
        let mut payload = payload;
        let mut hops = 0;

        loop {
            let entry = self
                .registry
                .get(&component_type)
                .ok_or_else(|| Error::UnknownComponentType(component_type.clone()))?;

            let ctx = CommandContext::new(
                entity_id.clone(),
                Uuid::new_v4(),
                metadata.clone(),
                OffsetDateTime::now_utc(),
            );

            match entry.invoke(ctx, payload).await? {
                Outcome::Reply(reply) => return Ok(reply),
                Outcome::Forward(forward) => {
                    hops += 1;
                    if hops > self.config.forward_hop_limit {
                        return Err(Error::ForwardDepthExceeded {
                            limit: self.config.forward_hop_limit,
                        });
                    }
                    debug!(
                        from = %component_type,
                        to = %forward.target,
                        hop = hops,
                        "forwarding command"
                    );
                    component_type = forward.target.component_type().to_string();
                    entity_id = forward.target.entity_id().clone();
                    payload = forward.payload;
                }
            }
        }
    }

    /// Re-issue the pending step call of a workflow instance.
    ///
    /// Recovery entrypoint after a crash or a failed step call: the instance
    /// is still persisted as running at the step, and this drives the chain
    /// from there. A no-op for instances that are not running.
    pub async fn resume_workflow(
        &self,
        component_type: &str,
        entity_id: impl Into<EntityId>,
    ) -> Result<()> {
        let entry = self
            .registry
            .get(component_type)
            .ok_or_else(|| Error::UnknownComponentType(component_type.to_string()))?;
        entry.resume(entity_id.into()).await
    }

    /// Returns the number of registered components.
    pub fn component_count(&self) -> usize {
        self.registry.len()
    }
}
