//! Component identity types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stable entity instance identifier (business key).
///
/// Use natural business keys (order id, wallet id) rather than synthetic
/// identifiers where possible; correlation stays intuitive and retries stay
/// idempotent.
///
/// # Example
///
/// ```
/// use statefold::EntityId;
///
/// let id = EntityId::new("wallet-1");
/// assert_eq!(id.as_str(), "wallet-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new entity id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Consume the wrapper and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Reference to a specific component instance.
///
/// Combines the component type with the entity id into a single correlation
/// key. Stores, locks, and errors identify instances by this pair.
///
/// # Example
///
/// ```
/// use statefold::{ComponentRef, EntityId};
///
/// let component = ComponentRef::new("wallet", "w-1");
/// assert_eq!(component.component_type(), "wallet");
/// assert_eq!(component.entity_id().as_str(), "w-1");
/// assert_eq!(format!("{}", component), "wallet:w-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentRef {
    component_type: String,
    entity_id: EntityId,
}

impl ComponentRef {
    /// Create a new component reference.
    pub fn new(component_type: impl Into<String>, entity_id: impl Into<EntityId>) -> Self {
        Self {
            component_type: component_type.into(),
            entity_id: entity_id.into(),
        }
    }

    /// The component type (e.g. "counter", "transfer").
    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    /// The entity instance id.
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Consume and return the inner entity id.
    pub fn into_entity_id(self) -> EntityId {
        self.entity_id
    }
}

impl std::fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.component_type, self.entity_id)
    }
}

impl<S: Into<String>> From<(&'static str, S)> for ComponentRef {
    fn from((component_type, entity_id): (&'static str, S)) -> Self {
        Self::new(component_type, entity_id.into())
    }
}

/// A request to hand the current command off to another component.
///
/// Produced by a forward effect; the service resolves it by dispatching the
/// payload to the target component and returning that component's reply.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    /// The component that should handle the command instead.
    pub target: ComponentRef,
    /// The command payload for the target component.
    pub payload: Value,
}

/// Result of running one command through a component runner: either the
/// terminal reply, or a hand-off to another component.
pub(crate) enum Outcome<R> {
    Reply(R),
    Forward(ForwardRequest),
}
