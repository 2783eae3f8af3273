//! Command invocation context and metadata.

use std::collections::HashMap;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::component::EntityId;

/// Opaque key-value metadata travelling with an invocation.
///
/// Carries whatever the surrounding transport forwarded (headers, tracing
/// baggage). The core never interprets it; handlers can read it from the
/// command context.
///
/// # Example
///
/// ```
/// use statefold::Metadata;
///
/// let metadata = Metadata::new().with("caller", "billing");
/// assert_eq!(metadata.get("caller"), Some("billing"));
/// assert_eq!(metadata.get("missing"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: HashMap<String, String>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a metadata value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert a key-value pair, replacing any existing value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Context handed to entity command handlers alongside the command.
///
/// Identifies the invocation (entity id, command id, receive timestamp) and
/// exposes the forwarded [`Metadata`]. Handlers must stay deterministic in
/// everything that feeds persisted events or state; the timestamp here is the
/// invocation clock supplied by the runtime, not a license to read wall-clock
/// time inside event appliers.
#[derive(Debug, Clone)]
pub struct CommandContext {
    entity_id: EntityId,
    command_id: Uuid,
    metadata: Metadata,
    timestamp: OffsetDateTime,
}

impl CommandContext {
    pub(crate) fn new(
        entity_id: EntityId,
        command_id: Uuid,
        metadata: Metadata,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            entity_id,
            command_id,
            metadata,
            timestamp,
        }
    }

    /// The id of the entity instance handling the command.
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Unique id of this command invocation.
    pub fn command_id(&self) -> Uuid {
        self.command_id
    }

    /// Metadata forwarded by the invoker.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// When the runtime accepted the command.
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }
}

/// Context handed to workflow command handlers.
///
/// Extends the plain command context with a read-only view of the engine's
/// own bookkeeping: which step the instance is at and whether it already
/// finished.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    command: CommandContext,
    current_step_name: Option<String>,
    finished: bool,
}

impl WorkflowContext {
    pub(crate) fn new(
        command: CommandContext,
        current_step_name: Option<String>,
        finished: bool,
    ) -> Self {
        Self {
            command,
            current_step_name,
            finished,
        }
    }

    /// The id of the workflow instance handling the command.
    pub fn entity_id(&self) -> &EntityId {
        self.command.entity_id()
    }

    /// Unique id of this command invocation.
    pub fn command_id(&self) -> Uuid {
        self.command.command_id()
    }

    /// Metadata forwarded by the invoker.
    pub fn metadata(&self) -> &Metadata {
        self.command.metadata()
    }

    /// When the runtime accepted the command.
    pub fn timestamp(&self) -> OffsetDateTime {
        self.command.timestamp()
    }

    /// The step the instance is currently running or paused at, if any.
    pub fn current_step_name(&self) -> Option<&str> {
        self.current_step_name.as_deref()
    }

    /// Whether the instance has reached its end.
    pub fn finished(&self) -> bool {
        self.finished
    }
}
