//! Error types for statefold.

use thiserror::Error;

use crate::component::ComponentRef;

/// A `Result` alias with [`enum@Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`enum@Error`], mirroring how callers are
/// expected to react.
///
/// - [`Validation`](ErrorKind::Validation) — the business handler rejected the
///   command; nothing was persisted and the core will not retry.
/// - [`Conflict`](ErrorKind::Conflict) — an optimistic concurrency check
///   failed; the caller may re-read and retry.
/// - [`Configuration`](ErrorKind::Configuration) — a defect in the component
///   definition or stored data that the definition can no longer interpret;
///   fatal, fail fast.
/// - [`Infrastructure`](ErrorKind::Infrastructure) — an external collaborator
///   (step call, serialization boundary) failed; the component remains in its
///   last persisted state so the operation can be re-issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Configuration,
    Infrastructure,
}

/// Errors that can occur in statefold operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The business handler returned an error effect.
    ///
    /// No events were appended and no state was changed. This is the normal
    /// way for a handler to refuse a command.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// Failed to serialize or deserialize a command, state, or reply payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The event log moved past the expected sequence while a command was
    /// being handled.
    ///
    /// Recoverable by re-reading the log and retrying; the core performs no
    /// automatic retry.
    #[error("sequence conflict for {component}: expected {expected}, found {actual}")]
    SequenceConflict {
        /// The component whose log was contended.
        component: ComponentRef,
        /// The sequence the writer expected to extend.
        expected: u64,
        /// The sequence actually found in the store.
        actual: u64,
    },

    /// The stored state revision moved past the expected revision.
    #[error("revision conflict for {component}: expected {expected}, found {actual}")]
    RevisionConflict {
        /// The component whose state was contended.
        component: ComponentRef,
        /// The revision the writer expected to replace.
        expected: u64,
        /// The revision actually found in the store.
        actual: u64,
    },

    /// The log contains an event type the entity definition does not know.
    ///
    /// This is the schema-drift class of failure: an event was appended by a
    /// definition that registered the type, and the current definition no
    /// longer does. Replay must abort rather than continue with a partial
    /// fold.
    #[error("unregistered event type `{event_type}` for {component}")]
    UnregisteredEventType {
        /// The component whose log contains the unknown event.
        component: ComponentRef,
        /// The offending event-type tag.
        event_type: String,
    },

    /// An event type registered twice in one entity definition.
    #[error("duplicate event type `{event_type}` for entity type `{entity_type}`")]
    DuplicateEventType {
        /// The entity type whose dispatch table was being built.
        entity_type: &'static str,
        /// The duplicated event-type tag.
        event_type: &'static str,
    },

    /// Failed to decode an event during replay.
    ///
    /// Includes the event's sequence number (1-based position in the log) so
    /// the corrupt entry can be located.
    #[error("failed to decode event at sequence {sequence} for {component}: {source}")]
    EventDecode {
        /// The component whose log contains the bad payload.
        component: ComponentRef,
        /// The event's position in the log (1-based).
        sequence: u64,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A transition targeted a step name the workflow definition does not
    /// contain.
    #[error("unknown step `{step}` for {component}")]
    UnknownStep {
        /// The workflow instance that attempted the transition.
        component: ComponentRef,
        /// The missing step name.
        step: String,
    },

    /// A step name registered twice in one workflow definition.
    #[error("duplicate step `{step}` in workflow definition")]
    DuplicateStep {
        /// The duplicated step name.
        step: String,
    },

    /// A transition was issued against a finished workflow instance.
    #[error("workflow {component} is finished and accepts no further transitions")]
    WorkflowFinished {
        /// The finished workflow instance.
        component: ComponentRef,
    },

    /// A workflow step's async call failed.
    ///
    /// The instance remains persisted as running at the failed step, so the
    /// call can be re-issued via resume.
    #[error("step `{step}` failed for {component}: {message}")]
    StepFailed {
        /// The workflow instance whose step failed.
        component: ComponentRef,
        /// The failed step name.
        step: String,
        /// Rendered failure chain from the step call.
        message: String,
    },

    /// Component type was not registered in the service registry.
    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    /// Component type was registered more than once.
    #[error("duplicate component type registration: {0}")]
    DuplicateComponentType(String),

    /// A forward chain bounced between components more than the configured
    /// hop limit, which indicates a forwarding cycle.
    #[error("forward chain exceeded {limit} hops")]
    ForwardDepthExceeded {
        /// The configured hop limit.
        limit: usize,
    },

    /// The requested operation only applies to workflow components.
    #[error("component type `{0}` is not a workflow")]
    NotAWorkflow(String),
}

impl Error {
    /// Classify this error per the handling taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CommandRejected(_) | Error::WorkflowFinished { .. } => ErrorKind::Validation,
            Error::SequenceConflict { .. } | Error::RevisionConflict { .. } => ErrorKind::Conflict,
            Error::UnregisteredEventType { .. }
            | Error::DuplicateEventType { .. }
            | Error::EventDecode { .. }
            | Error::UnknownStep { .. }
            | Error::DuplicateStep { .. }
            | Error::UnknownComponentType(_)
            | Error::DuplicateComponentType(_)
            | Error::ForwardDepthExceeded { .. }
            | Error::NotAWorkflow(_) => ErrorKind::Configuration,
            Error::Serialization(_) | Error::StepFailed { .. } => ErrorKind::Infrastructure,
        }
    }
}
