//! Test kit for workflows.

use std::sync::Arc;

use crate::component::ComponentRef;
use crate::context::Metadata;
use crate::error::{Error, Result};
use crate::runtime::locks::LockMap;
use crate::store::{MemoryStore, StateStore};
use crate::workflow::{Workflow, WorkflowDef, WorkflowSnapshot, WorkflowStatus};
use crate::{workflow, EntityId};

/// Drives one workflow instance through full command cycles — including its
/// step chain — without external infrastructure.
///
/// Step calls run to completion inside `handle`, so a single call observes
/// the whole chain the command triggered: the steps entered, the final
/// snapshot, and the reply.
pub struct WorkflowTestKit<W: Workflow> {
    workflow: Arc<W>,
    def: Arc<WorkflowDef<W::State>>,
    store: MemoryStore,
    locks: LockMap,
    component: ComponentRef,
    invocations: u64,
}

impl<W: Workflow> WorkflowTestKit<W> {
    /// Create a kit for a fresh instance with a default entity id.
    ///
    /// Builds and validates the workflow's step definition eagerly, so a
    /// malformed definition fails here rather than mid-test.
    pub fn new(workflow: W) -> Result<Self> {
        Self::with_entity_id(workflow, super::DEFAULT_ENTITY_ID)
    }

    /// Create a kit for a fresh instance with the given entity id.
    pub fn with_entity_id(workflow: W, entity_id: impl Into<EntityId>) -> Result<Self> {
        let def = workflow.definition()?;
        Ok(Self {
            workflow: Arc::new(workflow),
            def: Arc::new(def),
            store: MemoryStore::new(),
            locks: LockMap::new(),
            component: ComponentRef::new(W::TYPE, entity_id),
            invocations: 0,
        })
    }

    /// The entity id this kit drives.
    pub fn entity_id(&self) -> &EntityId {
        self.component.entity_id()
    }

    /// Run one command through the full cycle, driving any step chain it
    /// triggers until the instance pauses or ends.
    ///
    /// Business rejections land inside the returned result; configuration
    /// and infrastructure failures (a failed step call included) surface as
    /// `Err`, leaving the instance in its last persisted state.
    pub async fn handle(&mut self, command: W::Command) -> Result<WorkflowResult<W>> {
        self.handle_with_metadata(command, Metadata::new()).await
    }

    /// Run one command with invocation metadata.
    pub async fn handle_with_metadata(
        &mut self,
        command: W::Command,
        metadata: Metadata,
    ) -> Result<WorkflowResult<W>> {
        self.invocations += 1;
        let ctx = super::command_context(self.component.entity_id(), self.invocations, metadata);

        let outcome = workflow::engine::execute(
            self.workflow.as_ref(),
            &self.def,
            &self.store,
            &self.locks,
            ctx,
            command,
        )
        .await;

        let (reply, error, steps_entered) = match outcome {
            Ok(outcome) => (Some(outcome.reply), None, outcome.steps_entered),
            Err(Error::CommandRejected(message)) => (None, Some(message), Vec::new()),
            Err(other) => return Err(other),
        };

        let snapshot = self
            .snapshot()
            .await?
            .unwrap_or_else(WorkflowSnapshot::new);
        let state = snapshot
            .state
            .as_ref()
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()?;

        Ok(WorkflowResult {
            reply,
            error,
            steps_entered,
            state,
            snapshot,
        })
    }

    /// Re-issue the pending step call of an instance persisted as running.
    ///
    /// Returns the steps entered while driving the chain.
    pub async fn resume(&mut self) -> Result<Vec<String>> {
        workflow::engine::resume::<W, _>(
            &self.def,
            &self.store,
            &self.locks,
            self.component.entity_id().clone(),
        )
        .await
    }

    /// The persisted snapshot of the instance, if any command has touched it.
    pub async fn snapshot(&self) -> Result<Option<WorkflowSnapshot>> {
        match self.store.load_state(&self.component).await? {
            Some(versioned) => Ok(Some(serde_json::from_value(versioned.payload)?)),
            None => Ok(None),
        }
    }

    /// The backing in-memory store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

/// Outcome of one command against a [`WorkflowTestKit`].
pub struct WorkflowResult<W: Workflow> {
    reply: Option<W::Reply>,
    error: Option<String>,
    steps_entered: Vec<String>,
    state: Option<W::State>,
    snapshot: WorkflowSnapshot,
}

impl<W: Workflow> WorkflowResult<W> {
    /// Whether the command produced a reply.
    pub fn is_reply(&self) -> bool {
        self.reply.is_some()
    }

    /// Whether the command was rejected.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The reply payload.
    ///
    /// # Panics
    ///
    /// Panics if the command was rejected.
    pub fn reply(&self) -> &W::Reply {
        match (&self.reply, &self.error) {
            (Some(reply), _) => reply,
            (None, Some(error)) => panic!("expected a reply, but the command was rejected: {error}"),
            (None, None) => unreachable!("workflow result with neither reply nor error"),
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

    /// Names of the steps entered while driving the chain, in order.
    pub fn steps_entered(&self) -> &[String] {
        &self.steps_entered
    }

    /// The business state after this command, if the instance has one.
    pub fn state(&self) -> Option<&W::State> {
        self.state.as_ref()
    }

    /// The engine lifecycle status after this command.
    pub fn status(&self) -> &WorkflowStatus {
        &self.snapshot.status
    }

    /// The step the instance is running or paused at after this command.
    pub fn current_step_name(&self) -> Option<&str> {
        self.snapshot.current_step_name()
    }

    /// Whether the instance has reached its end.
    pub fn finished(&self) -> bool {
        self.snapshot.finished()
    }

    /// The last step whose call and transformation both completed.
    pub fn last_completed_step(&self) -> Option<&str> {
        self.snapshot.last_completed_step.as_deref()
    }
}
