//! Multi-step workflows.
//!
//! A workflow couples business state with a graph of named steps. Command
//! handlers return an [`Effect`] that may transition the instance into a
//! step; each step holds an async call and a transformation from the call's
//! output to the next [`TransitionEffect`] — another transition, a pause, or
//! the end. The engine persists the instance snapshot before every step call,
//! so a crash between persisting and calling loses nothing but may re-issue
//! the call: step bodies get at-least-once execution and must be idempotent
//! or externally deduplicated.
//!
//! # Example
//!
//! ```ignore
//! impl Workflow for TransferWorkflow {
//!     type State = TransferState;
//!     type Command = TransferCommand;
//!     type Reply = Message;
//!
//!     const TYPE: &'static str = "transfer";
//!
//!     fn definition(&self) -> statefold::Result<WorkflowDef<TransferState>> {
//!         WorkflowDef::builder()
//!             .step(Step::new("fraud-detection", check_frauds, process_fraud_result))
//!             .step(Step::new("withdraw", withdraw_call, move_to_deposit))
//!             .step(Step::new("deposit", deposit_call, finish_with_success))
//!             .build()
//!     }
//!
//!     fn handle(&self, state: Option<&TransferState>, command: TransferCommand,
//!               ctx: &WorkflowContext) -> Effect<TransferState, Message> {
//!         match command {
//!             TransferCommand::Start { transfer } if state.is_none() => {
//!                 Effect::update_state(TransferState::started(transfer.clone()))
//!                     .transition_to("fraud-detection", &transfer)
//!                     .then_reply(Message::new("transfer started"))
//!             }
//!             // ...
//!         }
//!     }
//! }
//! ```

mod effect;
pub(crate) mod engine;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use effect::{Effect, PendingReply, StepUpdate, TransitionEffect, Transitional};

use crate::context::WorkflowContext;
use crate::error::{Error, Result};

/// Type alias for boxed futures (object-safe async).
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type StepCall = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;
type StepTransform<S> =
    Arc<dyn Fn(Option<&S>, Value) -> Result<TransitionEffect<S>> + Send + Sync>;

/// Pure workflow logic: a step graph plus a command handler.
///
/// [`handle`](Self::handle) must be deterministic and side-effect free; the
/// asynchronous work lives in the step calls of the definition. The business
/// state is absent (`None`) until the first `update_state` effect, so a
/// handler can distinguish a fresh instance from a started one.
pub trait Workflow: Send + Sync + 'static {
    /// Business state of one workflow instance.
    type State: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Decoded commands routed to [`handle`](Self::handle).
    type Command: DeserializeOwned + Send;

    /// Reply payload returned to the invoker.
    type Reply: Serialize + Send;

    /// Component type identifier, stable across deployments.
    const TYPE: &'static str;

    /// Build the step graph for this workflow type.
    ///
    /// Called once at registration; the returned definition is immutable and
    /// shared read-only across all instances.
    fn definition(&self) -> Result<WorkflowDef<Self::State>>;

    /// Decide what should happen for a command against the current state.
    fn handle(
        &self,
        state: Option<&Self::State>,
        command: Self::Command,
        ctx: &WorkflowContext,
    ) -> Effect<Self::State, Self::Reply>;
}

/// A named unit of asynchronous work inside a workflow definition.
///
/// Combines the async call (typed input to typed output) with the
/// transformation from the output to the next [`TransitionEffect`]. Both
/// closures are stored type-erased over JSON, matching how commands and
/// events travel through the rest of the runtime.
pub struct Step<S> {
    pub(crate) name: String,
    pub(crate) call: StepCall,
    pub(crate) transform: StepTransform<S>,
}

impl<S> Step<S> {
    /// Create a step from its async call and output transformation.
    ///
    /// The call receives the input carried by the transition that entered the
    /// step; its failure is an infrastructure failure that leaves the
    /// instance running at this step so the call can be re-issued. The
    /// transformation consumes the call's output together with the current
    /// business state and picks the next transition.
    pub fn new<I, O, C, Fut, T>(name: impl Into<String>, call: C, and_then: T) -> Self
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + DeserializeOwned + Send + 'static,
        C: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        T: Fn(Option<&S>, O) -> TransitionEffect<S> + Send + Sync + 'static,
    {
        let call = Arc::new(call);
        let erased_call: StepCall = Arc::new(move |payload: Value| {
            let call = Arc::clone(&call);
            Box::pin(async move {
                let input: I = serde_json::from_value(payload)?;
                let output = call(input).await?;
                Ok(serde_json::to_value(&output)?)
            })
        });

        let erased_transform: StepTransform<S> = Arc::new(move |state, payload: Value| {
            let output: O = serde_json::from_value(payload)?;
            Ok(and_then(state, output))
        });

        Self {
            name: name.into(),
            call: erased_call,
            transform: erased_transform,
        }
    }

    /// The step's unique name within its definition.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An immutable, named collection of steps.
///
/// Built once per workflow type at registration and shared read-only across
/// all instances. Duplicate step names are rejected at build time.
pub struct WorkflowDef<S> {
    steps: HashMap<String, Step<S>>,
}

impl<S> WorkflowDef<S> {
    /// Start building a definition.
    pub fn builder() -> WorkflowDefBuilder<S> {
        WorkflowDefBuilder { steps: Vec::new() }
    }

    /// Look up a step by name.
    pub(crate) fn step(&self, name: &str) -> Option<&Step<S>> {
        self.steps.get(name)
    }

    /// Returns `true` if the definition contains the named step.
    pub fn contains_step(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Iterate over the registered step names.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }
}

/// Builder for a [`WorkflowDef`].
pub struct WorkflowDefBuilder<S> {
    steps: Vec<Step<S>>,
}

impl<S> WorkflowDefBuilder<S> {
    /// Add a step to the definition.
    pub fn step(mut self, step: Step<S>) -> Self {
        self.steps.push(step);
        self
    }

    /// Finish the definition.
    ///
    /// Fails with a configuration error if two steps share a name.
    pub fn build(self) -> Result<WorkflowDef<S>> {
        let mut steps = HashMap::new();
        for step in self.steps {
            let name = step.name.clone();
            if steps.insert(name.clone(), step).is_some() {
                return Err(Error::DuplicateStep { step: name });
            }
        }
        Ok(WorkflowDef { steps })
    }
}

/// Engine-owned lifecycle of one workflow instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum WorkflowStatus {
    /// No transition has happened yet.
    NotStarted,
    /// A step call is pending or in flight; the input is retained so the
    /// call can be re-issued after a crash.
    Running { step: String, input: Value },
    /// Waiting for an external command. Retains the step the instance paused
    /// at, if it paused out of one.
    Paused { step: Option<String> },
    /// The instance ended; no further transitions are accepted.
    Finished,
}

/// Persisted snapshot of one workflow instance: business state plus the
/// engine's own bookkeeping.
///
/// The whole snapshot is written atomically before every step call, which is
/// what makes step execution at-least-once rather than at-most-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    /// Business state; absent until the first `update_state` effect.
    pub state: Option<Value>,
    /// Engine lifecycle.
    pub status: WorkflowStatus,
    /// The last step whose call and transformation both completed.
    pub last_completed_step: Option<String>,
    /// Bumped on every transition; a pending step outcome whose epoch no
    /// longer matches is discarded as superseded.
    pub epoch: u64,
}

impl WorkflowSnapshot {
    pub(crate) fn new() -> Self {
        Self {
            state: None,
            status: WorkflowStatus::NotStarted,
            last_completed_step: None,
            epoch: 0,
        }
    }

    /// The step the instance is currently running or paused at, if any.
    pub fn current_step_name(&self) -> Option<&str> {
        match &self.status {
            WorkflowStatus::Running { step, .. } => Some(step),
            WorkflowStatus::Paused { step } => step.as_deref(),
            WorkflowStatus::NotStarted | WorkflowStatus::Finished => None,
        }
    }

    /// Whether the instance has reached its end.
    pub fn finished(&self) -> bool {
        matches!(self.status, WorkflowStatus::Finished)
    }
}
