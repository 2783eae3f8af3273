//! Minimal workflow for exercising engine mechanics: a step whose call can be
//! held open from the test, next to one that completes immediately.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use statefold::workflow::{Effect, Step, TransitionEffect, Workflow, WorkflowDef};
use statefold::WorkflowContext;
use tokio::sync::Notify;

pub struct GateWorkflow {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl GateWorkflow {
    /// Returns the workflow plus the handles the test uses to observe the
    /// held call starting and to let it finish.
    pub fn new() -> (Self, Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        (
            Self {
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
            },
            entered,
            release,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateState {
    /// Step outcomes applied so far, in order.
    pub outcomes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GateCommand {
    Enter { step: String },
}

impl Workflow for GateWorkflow {
    type State = GateState;
    type Command = GateCommand;
    type Reply = String;

    const TYPE: &'static str = "gate";

    fn definition(&self) -> statefold::Result<WorkflowDef<GateState>> {
        let entered = Arc::clone(&self.entered);
        let release = Arc::clone(&self.release);

        WorkflowDef::builder()
            .step(Step::new(
                "held",
                move |(): ()| {
                    let entered = Arc::clone(&entered);
                    let release = Arc::clone(&release);
                    async move {
                        entered.notify_one();
                        release.notified().await;
                        Ok("held".to_owned())
                    }
                },
                record_and_end,
            ))
            .step(Step::new(
                "instant",
                |(): ()| async { Ok("instant".to_owned()) },
                record_and_end,
            ))
            .build()
    }

    fn handle(
        &self,
        state: Option<&GateState>,
        command: GateCommand,
        _ctx: &WorkflowContext,
    ) -> Effect<GateState, String> {
        match command {
            GateCommand::Enter { step } => {
                let state = state.cloned().unwrap_or_default();
                Effect::update_state(state)
                    .transition_to(step.as_str(), &())
                    .then_reply(format!("entering {step}"))
            }
        }
    }
}

fn record_and_end(state: Option<&GateState>, outcome: String) -> TransitionEffect<GateState> {
    let mut state = state.cloned().unwrap_or_default();
    state.outcomes.push(outcome);
    TransitionEffect::update_state(state).end()
}
