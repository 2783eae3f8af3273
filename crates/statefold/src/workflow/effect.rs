//! Effect algebra for workflows.
//!
//! Two effect types with deliberately different shapes:
//!
//! - [`Effect`] — returned by command handlers. Either a plain reply/error,
//!   or a transitional chain: optional `update_state`, exactly one of
//!   `transition_to` / `pause` / `end`, and a mandatory `then_reply`.
//! - [`TransitionEffect`] — returned by step transformations. Optional
//!   `update_state` plus exactly one of `transition_to` / `pause` / `end`.
//!   No reply: a step answers nobody.
//!
//! The stage types ([`Transitional`], [`PendingReply`], [`StepUpdate`]) make
//! any other chain shape fail to typecheck.

use std::marker::PhantomData;

use serde::Serialize;
use serde_json::Value;

/// One terminal transition of the workflow state machine.
pub(crate) enum Transition {
    To {
        step: String,
        input: Result<Value, serde_json::Error>,
    },
    Pause,
    End,
}

pub(crate) enum EffectKind<S, R> {
    Reply(R),
    Error(String),
    Transitional {
        update: Option<S>,
        transition: Transition,
        reply: R,
    },
}

/// The declarative result of a workflow command handler.
///
/// # Example
///
/// ```ignore
/// // Start the instance and enter the first step.
/// Effect::update_state(TransferState::started(transfer.clone()))
///     .transition_to("fraud-detection", &transfer)
///     .then_reply(Message::new("transfer started"))
///
/// // Read-only reply.
/// Effect::reply(Message::new("transfer already started"))
///
/// // Reject the command.
/// Effect::error("transfer amount should be greater than zero")
/// ```
pub struct Effect<S, R> {
    pub(crate) kind: EffectKind<S, R>,
}

impl<S, R> Effect<S, R> {
    /// Reply without touching state or transitioning.
    pub fn reply(reply: R) -> Self {
        Self {
            kind: EffectKind::Reply(reply),
        }
    }

    /// Reject the command; nothing is persisted.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: EffectKind::Error(message.into()),
        }
    }

    /// Replace the business state, then chain a transition.
    pub fn update_state(state: S) -> Transitional<S, R> {
        Transitional {
            update: Some(state),
            _marker: PhantomData,
        }
    }

    /// Transition into a step without updating the business state.
    pub fn transition_to(step: impl Into<String>, input: &impl Serialize) -> PendingReply<S, R> {
        PendingReply {
            update: None,
            transition: Transition::To {
                step: step.into(),
                input: serde_json::to_value(input),
            },
            _marker: PhantomData,
        }
    }

    /// Pause the instance without updating the business state.
    pub fn pause() -> PendingReply<S, R> {
        PendingReply {
            update: None,
            transition: Transition::Pause,
            _marker: PhantomData,
        }
    }

    /// End the instance without updating the business state.
    pub fn end() -> PendingReply<S, R> {
        PendingReply {
            update: None,
            transition: Transition::End,
            _marker: PhantomData,
        }
    }
}

/// Stage after `update_state`: a transition must follow.
pub struct Transitional<S, R> {
    update: Option<S>,
    _marker: PhantomData<fn() -> R>,
}

impl<S, R> Transitional<S, R> {
    /// Transition into a step, scheduling its call with `input`.
    pub fn transition_to(self, step: impl Into<String>, input: &impl Serialize) -> PendingReply<S, R> {
        PendingReply {
            update: self.update,
            transition: Transition::To {
                step: step.into(),
                input: serde_json::to_value(input),
            },
            _marker: PhantomData,
        }
    }

    /// Pause the instance, waiting for an external command.
    pub fn pause(self) -> PendingReply<S, R> {
        PendingReply {
            update: self.update,
            transition: Transition::Pause,
            _marker: PhantomData,
        }
    }

    /// End the instance; no further transitions will be accepted.
    pub fn end(self) -> PendingReply<S, R> {
        PendingReply {
            update: self.update,
            transition: Transition::End,
            _marker: PhantomData,
        }
    }
}

/// Stage after a transition: the reply must follow.
pub struct PendingReply<S, R> {
    update: Option<S>,
    transition: Transition,
    _marker: PhantomData<fn() -> R>,
}

impl<S, R> PendingReply<S, R> {
    /// Finish with the reply returned to the command's caller.
    pub fn then_reply(self, reply: R) -> Effect<S, R> {
        Effect {
            kind: EffectKind::Transitional {
                update: self.update,
                transition: self.transition,
                reply,
            },
        }
    }
}

/// The declarative result of a step's output transformation.
///
/// # Example
///
/// ```ignore
/// // Move on to the next step.
/// TransitionEffect::transition_to("deposit", &deposit_input)
///
/// // Wait for manual acceptance, keeping the step identity.
/// TransitionEffect::update_state(state).pause()
///
/// // Done.
/// TransitionEffect::update_state(state.finished()).end()
/// ```
pub struct TransitionEffect<S> {
    pub(crate) update: Option<S>,
    pub(crate) transition: Transition,
}

impl<S> TransitionEffect<S> {
    /// Replace the business state, then chain a transition.
    pub fn update_state(state: S) -> StepUpdate<S> {
        StepUpdate { update: state }
    }

    /// Transition into a step, scheduling its call with `input`.
    pub fn transition_to(step: impl Into<String>, input: &impl Serialize) -> Self {
        Self {
            update: None,
            transition: Transition::To {
                step: step.into(),
                input: serde_json::to_value(input),
            },
        }
    }

    /// Pause the instance, retaining the identity of the step that just
    /// completed so a later command can resume from it.
    pub fn pause() -> Self {
        Self {
            update: None,
            transition: Transition::Pause,
        }
    }

    /// End the instance.
    pub fn end() -> Self {
        Self {
            update: None,
            transition: Transition::End,
        }
    }
}

/// Stage after a step-level `update_state`: a transition must follow.
pub struct StepUpdate<S> {
    update: S,
}

impl<S> StepUpdate<S> {
    /// Transition into a step, scheduling its call with `input`.
    pub fn transition_to(self, step: impl Into<String>, input: &impl Serialize) -> TransitionEffect<S> {
        TransitionEffect {
            update: Some(self.update),
            transition: Transition::To {
                step: step.into(),
                input: serde_json::to_value(input),
            },
        }
    }

    /// Pause the instance.
    pub fn pause(self) -> TransitionEffect<S> {
        TransitionEffect {
            update: Some(self.update),
            transition: Transition::Pause,
        }
    }

    /// End the instance.
    pub fn end(self) -> TransitionEffect<S> {
        TransitionEffect {
            update: Some(self.update),
            transition: Transition::End,
        }
    }
}
