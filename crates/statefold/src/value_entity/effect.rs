//! Effect algebra for value entities.

use std::marker::PhantomData;

use serde::Serialize;
use serde_json::Value;

use crate::component::ComponentRef;

pub(crate) enum StateOp<S> {
    Update(S),
    Delete,
}

pub(crate) enum Terminal<S, R> {
    Reply(ReplyValue<S, R>),
    Error(String),
    Forward {
        target: ComponentRef,
        payload: Result<Value, serde_json::Error>,
    },
}

pub(crate) enum ReplyValue<S, R> {
    Value(R),
    FromState(Box<dyn FnOnce(&S) -> R + Send>),
}

impl<S, R> ReplyValue<S, R> {
    pub(crate) fn resolve(self, state: &S) -> R {
        match self {
            ReplyValue::Value(reply) => reply,
            ReplyValue::FromState(f) => f(state),
        }
    }
}

/// The declarative result of a value-entity command handler.
///
/// Resolves to exactly one terminal operation — reply, error, or forward —
/// optionally preceded by a single state operation (update or delete). The
/// builder stages ([`UpdateState`], [`DeleteState`]) only offer the `then_*`
/// finishers, so a malformed chain does not typecheck.
///
/// # Example
///
/// ```ignore
/// // Replace the stored state and reply with the new balance.
/// Effect::update_state(Wallet { balance: state.balance + amount })
///     .then_reply_with(|wallet| wallet.balance)
///
/// // Refuse to overdraw; stored state untouched.
/// Effect::error("insufficient balance")
///
/// // Remove the instance.
/// Effect::delete_state().then_reply(0)
/// ```
pub struct Effect<S, R> {
    pub(crate) op: Option<StateOp<S>>,
    pub(crate) terminal: Terminal<S, R>,
}

impl<S, R> Effect<S, R> {
    /// Reply without touching the stored state.
    pub fn reply(reply: R) -> Self {
        Self {
            op: None,
            terminal: Terminal::Reply(ReplyValue::Value(reply)),
        }
    }

    /// Reject the command, leaving the stored state untouched.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            op: None,
            terminal: Terminal::Error(message.into()),
        }
    }

    /// Hand the command off to another component without touching state.
    pub fn forward(target: ComponentRef, command: &impl Serialize) -> Self {
        Self {
            op: None,
            terminal: Terminal::Forward {
                target,
                payload: serde_json::to_value(command),
            },
        }
    }

    /// Replace the stored state, then chain a terminal operation.
    pub fn update_state(state: S) -> UpdateState<S, R> {
        UpdateState {
            state,
            _marker: PhantomData,
        }
    }

    /// Remove the stored state, then chain a terminal operation.
    ///
    /// A later command recreates the instance from
    /// [`ValueEntity::empty_state`](super::ValueEntity::empty_state).
    pub fn delete_state() -> DeleteState<S, R> {
        DeleteState {
            _marker: PhantomData,
        }
    }

    pub(crate) fn into_parts(self) -> (Option<StateOp<S>>, Terminal<S, R>) {
        (self.op, self.terminal)
    }
}

/// Builder stage holding the replacement state.
pub struct UpdateState<S, R> {
    state: S,
    _marker: PhantomData<fn() -> R>,
}

impl<S, R> UpdateState<S, R> {
    /// Finish with a fixed reply.
    pub fn then_reply(self, reply: R) -> Effect<S, R> {
        Effect {
            op: Some(StateOp::Update(self.state)),
            terminal: Terminal::Reply(ReplyValue::Value(reply)),
        }
    }

    /// Finish with a reply computed from the updated state.
    pub fn then_reply_with(self, reply: impl FnOnce(&S) -> R + Send + 'static) -> Effect<S, R> {
        Effect {
            op: Some(StateOp::Update(self.state)),
            terminal: Terminal::Reply(ReplyValue::FromState(Box::new(reply))),
        }
    }

    /// Finish by handing the command off to another component after the
    /// update has been persisted.
    pub fn then_forward(self, target: ComponentRef, command: &impl Serialize) -> Effect<S, R> {
        Effect {
            op: Some(StateOp::Update(self.state)),
            terminal: Terminal::Forward {
                target,
                payload: serde_json::to_value(command),
            },
        }
    }
}

/// Builder stage for a pending delete.
pub struct DeleteState<S, R> {
    _marker: PhantomData<fn(&S) -> R>,
}

impl<S, R> DeleteState<S, R> {
    /// Finish with a fixed reply.
    pub fn then_reply(self, reply: R) -> Effect<S, R> {
        Effect {
            op: Some(StateOp::Delete),
            terminal: Terminal::Reply(ReplyValue::Value(reply)),
        }
    }

    /// Finish by handing the command off to another component after the
    /// delete has been persisted.
    pub fn then_forward(self, target: ComponentRef, command: &impl Serialize) -> Effect<S, R> {
        Effect {
            op: Some(StateOp::Delete),
            terminal: Terminal::Forward {
                target,
                payload: serde_json::to_value(command),
            },
        }
    }
}
