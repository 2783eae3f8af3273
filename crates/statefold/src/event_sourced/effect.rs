//! Effect algebra for event-sourced entities.

use std::marker::PhantomData;

use nonempty::NonEmpty;
use serde::Serialize;
use serde_json::Value;

use crate::component::ComponentRef;

/// The declarative result of an event-sourced command handler.
///
/// An effect is pure data: constructing one performs no I/O. It resolves to
/// exactly one terminal operation — reply, error, or forward — optionally
/// preceded by a non-empty batch of events to persist. The builder makes any
/// other shape unrepresentable: [`Effect::persist`] returns a [`Persist`]
/// stage whose only exits are the `then_*` finishers.
///
/// # Example
///
/// ```ignore
/// // Reject without persisting anything.
/// Effect::error("wrong value: 5")
///
/// // Persist one event, reply with the post-fold state.
/// Effect::persist(CounterEvent::ValueIncreased { value: 6 })
///     .then_reply_with(|counter| counter.value)
///
/// // Read-only reply.
/// Effect::reply(state.value)
/// ```
pub struct Effect<S, E, R> {
    pub(crate) events: Option<NonEmpty<E>>,
    pub(crate) terminal: Terminal<S, R>,
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

impl<S, E, R> Effect<S, E, R> {
    /// Reply without persisting anything.
    pub fn reply(reply: R) -> Self {
        Self {
            events: None,
            terminal: Terminal::Reply(ReplyValue::Value(reply)),
        }
    }

    /// Reject the command.
    ///
    /// Nothing is persisted and the current state is untouched; the message
    /// reaches the caller as a command-rejected failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            events: None,
            terminal: Terminal::Error(message.into()),
        }
    }

    /// Hand the command off to another component without persisting anything.
    pub fn forward(target: ComponentRef, command: &impl Serialize) -> Self {
        Self {
            events: None,
            terminal: Terminal::Forward {
                target,
                payload: serde_json::to_value(command),
            },
        }
    }

    /// Persist one event, then chain a terminal operation.
    pub fn persist(event: E) -> Persist<S, E, R> {
        Persist {
            events: NonEmpty::new(event),
            _marker: PhantomData,
        }
    }

    /// Persist an ordered batch of events, then chain a terminal operation.
    pub fn persist_all(events: NonEmpty<E>) -> Persist<S, E, R> {
        Persist {
            events,
            _marker: PhantomData,
        }
    }

    pub(crate) fn into_parts(self) -> (Option<NonEmpty<E>>, Terminal<S, R>) {
        (self.events, self.terminal)
    }
}

/// Intermediate builder stage holding the events to persist.
///
/// Must be finished with exactly one `then_*` call; the pending events are
/// appended before the terminal operation resolves.
pub struct Persist<S, E, R> {
    events: NonEmpty<E>,
    _marker: PhantomData<fn(&S) -> R>,
}

impl<S, E, R> Persist<S, E, R> {
    /// Persist an additional event after the ones already staged.
    pub fn persist(mut self, event: E) -> Self {
        self.events.push(event);
        self
    }

    /// Finish with a fixed reply.
    pub fn then_reply(self, reply: R) -> Effect<S, E, R> {
        Effect {
            events: Some(self.events),
            terminal: Terminal::Reply(ReplyValue::Value(reply)),
        }
    }

    /// Finish with a reply computed from the state after the staged events
    /// have been folded in.
    pub fn then_reply_with(self, reply: impl FnOnce(&S) -> R + Send + 'static) -> Effect<S, E, R> {
        Effect {
            events: Some(self.events),
            terminal: Terminal::Reply(ReplyValue::FromState(Box::new(reply))),
        }
    }

    /// Finish by handing the command off to another component after the
    /// staged events have been persisted.
    pub fn then_forward(self, target: ComponentRef, command: &impl Serialize) -> Effect<S, E, R> {
        Effect {
            events: Some(self.events),
            terminal: Terminal::Forward {
                target,
                payload: serde_json::to_value(command),
            },
        }
    }
}
