//! Event-sourced counter entity used across the simulation scenarios.

use serde::{Deserialize, Serialize};
use statefold::event_sourced::{Effect, EventSourcedEntity};
use statefold::{CommandContext, EventName};

pub struct CounterEntity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub value: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CounterCommand {
    Increase { value: i32 },
    Multiply { multiplier: i32 },
    Set { value: i32 },
    Get,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EventName)]
#[serde(tag = "type")]
pub enum CounterEvent {
    ValueIncreased { value: i32 },
    ValueMultiplied { multiplier: i32 },
    ValueSet { value: i32 },
}

impl EventSourcedEntity for CounterEntity {
    type State = Counter;
    type Command = CounterCommand;
    type Event = CounterEvent;
    type Reply = i32;

    const TYPE: &'static str = "counter";

    fn empty_state() -> Counter {
        Counter { value: 0 }
    }

    fn handle(
        state: &Counter,
        command: CounterCommand,
        _ctx: &CommandContext,
    ) -> Effect<Counter, CounterEvent, i32> {
        match command {
            CounterCommand::Increase { value } if value % 3 != 0 => {
                Effect::error(format!("wrong value: {value}"))
            }
            CounterCommand::Increase { value } => {
                Effect::persist(CounterEvent::ValueIncreased { value })
                    .then_reply_with(|counter| counter.value)
            }
            CounterCommand::Multiply { multiplier } => {
                Effect::persist(CounterEvent::ValueMultiplied { multiplier })
                    .then_reply_with(|counter| counter.value)
            }
            CounterCommand::Set { value } => {
                Effect::persist(CounterEvent::ValueSet { value })
                    .then_reply_with(|counter| counter.value)
            }
            CounterCommand::Get => Effect::reply(state.value),
        }
    }

    fn apply(state: Counter, event: CounterEvent) -> Counter {
        match event {
            CounterEvent::ValueIncreased { value } => Counter {
                value: state.value + value,
            },
            CounterEvent::ValueMultiplied { multiplier } => Counter {
                value: state.value * multiplier,
            },
            CounterEvent::ValueSet { value } => Counter { value },
        }
    }
}
