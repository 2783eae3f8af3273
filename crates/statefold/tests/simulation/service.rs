//! Service routing scenarios: registry lookups, forward resolution, per-id
//! serialization, and workflow recovery through the service surface.

use serde::{Deserialize, Serialize};
use serde_json::json;
use statefold::store::StateStore;
use statefold::value_entity::{Effect, ValueEntity};
use statefold::workflow::WorkflowSnapshot;
use statefold::{
    CommandContext, ComponentRef, Error, ErrorKind, MemoryStore, Metadata, ServiceConfig,
    StatefoldService,
};

use crate::support::counter::CounterEntity;
use crate::support::transfer::{Bank, TransferWorkflow, WITHDRAW};
use crate::support::wallet::{WalletCommand, WalletEntity};

#[tokio::test]
async fn routes_commands_to_registered_components() {
    let service = StatefoldService::builder(MemoryStore::new())
        .register_event_sourced::<CounterEntity>()
        .register_value_entity::<WalletEntity>()
        .build()
        .unwrap();
    assert_eq!(service.component_count(), 2);

    let reply = service
        .invoke(
            "counter",
            "c-1",
            json!({ "type": "Increase", "value": 6 }),
            Metadata::new(),
        )
        .await
        .unwrap();
    assert_eq!(reply, json!(6));

    let reply = service
        .invoke(
            "wallet",
            "w-1",
            json!({ "type": "Create", "initial_balance": 100 }),
            Metadata::new(),
        )
        .await
        .unwrap();
    assert_eq!(reply, json!(100));
}

#[tokio::test]
async fn business_rejection_surfaces_as_command_rejected() {
    let service = StatefoldService::builder(MemoryStore::new())
        .register_event_sourced::<CounterEntity>()
        .build()
        .unwrap();

    let err = service
        .invoke(
            "counter",
            "c-1",
            json!({ "type": "Increase", "value": 5 }),
            Metadata::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(err, Error::CommandRejected(message) if message == "wrong value: 5"));
}

#[tokio::test]
async fn unknown_component_type_is_a_configuration_error() {
    let service = StatefoldService::builder(MemoryStore::new())
        .register_event_sourced::<CounterEntity>()
        .build()
        .unwrap();

    let err = service
        .invoke("order", "o-1", json!({ "type": "Get" }), Metadata::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(matches!(err, Error::UnknownComponentType(t) if t == "order"));
}

#[tokio::test]
async fn duplicate_component_type_fails_at_build() {
    let err = StatefoldService::builder(MemoryStore::new())
        .register_event_sourced::<CounterEntity>()
        .register_event_sourced::<CounterEntity>()
        .build()
        .unwrap_err();

    assert!(matches!(err, Error::DuplicateComponentType(t) if t == "counter"));
}

/// Stateless teller that hands deposits off to the target wallet.
struct TellerEntity;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TellerState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum TellerCommand {
    Deposit { wallet: String, amount: i64 },
}

impl ValueEntity for TellerEntity {
    type State = TellerState;
    type Command = TellerCommand;
    type Reply = i64;

    const TYPE: &'static str = "teller";

    fn empty_state() -> TellerState {
        TellerState
    }

    fn handle(
        _state: &TellerState,
        command: TellerCommand,
        _ctx: &CommandContext,
    ) -> Effect<TellerState, i64> {
        match command {
            TellerCommand::Deposit { wallet, amount } => Effect::forward(
                ComponentRef::new("wallet", wallet),
                &WalletCommand::Deposit { amount },
            ),
        }
    }
}

#[tokio::test]
async fn forward_is_resolved_by_the_target_component() {
    let service = StatefoldService::builder(MemoryStore::new())
        .register_value_entity::<WalletEntity>()
        .register_value_entity::<TellerEntity>()
        .build()
        .unwrap();

    service
        .invoke(
            "wallet",
            "w-1",
            json!({ "type": "Create", "initial_balance": 50 }),
            Metadata::new(),
        )
        .await
        .unwrap();

    // The teller replies with whatever the wallet replied.
    let reply = service
        .invoke(
            "teller",
            "t-1",
            json!({ "type": "Deposit", "wallet": "w-1", "amount": 25 }),
            Metadata::new(),
        )
        .await
        .unwrap();
    assert_eq!(reply, json!(75));
}

/// Forwards every command back to itself.
struct MirrorEntity;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MirrorState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum MirrorCommand {
    Bounce,
}

impl ValueEntity for MirrorEntity {
    type State = MirrorState;
    type Command = MirrorCommand;
    type Reply = ();

    const TYPE: &'static str = "mirror";

    fn empty_state() -> MirrorState {
        MirrorState
    }

    fn handle(
        _state: &MirrorState,
        command: MirrorCommand,
        ctx: &CommandContext,
    ) -> Effect<MirrorState, ()> {
        match command {
            MirrorCommand::Bounce => Effect::forward(
                ComponentRef::new("mirror", ctx.entity_id().clone()),
                &MirrorCommand::Bounce,
            ),
        }
    }
}

#[tokio::test]
async fn forward_cycles_are_bounded_by_the_hop_limit() {
    let service = StatefoldService::builder(MemoryStore::new())
        .register_value_entity::<MirrorEntity>()
        .config(ServiceConfig {
            forward_hop_limit: 3,
        })
        .build()
        .unwrap();

    let err = service
        .invoke("mirror", "m-1", json!({ "type": "Bounce" }), Metadata::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ForwardDepthExceeded { limit: 3 }));
}

#[tokio::test]
async fn resume_on_a_non_workflow_component_is_rejected() {
    let service = StatefoldService::builder(MemoryStore::new())
        .register_event_sourced::<CounterEntity>()
        .build()
        .unwrap();

    let err = service.resume_workflow("counter", "c-1").await.unwrap_err();
    assert!(matches!(err, Error::NotAWorkflow(t) if t == "counter"));
}

#[tokio::test]
async fn failed_workflow_step_recovers_through_the_service() {
    let bank = Bank::new().with_account("alice", 500);
    bank.fail_next_withdrawals(1);
    let store = MemoryStore::new();
    let service = StatefoldService::builder(store.clone())
        .register_workflow(TransferWorkflow::new(bank.clone()))
        .build()
        .unwrap();

    let err = service
        .invoke(
            "transfer",
            "t-1",
            json!({
                "type": "Start",
                "transfer": { "from": "alice", "to": "bob", "amount": 100 }
            }),
            Metadata::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(&err, Error::StepFailed { step, .. } if step == WITHDRAW));

    service.resume_workflow("transfer", "t-1").await.unwrap();

    let stored = store
        .load_state(&ComponentRef::new("transfer", "t-1"))
        .await
        .unwrap()
        .unwrap();
    let snapshot: WorkflowSnapshot = serde_json::from_value(stored.payload).unwrap();
    assert!(snapshot.finished());
    assert_eq!(bank.balance("alice"), Some(400));
    assert_eq!(bank.balance("bob"), Some(100));
}

#[tokio::test]
async fn commands_for_one_instance_are_serialized() {
    let service = StatefoldService::builder(MemoryStore::new())
        .register_event_sourced::<CounterEntity>()
        .build()
        .unwrap();

    // Without the per-instance lock, concurrent appends against the same log
    // would collide on the expected sequence.
    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .invoke(
                    "counter",
                    "c-1",
                    json!({ "type": "Increase", "value": 3 }),
                    Metadata::new(),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reply = service
        .invoke("counter", "c-1", json!({ "type": "Get" }), Metadata::new())
        .await
        .unwrap();
    assert_eq!(reply, json!(30));
}

#[tokio::test]
async fn instances_are_independent() {
    let service = StatefoldService::builder(MemoryStore::new())
        .register_event_sourced::<CounterEntity>()
        .build()
        .unwrap();

    service
        .invoke(
            "counter",
            "c-1",
            json!({ "type": "Increase", "value": 6 }),
            Metadata::new(),
        )
        .await
        .unwrap();
    service
        .invoke(
            "counter",
            "c-2",
            json!({ "type": "Increase", "value": 9 }),
            Metadata::new(),
        )
        .await
        .unwrap();

    let first = service
        .invoke("counter", "c-1", json!({ "type": "Get" }), Metadata::new())
        .await
        .unwrap();
    let second = service
        .invoke("counter", "c-2", json!({ "type": "Get" }), Metadata::new())
        .await
        .unwrap();
    assert_eq!(first, json!(6));
    assert_eq!(second, json!(9));
}
