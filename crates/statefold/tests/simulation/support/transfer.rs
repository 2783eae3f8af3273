//! Transfer workflow with a fraud-detection step, plus the bank collaborator
//! its withdraw/deposit steps call.
//!
//! Amounts below 1000 are verified automatically, amounts from 1000 up to
//! (but excluding) 1,000,000 require manual acceptance, and larger amounts
//! are rejected outright.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use statefold::workflow::{Effect, Step, TransitionEffect, Workflow, WorkflowDef};
use statefold::WorkflowContext;

pub const FRAUD_DETECTION: &str = "fraud-detection";
pub const WITHDRAW: &str = "withdraw";
pub const DEPOSIT: &str = "deposit";

/// In-process stand-in for the wallet service the workflow steps call.
///
/// Withdrawals can be made to fail a set number of times to exercise the
/// at-least-once step contract.
#[derive(Clone, Default)]
pub struct Bank {
    accounts: Arc<Mutex<HashMap<String, i64>>>,
    failing_withdrawals: Arc<AtomicUsize>,
}

impl Bank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, owner: &str, balance: i64) -> Self {
        self.accounts
            .lock()
            .expect("bank accounts poisoned")
            .insert(owner.to_owned(), balance);
        self
    }

    pub fn balance(&self, owner: &str) -> Option<i64> {
        self.accounts
            .lock()
            .expect("bank accounts poisoned")
            .get(owner)
            .copied()
    }

    /// Make the next `count` withdrawal calls fail with an infrastructure
    /// error before touching any balance.
    pub fn fail_next_withdrawals(&self, count: usize) {
        self.failing_withdrawals.store(count, Ordering::SeqCst);
    }

    async fn withdraw(&self, owner: String, amount: i64) -> anyhow::Result<String> {
        if self
            .failing_withdrawals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
        {
            bail!("wallet service unavailable");
        }

        let mut accounts = self.accounts.lock().expect("bank accounts poisoned");
        let balance = accounts
            .get_mut(&owner)
            .ok_or_else(|| anyhow::anyhow!("no account for {owner}"))?;
        if *balance < amount {
            bail!("insufficient balance: {balance}");
        }
        *balance -= amount;
        Ok("ok".to_owned())
    }

    async fn deposit(&self, owner: String, amount: i64) -> anyhow::Result<String> {
        let mut accounts = self.accounts.lock().expect("bank accounts poisoned");
        *accounts.entry(owner).or_insert(0) += amount;
        Ok("ok".to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferState {
    pub transfer: Transfer,
    pub last_step: String,
    pub accepted: bool,
    pub finished: bool,
}

impl TransferState {
    fn started(transfer: Transfer) -> Self {
        Self {
            transfer,
            last_step: "started".to_owned(),
            accepted: false,
            finished: false,
        }
    }

    fn with_last_step(&self, step: &str) -> Self {
        Self {
            last_step: step.to_owned(),
            ..self.clone()
        }
    }

    fn accept(&self) -> Self {
        Self {
            accepted: true,
            ..self.clone()
        }
    }

    fn finish(&self) -> Self {
        Self {
            finished: true,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FraudDetectionResult {
    TransferVerified { transfer: Transfer },
    TransferRequiresManualAcceptation { transfer: Transfer },
    TransferRejected { transfer: Transfer },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdraw {
    pub from: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub to: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransferCommand {
    Start { transfer: Transfer },
    Accept,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub struct TransferWorkflow {
    bank: Bank,
}

impl TransferWorkflow {
    pub fn new(bank: Bank) -> Self {
        Self { bank }
    }
}

impl Workflow for TransferWorkflow {
    type State = TransferState;
    type Command = TransferCommand;
    type Reply = Message;

    const TYPE: &'static str = "transfer";

    fn definition(&self) -> statefold::Result<WorkflowDef<TransferState>> {
        let withdraw_bank = self.bank.clone();
        let deposit_bank = self.bank.clone();

        WorkflowDef::builder()
            .step(Step::new(FRAUD_DETECTION, check_frauds, process_fraud_result))
            .step(Step::new(
                WITHDRAW,
                move |cmd: Withdraw| {
                    let bank = withdraw_bank.clone();
                    async move { bank.withdraw(cmd.from, cmd.amount).await }
                },
                move_to_deposit,
            ))
            .step(Step::new(
                DEPOSIT,
                move |cmd: Deposit| {
                    let bank = deposit_bank.clone();
                    async move { bank.deposit(cmd.to, cmd.amount).await }
                },
                finish_with_success,
            ))
            .build()
    }

    fn handle(
        &self,
        state: Option<&TransferState>,
        command: TransferCommand,
        _ctx: &WorkflowContext,
    ) -> Effect<TransferState, Message> {
        match command {
            TransferCommand::Start { transfer } => {
                if transfer.amount <= 0 {
                    Effect::error("transfer amount should be greater than zero")
                } else if state.is_some() {
                    Effect::reply(Message::new("transfer already started"))
                } else {
                    Effect::update_state(TransferState::started(transfer.clone()))
                        .transition_to(FRAUD_DETECTION, &transfer)
                        .then_reply(Message::new("transfer started"))
                }
            }
            TransferCommand::Accept => match state {
                None => Effect::reply(Message::new("transfer not started")),
                Some(state) if !state.accepted && !state.finished => {
                    let withdraw = Withdraw {
                        from: state.transfer.from.clone(),
                        amount: state.transfer.amount,
                    };
                    Effect::update_state(state.accept())
                        .transition_to(WITHDRAW, &withdraw)
                        .then_reply(Message::new("transfer accepted"))
                }
                Some(_) => Effect::reply(Message::new("transfer cannot be accepted")),
            },
        }
    }
}

async fn check_frauds(transfer: Transfer) -> anyhow::Result<FraudDetectionResult> {
    if transfer.amount >= 1_000_000 {
        Ok(FraudDetectionResult::TransferRejected { transfer })
    } else if transfer.amount >= 1000 {
        Ok(FraudDetectionResult::TransferRequiresManualAcceptation { transfer })
    } else {
        Ok(FraudDetectionResult::TransferVerified { transfer })
    }
}

fn process_fraud_result(
    state: Option<&TransferState>,
    result: FraudDetectionResult,
) -> TransitionEffect<TransferState> {
    let state = state
        .expect("fraud detection ran without transfer state")
        .with_last_step(FRAUD_DETECTION);

    match result {
        FraudDetectionResult::TransferVerified { transfer } => {
            let withdraw = Withdraw {
                from: transfer.from.clone(),
                amount: transfer.amount,
            };
            TransitionEffect::update_state(state).transition_to(WITHDRAW, &withdraw)
        }
        FraudDetectionResult::TransferRequiresManualAcceptation { .. } => {
            TransitionEffect::update_state(state).pause()
        }
        FraudDetectionResult::TransferRejected { .. } => {
            TransitionEffect::update_state(state.finish()).end()
        }
    }
}

fn move_to_deposit(
    state: Option<&TransferState>,
    _response: String,
) -> TransitionEffect<TransferState> {
    let state = state.expect("withdraw ran without transfer state");
    let deposit = Deposit {
        to: state.transfer.to.clone(),
        amount: state.transfer.amount,
    };
    TransitionEffect::update_state(state.with_last_step(WITHDRAW)).transition_to(DEPOSIT, &deposit)
}

fn finish_with_success(
    state: Option<&TransferState>,
    _response: String,
) -> TransitionEffect<TransferState> {
    let state = state.expect("deposit ran without transfer state");
    TransitionEffect::update_state(state.with_last_step(DEPOSIT).finish()).end()
}
