//! Fuzz target for all-or-nothing batch execution
//!
//! Tests invariants:
//! - B1: a batch runs completely, in order, or not at all
//! - A failed execution leaves the proposal Resolved and retryable
//! - C1: collateral is untouched by execution
//!
//! Run with: cargo test --release -p optimistic-governor-fuzz batch_atomicity

use crate::*;
use anchor_lang::prelude::Pubkey;
use optimistic_governor::avatar::ExecTransactionArgs;
use optimistic_governor::errors::GovernorError;
use optimistic_governor::state::{GovernanceTransaction, ProposalStatus};
use proptest::prelude::*;

fn executable(input: &ProposeInput) -> (SimulatedLedger, Pubkey) {
    let mut ledger = SimulatedLedger::new(
        SimulatedConfig {
            bond_amount: input.bond_amount,
            liveness: input.liveness,
            ..SimulatedConfig::default()
        },
        input.start_time,
    );
    let proposer = Pubkey::new_from_array([4u8; 32]);
    ledger.fund_proposer(proposer);
    let key = ledger
        .propose(proposer, input.transactions.clone(), input.explanation.clone(), None)
        .unwrap();
    ledger.oracle_settles(&key, true);
    ledger.settle(key).unwrap();
    ledger.advance(input.liveness);
    (ledger, key)
}

fn as_transactions(executed: &[ExecTransactionArgs], batch: &[GovernanceTransaction]) -> Vec<GovernanceTransaction> {
    executed
        .iter()
        .zip(batch)
        .map(|(args, tx)| GovernanceTransaction {
            to: args.to,
            value: args.value,
            data: args.data.clone(),
            operation: args.operation,
            accounts: tx.accounts.clone(),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// One failing target anywhere in the batch reverts the whole execution
    #[test]
    fn fuzz_batch_all_or_nothing(input in any::<AtomicityInput>()) {
        let batch = input.proposal.transactions.clone();
        let (mut ledger, key) = executable(&input.proposal);
        let failing = input.failing_index % batch.len();
        if input.inject_failure {
            ledger.avatar.failing_targets.insert(batch[failing].to);
        }

        let supply = ledger.tokens.total_supply();
        let lamports = ledger.avatar.lamports;
        let events = ledger.events.len();
        let result = ledger.execute(key, &batch);

        let executed = as_transactions(&ledger.avatar.executed, &batch);
        prop_assert_eq!(
            check_batch_all_or_nothing(&batch, &executed),
            BatchInvariantResult::Valid
        );
        prop_assert_eq!(
            check_collateral_conserved(supply, ledger.tokens.total_supply()),
            CollateralInvariantResult::Valid
        );

        if input.inject_failure {
            prop_assert_eq!(result.unwrap_err(), governor_error(GovernorError::TransactionExecutionFailed));
            prop_assert!(ledger.avatar.executed.is_empty());
            prop_assert_eq!(ledger.avatar.lamports, lamports);
            prop_assert_eq!(ledger.events.len(), events);
            prop_assert_eq!(ledger.proposals[&key].status, ProposalStatus::Resolved);
            prop_assert!(ledger.locks[&ledger.proposals[&key].proposal_hash].live);
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(executed.len(), batch.len());
            let spent: u64 = batch.iter().map(|tx| tx.value).sum();
            prop_assert_eq!(ledger.avatar.lamports, lamports - spent);
        }
    }

    /// After a failed attempt the same proposal executes once the target
    /// recovers
    #[test]
    fn fuzz_retry_after_failed_execution(input in any::<AtomicityInput>(), delay in 0i64..100_000) {
        let batch = input.proposal.transactions.clone();
        let (mut ledger, key) = executable(&input.proposal);
        let target = batch[input.failing_index % batch.len()].to;
        ledger.avatar.failing_targets.insert(target);

        prop_assert!(ledger.execute(key, &batch).is_err());

        ledger.avatar.failing_targets.remove(&target);
        ledger.advance(delay);
        ledger.execute(key, &batch).unwrap();

        let executed = as_transactions(&ledger.avatar.executed, &batch);
        prop_assert_eq!(&executed, &batch);
        prop_assert_eq!(ledger.proposals[&key].status, ProposalStatus::Executed);

        let indices: Vec<u16> = ledger
            .events
            .iter()
            .filter_map(|event| match event {
                SimEvent::TransactionExecuted { transaction_index, .. } => Some(*transaction_index),
                _ => None,
            })
            .collect();
        prop_assert_eq!(indices, (0..batch.len() as u16).collect::<Vec<_>>());
    }
}
