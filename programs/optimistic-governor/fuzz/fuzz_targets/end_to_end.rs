//! End-to-end governor scenarios
//!
//! Tests invariants:
//! - A full propose, settle, attest, execute cycle pays out exactly the
//!   proposed amounts and emits one record per transaction plus one per batch
//! - P1, P2, L1, C1 hold after every step of an arbitrary call sequence
//!
//! Run with: cargo test --release -p optimistic-governor-fuzz end_to_end

use crate::*;
use anchor_lang::prelude::Pubkey;
use optimistic_governor::state::{GovernanceTransaction, Operation, ProposalStatus};
use optimistic_governor::utils::merkle;
use proptest::prelude::*;

const START: i64 = 1_700_000_000;

fn transfer(to: Pubkey, value: u64) -> GovernanceTransaction {
    GovernanceTransaction {
        to,
        value,
        data: vec![],
        operation: Operation::Call,
        accounts: vec![],
    }
}

#[test]
fn test_three_transfer_proposal_with_votes() {
    let mut ledger = SimulatedLedger::new(SimulatedConfig::default(), START);
    let proposer = Pubkey::new_from_array([10u8; 32]);
    let alice = Pubkey::new_from_array([11u8; 32]);
    let bob = Pubkey::new_from_array([12u8; 32]);
    let voter_a = Pubkey::new_from_array([21u8; 32]);
    let voter_b = Pubkey::new_from_array([22u8; 32]);
    ledger.fund_proposer(proposer);
    let supply = ledger.tokens.total_supply();
    let avatar_lamports = ledger.avatar.lamports;

    let batch = vec![transfer(alice, 100), transfer(bob, 250), transfer(alice, 50)];
    let votes = [(voter_a, (600u64, 0u64, 0u64)), (voter_b, (400, 0, 0))];
    let (resolution, tree) = build_vote_resolution(&votes).unwrap();
    assert_eq!(resolution.for_votes, 1_000);

    let key = ledger
        .propose(proposer, batch.clone(), b"Pay contributors".to_vec(), Some(resolution))
        .unwrap();
    let proposal_hash = ledger.proposals[&key].proposal_hash;
    let assertion_id = ledger.proposals[&key].assertion_id;

    for (voter, record) in &votes {
        let leaf = merkle::vote_leaf(voter, record.0, record.1, record.2);
        let proof = tree.proof(&leaf).unwrap();
        ledger.attest(key, *voter, *record, &proof).unwrap();
    }

    ledger.advance(ledger.config.liveness);
    ledger.oracle_settles(&key, true);
    assert_eq!(ledger.settle(key).unwrap(), ProposalStatus::Resolved);
    ledger.execute(key, &batch).unwrap();

    assert_eq!(ledger.avatar.received[&alice], 150);
    assert_eq!(ledger.avatar.received[&bob], 250);
    assert_eq!(ledger.avatar.lamports, avatar_lamports - 400);
    assert_eq!(
        ledger.avatar.executed.iter().map(|args| args.to).collect::<Vec<_>>(),
        vec![alice, bob, alice]
    );

    let executed: Vec<_> = ledger
        .events
        .iter()
        .filter(|event| {
            matches!(
                event,
                SimEvent::TransactionExecuted { .. } | SimEvent::ProposalExecuted { .. }
            )
        })
        .cloned()
        .collect();
    assert_eq!(
        executed,
        vec![
            SimEvent::TransactionExecuted {
                proposal_hash,
                assertion_id,
                transaction_index: 0
            },
            SimEvent::TransactionExecuted {
                proposal_hash,
                assertion_id,
                transaction_index: 1
            },
            SimEvent::TransactionExecuted {
                proposal_hash,
                assertion_id,
                transaction_index: 2
            },
            SimEvent::ProposalExecuted {
                proposal_hash,
                assertion_id
            },
        ]
    );
    assert!(matches!(
        ledger.events.first(),
        Some(SimEvent::TransactionsProposed { transaction_count: 3, .. })
    ));
    assert!(matches!(
        ledger.events.get(1),
        Some(SimEvent::VoteResolved { .. })
    ));

    // Bond returned to the proposer after the undisputed assertion settled
    assert_eq!(ledger.tokens.total_supply(), supply);
    assert_eq!(ledger.tokens.balances[&proposer], ledger.config.bond_amount);
    assert_eq!(ledger.proposals[&key].attestations, 2);
    assert!(ledger.invariant_violations().is_empty());
}

#[test]
fn test_rejected_proposal_forfeits_bond_and_frees_hash() {
    let mut ledger = SimulatedLedger::new(SimulatedConfig::default(), START);
    let proposer = Pubkey::new_from_array([10u8; 32]);
    let batch = vec![transfer(Pubkey::new_from_array([11u8; 32]), 1)];
    ledger.fund_proposer(proposer);

    let first = ledger.propose(proposer, batch.clone(), vec![], None).unwrap();
    ledger.oracle_settles(&first, false);
    assert_eq!(ledger.settle(first).unwrap(), ProposalStatus::Rejected);

    // Bond stays with the oracle for the disputer
    assert_eq!(ledger.tokens.balances[&proposer], 0);
    assert_eq!(ledger.tokens.oracle_escrow, ledger.config.bond_amount);

    ledger.fund_proposer(proposer);
    let second = ledger.propose(proposer, batch, vec![], None).unwrap();
    assert_ne!(first, second);
    assert!(ledger.invariant_violations().is_empty());
}

/// One step of an arbitrary governor call sequence
#[derive(Debug, Clone)]
enum Step {
    Propose { batch: usize, explanation: usize },
    OracleSettles { proposal: usize, result: bool },
    Settle { proposal: usize },
    Execute { proposal: usize },
    Advance { seconds: i64 },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0usize..3, 0usize..2).prop_map(|(batch, explanation)| Step::Propose { batch, explanation }),
        2 => (any::<usize>(), any::<bool>()).prop_map(|(proposal, result)| Step::OracleSettles { proposal, result }),
        2 => any::<usize>().prop_map(|proposal| Step::Settle { proposal }),
        2 => any::<usize>().prop_map(|proposal| Step::Execute { proposal }),
        1 => (0i64..20_000).prop_map(|seconds| Step::Advance { seconds }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Ledger-wide invariants hold after every step, whether the step
    /// succeeds or fails
    #[test]
    fn fuzz_arbitrary_call_sequence(
        batches in prop::collection::vec(arb_batch(), 3),
        steps in prop::collection::vec(arb_step(), 1..40),
    ) {
        let explanations = [b"first".to_vec(), b"second".to_vec()];
        let proposer = Pubkey::new_from_array([10u8; 32]);
        let mut ledger = SimulatedLedger::new(SimulatedConfig::default(), START);
        let mut keys: Vec<(Pubkey, usize)> = Vec::new();
        let supply_before_proposals = ledger.tokens.total_supply();
        let mut minted = 0u128;

        for step in steps {
            let before = ledger.status_snapshot();
            let supply = ledger.tokens.total_supply();

            match step {
                Step::Propose { batch, explanation } => {
                    ledger.fund_proposer(proposer);
                    minted += ledger.config.bond_amount as u128;
                    let funded = ledger.tokens.total_supply();
                    if let Ok(key) = ledger.propose(
                        proposer,
                        batches[batch].clone(),
                        explanations[explanation].clone(),
                        None,
                    ) {
                        keys.push((key, batch));
                    }
                    prop_assert_eq!(ledger.tokens.total_supply(), funded);
                }
                Step::OracleSettles { proposal, result } => {
                    if let Some((key, _)) = keys.get(proposal % keys.len().max(1)) {
                        ledger.oracle_settles(key, result);
                    }
                    prop_assert_eq!(ledger.tokens.total_supply(), supply);
                }
                Step::Settle { proposal } => {
                    if let Some((key, _)) = keys.get(proposal % keys.len().max(1)) {
                        let _ = ledger.settle(*key);
                    }
                    prop_assert_eq!(ledger.tokens.total_supply(), supply);
                }
                Step::Execute { proposal } => {
                    if let Some((key, batch)) = keys.get(proposal % keys.len().max(1)) {
                        let executed = ledger.avatar.executed.len();
                        let result = ledger.execute(*key, &batches[*batch]);
                        let ran = ledger.avatar.executed.len() - executed;
                        prop_assert_eq!(ran, if result.is_ok() { batches[*batch].len() } else { 0 });
                    }
                    prop_assert_eq!(ledger.tokens.total_supply(), supply);
                }
                Step::Advance { seconds } => ledger.advance(seconds),
            }

            let after = ledger.status_snapshot();
            let violations = SimulatedLedger::transition_violations(&before, &after);
            prop_assert!(violations.is_empty(), "{:?}", violations);
            let violations = ledger.invariant_violations();
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }

        prop_assert_eq!(
            ledger.tokens.total_supply(),
            supply_before_proposals + minted
        );
        prop_assert!(ledger
            .proposals
            .values()
            .all(|p| p.status != ProposalStatus::Executed || p.executed_at >= p.challenge_window_ends));
    }
}
