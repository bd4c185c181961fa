//! Fuzz target for propose_transactions
//!
//! Tests invariants:
//! - Proposal hash is a deterministic function of (transactions, explanation)
//! - L1: a second live proposal with the same hash is rejected
//! - A rejected hash can be proposed again in the next round
//! - C1: collateral is conserved, and a failed proposal leaves no trace
//!
//! Run with: cargo test --release -p optimistic-governor-fuzz propose

use crate::*;
use anchor_lang::prelude::Pubkey;
use optimistic_governor::errors::GovernorError;
use optimistic_governor::state::ProposalStatus;
use optimistic_governor::utils::proposal_hash::compute_proposal_hash;
use proptest::prelude::*;

fn ledger_for(input: &ProposeInput) -> SimulatedLedger {
    SimulatedLedger::new(
        SimulatedConfig {
            bond_amount: input.bond_amount,
            liveness: input.liveness,
            ..SimulatedConfig::default()
        },
        input.start_time,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Same batch and explanation always hash the same; any change to the
    /// explanation changes the hash
    #[test]
    fn fuzz_proposal_hash_deterministic(
        input in any::<ProposeInput>(),
        other_explanation in arb_explanation(),
    ) {
        let hash = compute_proposal_hash(&input.transactions, &input.explanation).unwrap();
        prop_assert_eq!(hash, compute_proposal_hash(&input.transactions.clone(), &input.explanation.clone()).unwrap());

        if other_explanation != input.explanation {
            prop_assert_ne!(hash, compute_proposal_hash(&input.transactions, &other_explanation).unwrap());
        }
    }

    /// Submitting the same proposal twice while the first is live fails with
    /// DuplicateProposal and changes nothing
    #[test]
    fn fuzz_duplicate_proposal_rejected(input in any::<ProposeInput>(), settle_first in any::<bool>()) {
        let mut ledger = ledger_for(&input);
        let alice = Pubkey::new_from_array([1u8; 32]);
        let bob = Pubkey::new_from_array([2u8; 32]);
        ledger.fund_proposer(alice);
        ledger.fund_proposer(bob);

        let first = ledger
            .propose(alice, input.transactions.clone(), input.explanation.clone(), None)
            .unwrap();

        // Still live after an approving settlement
        if settle_first {
            ledger.oracle_settles(&first, true);
            prop_assert_eq!(ledger.settle(first).unwrap(), ProposalStatus::Resolved);
        }

        let supply = ledger.tokens.total_supply();
        let events = ledger.events.len();
        let err = ledger
            .propose(bob, input.transactions.clone(), input.explanation.clone(), None)
            .unwrap_err();

        prop_assert_eq!(err, governor_error(GovernorError::DuplicateProposal));
        prop_assert_eq!(ledger.proposals.len(), 1);
        prop_assert_eq!(ledger.events.len(), events);
        prop_assert_eq!(ledger.tokens.total_supply(), supply);
        prop_assert_eq!(ledger.tokens.balances[&bob], input.bond_amount);
        prop_assert!(ledger.invariant_violations().is_empty());
    }

    /// After the oracle rejects a proposal, the same hash may be proposed
    /// again; the old proposal stays Rejected
    #[test]
    fn fuzz_resubmit_after_rejection(input in any::<ProposeInput>()) {
        let mut ledger = ledger_for(&input);
        let alice = Pubkey::new_from_array([1u8; 32]);
        ledger.fund_proposer(alice);

        let first = ledger
            .propose(alice, input.transactions.clone(), input.explanation.clone(), None)
            .unwrap();
        ledger.oracle_settles(&first, false);
        prop_assert_eq!(ledger.settle(first).unwrap(), ProposalStatus::Rejected);

        ledger.fund_proposer(alice);
        ledger.advance(1);
        let second = ledger
            .propose(alice, input.transactions.clone(), input.explanation.clone(), None)
            .unwrap();

        prop_assert_ne!(first, second);
        prop_assert_eq!(ledger.proposals[&first].status, ProposalStatus::Rejected);
        prop_assert_eq!(ledger.proposals[&second].round, 1);
        prop_assert_eq!(
            ledger.proposals[&first].proposal_hash,
            ledger.proposals[&second].proposal_hash
        );
        prop_assert_ne!(
            ledger.proposals[&first].assertion_id,
            ledger.proposals[&second].assertion_id
        );
        prop_assert!(ledger.invariant_violations().is_empty());
    }

    /// A proposal fails atomically when the bond is missing or the oracle
    /// rejects the assertion
    #[test]
    fn fuzz_failed_proposal_has_no_side_effects(
        input in any::<ProposeInput>(),
        approve in any::<bool>(),
        oracle_rejects in any::<bool>(),
    ) {
        let mut ledger = ledger_for(&input);
        let alice = Pubkey::new_from_array([1u8; 32]);
        ledger.tokens.mint(alice, input.bond_amount);
        if approve {
            ledger.tokens.approve(alice, input.bond_amount);
        }
        ledger.oracle.reject_next = oracle_rejects;

        let supply = ledger.tokens.total_supply();
        let result = ledger.propose(alice, input.transactions.clone(), input.explanation.clone(), None);

        prop_assert_eq!(ledger.tokens.total_supply(), supply);
        match (approve, oracle_rejects) {
            (true, false) => {
                let key = result.unwrap();
                let proposal = &ledger.proposals[&key];
                prop_assert_eq!(proposal.status, ProposalStatus::Proposed);
                prop_assert_ne!(proposal.assertion_id, [0u8; 32]);
                prop_assert_eq!(ledger.tokens.oracle_escrow, input.bond_amount);
                prop_assert_eq!(ledger.tokens.balances[&alice], 0);
            }
            (false, _) => {
                prop_assert_eq!(result.unwrap_err(), governor_error(GovernorError::BondNotApproved));
            }
            (true, true) => {
                prop_assert_eq!(result.unwrap_err(), governor_error(GovernorError::OracleAssertionFailed));
            }
        }
        if !approve || oracle_rejects {
            prop_assert!(ledger.locks.is_empty());
            prop_assert!(ledger.events.is_empty());
            prop_assert_eq!(ledger.tokens.balances[&alice], input.bond_amount);
        }
    }

    /// P3: every recorded proposal's window ends exactly `liveness` after
    /// submission, even after the owner changes liveness
    #[test]
    fn fuzz_challenge_window_snapshot(
        input in any::<ProposeInput>(),
        new_liveness in arb_liveness(),
    ) {
        let mut ledger = ledger_for(&input);
        let alice = Pubkey::new_from_array([1u8; 32]);
        ledger.fund_proposer(alice);
        let key = ledger
            .propose(alice, input.transactions.clone(), input.explanation.clone(), None)
            .unwrap();

        let proposal = &ledger.proposals[&key];
        prop_assert_eq!(proposal.challenge_window_ends, input.start_time + input.liveness);

        ledger.config.liveness = new_liveness;
        prop_assert_eq!(
            ledger.proposals[&key].challenge_window_ends,
            input.start_time + input.liveness
        );
    }
}
