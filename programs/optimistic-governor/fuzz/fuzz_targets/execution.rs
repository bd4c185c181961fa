//! Fuzz target for settle_proposal and execute_proposal timing
//!
//! Tests invariants:
//! - P1: status only moves along the allowed transitions
//! - P2: the assertion id never changes after proposal
//! - P4: a proposal executes only when Resolved and the window has elapsed
//! - A proposal executes at most once
//! - A rejected proposal never executes
//!
//! Run with: cargo test --release -p optimistic-governor-fuzz execution

use crate::*;
use anchor_lang::prelude::Pubkey;
use optimistic_governor::errors::GovernorError;
use optimistic_governor::state::ProposalStatus;
use proptest::prelude::*;

fn proposed(input: &ProposeInput) -> (SimulatedLedger, Pubkey) {
    let mut ledger = SimulatedLedger::new(
        SimulatedConfig {
            bond_amount: input.bond_amount,
            liveness: input.liveness,
            ..SimulatedConfig::default()
        },
        input.start_time,
    );
    let proposer = Pubkey::new_from_array([3u8; 32]);
    ledger.fund_proposer(proposer);
    let key = ledger
        .propose(proposer, input.transactions.clone(), input.explanation.clone(), None)
        .unwrap();
    (ledger, key)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Execution succeeds iff the oracle approved, settlement was applied and
    /// the challenge window has elapsed. Every failure names the reason.
    #[test]
    fn fuzz_execute_iff_resolved_and_window_elapsed(input in any::<ExecutionTimingInput>()) {
        let (mut ledger, key) = proposed(&input.proposal);

        if input.settle_first {
            ledger.oracle_settles(&key, input.approved);
            ledger.settle(key).unwrap();
        }
        ledger.advance(input.execute_after);
        let before = ledger.status_snapshot();

        let window_ends = ledger.proposals[&key].challenge_window_ends;
        let events = ledger.events.len();
        let result = ledger.execute(key, &input.proposal.transactions);

        match (input.settle_first, input.approved, ledger.now >= window_ends) {
            (false, _, _) => {
                prop_assert_eq!(result.unwrap_err(), governor_error(GovernorError::ProposalNotResolved));
            }
            (true, false, _) => {
                prop_assert_eq!(result.unwrap_err(), governor_error(GovernorError::ProposalWasRejected));
            }
            (true, true, false) => {
                prop_assert_eq!(result.unwrap_err(), governor_error(GovernorError::ChallengeWindowOpen));
            }
            (true, true, true) => {
                prop_assert!(result.is_ok());
                let proposal = &ledger.proposals[&key];
                prop_assert_eq!(proposal.status, ProposalStatus::Executed);
                prop_assert_eq!(proposal.executed_at, ledger.now);
                prop_assert_eq!(ledger.avatar.executed.len(), input.proposal.transactions.len());
            }
        }

        if ledger.proposals[&key].status != ProposalStatus::Executed {
            prop_assert!(ledger.avatar.executed.is_empty());
            prop_assert_eq!(ledger.events.len(), events);
        }

        let violations = SimulatedLedger::transition_violations(&before, &ledger.status_snapshot());
        prop_assert!(violations.is_empty(), "{:?}", violations);
        let violations = ledger.invariant_violations();
        prop_assert!(violations.is_empty(), "{:?}", violations);
    }

    /// A second execute of the same proposal fails and runs nothing
    #[test]
    fn fuzz_execute_at_most_once(input in any::<ProposeInput>(), later in 0i64..1_000_000) {
        let (mut ledger, key) = proposed(&input);
        ledger.oracle_settles(&key, true);
        ledger.settle(key).unwrap();
        ledger.advance(input.liveness);

        ledger.execute(key, &input.transactions).unwrap();
        let executed = ledger.avatar.executed.len();

        ledger.advance(later);
        let err = ledger.execute(key, &input.transactions).unwrap_err();
        prop_assert_eq!(err, governor_error(GovernorError::ProposalAlreadyExecuted));
        prop_assert_eq!(ledger.avatar.executed.len(), executed);

        // Executing releases the hash for a fresh proposal
        let executed_proposal = ledger.proposals[&key].clone();
        prop_assert!(!ledger.locks[&executed_proposal.proposal_hash].live);

        let proposer = Pubkey::new_from_array([3u8; 32]);
        ledger.fund_proposer(proposer);
        let again = ledger
            .propose(proposer, input.transactions.clone(), input.explanation.clone(), None)
            .unwrap();
        let resubmitted = &ledger.proposals[&again];
        prop_assert_ne!(again, key);
        prop_assert_eq!(resubmitted.round, 1);
        prop_assert_eq!(resubmitted.proposal_hash, executed_proposal.proposal_hash);
        prop_assert_ne!(resubmitted.assertion_id, executed_proposal.assertion_id);
        prop_assert_eq!(resubmitted.status, ProposalStatus::Proposed);
        prop_assert_eq!(ledger.proposals[&key].status, ProposalStatus::Executed);
        prop_assert!(ledger.invariant_violations().is_empty());
    }

    /// Rejected proposals stay rejected no matter how long anyone waits
    #[test]
    fn fuzz_rejected_never_executes(input in any::<ProposeInput>(), later in 0i64..10_000_000) {
        let (mut ledger, key) = proposed(&input);
        ledger.oracle_settles(&key, false);
        prop_assert_eq!(ledger.settle(key).unwrap(), ProposalStatus::Rejected);

        ledger.advance(later);
        let err = ledger.execute(key, &input.transactions).unwrap_err();
        prop_assert_eq!(err, governor_error(GovernorError::ProposalWasRejected));

        // Settling again is refused too
        let err = ledger.settle(key).unwrap_err();
        prop_assert_eq!(err, governor_error(GovernorError::ProposalNotPending));
        prop_assert_eq!(ledger.proposals[&key].status, ProposalStatus::Rejected);
        prop_assert!(ledger.avatar.executed.is_empty());
    }

    /// Executing with a batch other than the proposed one fails with
    /// TransactionsMismatch
    #[test]
    fn fuzz_execute_requires_exact_batch(
        input in any::<ProposeInput>(),
        other in arb_batch(),
    ) {
        prop_assume!(other != input.transactions);
        let (mut ledger, key) = proposed(&input);
        ledger.oracle_settles(&key, true);
        ledger.settle(key).unwrap();
        ledger.advance(input.liveness);

        let err = ledger.execute(key, &other).unwrap_err();
        prop_assert_eq!(err, governor_error(GovernorError::TransactionsMismatch));
        prop_assert_eq!(ledger.proposals[&key].status, ProposalStatus::Resolved);

        // Reordering also counts as a different batch
        if input.transactions.len() > 1 && input.transactions.first() != input.transactions.last() {
            let mut reversed = input.transactions.clone();
            reversed.reverse();
            let err = ledger.execute(key, &reversed).unwrap_err();
            prop_assert_eq!(err, governor_error(GovernorError::TransactionsMismatch));
        }
        prop_assert!(ledger.avatar.executed.is_empty());
    }
}
