//! Governor invariant checking for fuzz testing
//!
//! Invariants:
//! - P1: status only moves Proposed -> Resolved -> Executed or Proposed -> Rejected
//! - P2: assertion id is set once and never changes
//! - P3: challenge_window_ends == proposal_time + liveness
//! - P4: executed only when Resolved and after the challenge window
//! - L1: at most one live proposal per hash, and the lock points at it
//! - B1: a batch executes completely, in order, or not at all
//! - C1: bond collateral is conserved across every instruction

use anchor_lang::prelude::Pubkey;
use optimistic_governor::state::{GovernanceTransaction, Proposal, ProposalHashLock, ProposalStatus};

/// Proposal invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalInvariantResult {
    Valid,
    InvalidStateTransition { from: ProposalStatus, to: ProposalStatus },
    AssertionIdChanged,
    ChallengeWindowMismatch { expected: i64, actual: i64 },
    ExecutedBeforeWindow { ends: i64, executed_at: i64 },
    ExecutedWithoutSettlement,
}

/// Hash lock invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockInvariantResult {
    Valid,
    MultipleLiveProposals { count: usize },
    LiveFlagMismatch { live_proposals: usize, lock_live: bool },
    LockPointsElsewhere,
}

/// Batch execution invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchInvariantResult {
    Valid,
    PartialExecution { executed: usize, total: usize },
    OutOfOrder { index: usize },
}

/// Collateral invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollateralInvariantResult {
    Valid,
    SupplyChanged { before: u128, after: u128 },
}

// ============================================================================
// Proposal Invariants (P1-P4)
// ============================================================================

/// P1: Valid status transitions. Staying in place is always allowed.
pub fn check_status_transition(from: ProposalStatus, to: ProposalStatus) -> ProposalInvariantResult {
    use ProposalStatus::*;
    let valid = from == to
        || matches!(
            (from, to),
            (Proposed, Resolved) | (Proposed, Rejected) | (Resolved, Executed)
        );
    if valid {
        ProposalInvariantResult::Valid
    } else {
        ProposalInvariantResult::InvalidStateTransition { from, to }
    }
}

/// P2: Assertion id stability
pub fn check_assertion_id_stable(before: &[u8; 32], after: &[u8; 32]) -> ProposalInvariantResult {
    if before == after {
        ProposalInvariantResult::Valid
    } else {
        ProposalInvariantResult::AssertionIdChanged
    }
}

/// P3: Challenge window derived from submission time and liveness
pub fn check_challenge_window(proposal: &Proposal, liveness: i64) -> ProposalInvariantResult {
    let expected = proposal.proposal_time.saturating_add(liveness);
    if proposal.challenge_window_ends == expected {
        ProposalInvariantResult::Valid
    } else {
        ProposalInvariantResult::ChallengeWindowMismatch {
            expected,
            actual: proposal.challenge_window_ends,
        }
    }
}

/// P4: Execution timing
pub fn check_execution_timing(proposal: &Proposal) -> ProposalInvariantResult {
    if proposal.status != ProposalStatus::Executed {
        return ProposalInvariantResult::Valid;
    }
    if proposal.settled_at == 0 {
        return ProposalInvariantResult::ExecutedWithoutSettlement;
    }
    if proposal.executed_at < proposal.challenge_window_ends {
        return ProposalInvariantResult::ExecutedBeforeWindow {
            ends: proposal.challenge_window_ends,
            executed_at: proposal.executed_at,
        };
    }
    ProposalInvariantResult::Valid
}

// ============================================================================
// Lock Invariants (L1)
// ============================================================================

/// L1: For one hash, `proposals` is every (address, proposal) ever submitted.
pub fn check_hash_lock<'a>(
    lock: &ProposalHashLock,
    proposals: impl Iterator<Item = (&'a Pubkey, &'a Proposal)>,
) -> LockInvariantResult {
    let live: Vec<_> = proposals
        .filter(|(_, p)| !p.status.is_terminal())
        .collect();
    if live.len() > 1 {
        return LockInvariantResult::MultipleLiveProposals { count: live.len() };
    }
    if lock.live != (live.len() == 1) {
        return LockInvariantResult::LiveFlagMismatch {
            live_proposals: live.len(),
            lock_live: lock.live,
        };
    }
    if let Some((key, _)) = live.first() {
        if **key != lock.live_proposal {
            return LockInvariantResult::LockPointsElsewhere;
        }
    }
    LockInvariantResult::Valid
}

// ============================================================================
// Batch Invariants (B1)
// ============================================================================

/// B1: `executed` is what the avatar ran during one execute attempt.
pub fn check_batch_all_or_nothing(
    batch: &[GovernanceTransaction],
    executed: &[GovernanceTransaction],
) -> BatchInvariantResult {
    if executed.is_empty() {
        return BatchInvariantResult::Valid;
    }
    if executed.len() != batch.len() {
        return BatchInvariantResult::PartialExecution {
            executed: executed.len(),
            total: batch.len(),
        };
    }
    match batch.iter().zip(executed).position(|(want, got)| want != got) {
        Some(index) => BatchInvariantResult::OutOfOrder { index },
        None => BatchInvariantResult::Valid,
    }
}

// ============================================================================
// Collateral Invariants (C1)
// ============================================================================

/// C1: total collateral across holders and escrows never changes
pub fn check_collateral_conserved(before: u128, after: u128) -> CollateralInvariantResult {
    if before == after {
        CollateralInvariantResult::Valid
    } else {
        CollateralInvariantResult::SupplyChanged { before, after }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use ProposalStatus::*;
        assert_eq!(check_status_transition(Proposed, Resolved), ProposalInvariantResult::Valid);
        assert_eq!(check_status_transition(Proposed, Rejected), ProposalInvariantResult::Valid);
        assert_eq!(check_status_transition(Resolved, Executed), ProposalInvariantResult::Valid);
        assert_eq!(check_status_transition(Executed, Executed), ProposalInvariantResult::Valid);
        assert!(matches!(
            check_status_transition(Proposed, Executed),
            ProposalInvariantResult::InvalidStateTransition { .. }
        ));
        assert!(matches!(
            check_status_transition(Rejected, Resolved),
            ProposalInvariantResult::InvalidStateTransition { .. }
        ));
        assert!(matches!(
            check_status_transition(Executed, Resolved),
            ProposalInvariantResult::InvalidStateTransition { .. }
        ));
    }

    #[test]
    fn test_execution_before_window_detected() {
        let proposal = Proposal {
            status: ProposalStatus::Executed,
            challenge_window_ends: 100,
            settled_at: 50,
            executed_at: 99,
            ..Proposal::default()
        };
        assert_eq!(
            check_execution_timing(&proposal),
            ProposalInvariantResult::ExecutedBeforeWindow {
                ends: 100,
                executed_at: 99
            }
        );
    }

    #[test]
    fn test_lock_with_two_live_proposals() {
        let a = Pubkey::new_from_array([1u8; 32]);
        let b = Pubkey::new_from_array([2u8; 32]);
        let live = Proposal::default();
        let lock = ProposalHashLock {
            live: true,
            live_proposal: a,
            ..ProposalHashLock::default()
        };
        let proposals = [(a, live.clone()), (b, live)];
        assert_eq!(
            check_hash_lock(&lock, proposals.iter().map(|(k, p)| (k, p))),
            LockInvariantResult::MultipleLiveProposals { count: 2 }
        );
    }

    #[test]
    fn test_partial_batch_detected() {
        let tx = GovernanceTransaction {
            to: Pubkey::new_from_array([1u8; 32]),
            value: 0,
            data: vec![],
            operation: Default::default(),
            accounts: vec![],
        };
        let batch = vec![tx.clone(), tx.clone()];
        assert_eq!(
            check_batch_all_or_nothing(&batch, &batch[..1]),
            BatchInvariantResult::PartialExecution {
                executed: 1,
                total: 2
            }
        );
        assert_eq!(check_batch_all_or_nothing(&batch, &[]), BatchInvariantResult::Valid);
        assert_eq!(check_batch_all_or_nothing(&batch, &batch), BatchInvariantResult::Valid);
    }
}
