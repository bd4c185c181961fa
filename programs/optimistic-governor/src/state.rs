//! Account state structures for the Optimistic Governor

use anchor_lang::prelude::*;

use crate::errors::GovernorError;

// ============================================================================
// Size Constants
// ============================================================================

/// Maximum length of the rules text stored in the governor config
pub const MAX_RULES_LEN: usize = 512;

// ============================================================================
// Transaction batch types
// ============================================================================

/// How the avatar should run a proposed transaction.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Operation {
    /// Plain call from the avatar to the target program
    #[default]
    Call = 0,
    /// Target code runs in the avatar's own context
    DelegateCall = 1,
}

/// Account metadata required by a proposed transaction's target instruction.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionAccount {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// A single action the avatar performs when a proposal is executed.
///
/// Immutable once included in a proposal: the proposal commits to the borsh
/// encoding of the whole batch.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct GovernanceTransaction {
    /// Target program
    pub to: Pubkey,
    /// Lamports forwarded by the avatar
    pub value: u64,
    /// Instruction data for the target program
    pub data: Vec<u8>,
    pub operation: Operation,
    /// Accounts the target instruction reads or writes
    pub accounts: Vec<TransactionAccount>,
}

/// Optional vote summary attached to a proposal.
///
/// `vote_merkle_root` commits to `(voter, for, against, abstain)` leaves built
/// with [`crate::utils::merkle::vote_leaf`]. Nothing is tallied on-chain.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct VoteResolution {
    pub for_votes: u64,
    pub against_votes: u64,
    pub abstain_votes: u64,
    pub vote_merkle_root: [u8; 32],
    /// Opaque metadata (e.g. serialized proofs for voters). Emitted, not stored.
    pub data: String,
}

// ============================================================================
// Governor configuration
// ============================================================================

/// Governor configuration account
/// PDA seeds: ["governor", avatar]
#[account]
#[derive(InitSpace)]
pub struct GovernorConfig {
    /// Authority allowed to change governor parameters (the DAO)
    pub owner: Pubkey,
    /// Controlled account that executes approved batches
    pub avatar: Pubkey,
    /// Program owning the avatar
    pub avatar_program: Pubkey,
    /// External assertion oracle program
    pub oracle_program: Pubkey,
    /// Mint of the bond collateral
    pub collateral_mint: Pubkey,
    /// Bond posted per proposal, in collateral base units
    pub bond_amount: u64,
    /// Challenge window in seconds
    pub liveness: i64,
    /// Oracle identifier the claims are asserted under
    pub identifier: [u8; 32],
    /// Rules every proposal is asserted against
    #[max_len(512)]
    pub rules: String,
    /// Total proposals submitted (monotonic counter)
    pub total_proposals: u64,
    /// Total proposals executed
    pub executed_proposals: u64,
    /// Bump seed
    pub bump: u8,
    /// Reserved for future use
    pub _reserved: [u8; 32],
}

impl GovernorConfig {
    pub const SIZE: usize = 8 +  // discriminator
        32 + // owner
        32 + // avatar
        32 + // avatar_program
        32 + // oracle_program
        32 + // collateral_mint
        8 +  // bond_amount
        8 +  // liveness
        32 + // identifier
        4 + MAX_RULES_LEN + // rules
        8 +  // total_proposals
        8 +  // executed_proposals
        1 +  // bump
        32;  // _reserved

    /// Upper bound for the challenge window: 5200 weeks
    pub const MAX_LIVENESS: i64 = 5200 * 7 * 24 * 60 * 60;

    /// Default challenge window: 2 hours
    pub const DEFAULT_LIVENESS: i64 = 2 * 60 * 60;

    /// Signer seeds for CPIs where the governor acts as module / bond authority.
    pub fn signer_seeds(&self) -> [&[u8]; 3] {
        [b"governor", self.avatar.as_ref(), std::slice::from_ref(&self.bump)]
    }
}

// ============================================================================
// Proposals
// ============================================================================

/// Proposal lifecycle status
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Default, InitSpace)]
#[repr(u8)]
pub enum ProposalStatus {
    /// Claim submitted to the oracle, waiting for settlement
    #[default]
    Proposed = 0,
    /// Oracle settled the claim as true
    Resolved = 1,
    /// Batch executed through the avatar (terminal)
    Executed = 2,
    /// Oracle settled the claim as false (terminal)
    Rejected = 3,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Executed | ProposalStatus::Rejected)
    }
}

/// Per-hash mutual exclusion record.
/// PDA seeds: ["proposal_lock", governor, proposal_hash]
///
/// At most one non-terminal proposal may exist per hash. Each submission gets
/// the next `round`, so terminal proposals stay on-chain untouched.
#[account]
#[derive(Default, InitSpace)]
pub struct ProposalHashLock {
    pub governor: Pubkey,
    pub proposal_hash: [u8; 32],
    /// True while a proposal with this hash is Proposed or Resolved
    pub live: bool,
    /// Proposal account currently holding the lock (default when free)
    pub live_proposal: Pubkey,
    /// Number of proposals ever submitted with this hash
    pub rounds: u64,
    /// Bump seed
    pub bump: u8,
}

impl ProposalHashLock {
    pub const SIZE: usize = 8 +  // discriminator
        32 + // governor
        32 + // proposal_hash
        1 +  // live
        32 + // live_proposal
        8 +  // rounds
        1;   // bump

    /// Take the lock for `proposal`, returning the round it was submitted in.
    pub fn acquire(&mut self, proposal: Pubkey) -> Result<u64> {
        require!(!self.live, GovernorError::DuplicateProposal);
        let round = self.rounds;
        self.rounds = self
            .rounds
            .checked_add(1)
            .ok_or(GovernorError::ArithmeticOverflow)?;
        self.live = true;
        self.live_proposal = proposal;
        Ok(round)
    }

    pub fn release(&mut self) {
        self.live = false;
        self.live_proposal = Pubkey::default();
    }
}

/// Governance proposal account
/// PDA seeds: ["proposal", governor, proposal_hash, round]
#[account]
#[derive(Default, InitSpace)]
pub struct Proposal {
    /// Governor this proposal belongs to
    pub governor: Pubkey,
    /// Digest of (transactions, explanation); the logical primary key
    pub proposal_hash: [u8; 32],
    /// sha256 of the borsh-encoded transaction batch
    pub transactions_hash: [u8; 32],
    /// sha256 of the explanation bytes
    pub explanation_hash: [u8; 32],
    /// Submission round for this hash (see ProposalHashLock)
    pub round: u64,
    /// Account that submitted the proposal and posted the bond
    pub proposer: Pubkey,
    /// Submission timestamp
    pub proposal_time: i64,
    /// `proposal_time + liveness`
    pub challenge_window_ends: i64,
    /// Oracle assertion id, set once at submission
    pub assertion_id: [u8; 32],
    /// Oracle-owned account holding the assertion
    pub assertion: Pubkey,
    /// Bond posted at submission
    pub bond_amount: u64,
    /// Number of transactions in the batch
    pub transaction_count: u16,
    /// Current status
    pub status: ProposalStatus,
    /// Whether a vote resolution is attached
    pub has_vote_resolution: bool,
    pub for_votes: u64,
    pub against_votes: u64,
    pub abstain_votes: u64,
    pub vote_merkle_root: [u8; 32],
    /// Number of voters that attested their vote record
    pub attestations: u32,
    /// Settlement timestamp (0 if not settled)
    pub settled_at: i64,
    /// Execution timestamp (0 if not executed)
    pub executed_at: i64,
    /// Bump seed
    pub bump: u8,
    /// Reserved for future use
    pub _reserved: [u8; 32],
}

impl Proposal {
    pub const SIZE: usize = 8 +  // discriminator
        32 + // governor
        32 + // proposal_hash
        32 + // transactions_hash
        32 + // explanation_hash
        8 +  // round
        32 + // proposer
        8 +  // proposal_time
        8 +  // challenge_window_ends
        32 + // assertion_id
        32 + // assertion
        8 +  // bond_amount
        2 +  // transaction_count
        1 +  // status
        1 +  // has_vote_resolution
        8 +  // for_votes
        8 +  // against_votes
        8 +  // abstain_votes
        32 + // vote_merkle_root
        4 +  // attestations
        8 +  // settled_at
        8 +  // executed_at
        1 +  // bump
        32;  // _reserved

    pub fn attach_vote_resolution(&mut self, resolution: &VoteResolution) {
        self.has_vote_resolution = true;
        self.for_votes = resolution.for_votes;
        self.against_votes = resolution.against_votes;
        self.abstain_votes = resolution.abstain_votes;
        self.vote_merkle_root = resolution.vote_merkle_root;
    }

    /// Apply the oracle's settlement. Only a Proposed proposal can settle.
    pub fn record_settlement(&mut self, result: bool, now: i64) -> Result<ProposalStatus> {
        require!(
            self.status == ProposalStatus::Proposed,
            GovernorError::ProposalNotPending
        );
        self.status = if result {
            ProposalStatus::Resolved
        } else {
            ProposalStatus::Rejected
        };
        self.settled_at = now;
        Ok(self.status)
    }

    /// Execution is permitted iff the proposal is Resolved and the challenge
    /// window has elapsed.
    pub fn check_executable(&self, now: i64) -> Result<()> {
        match self.status {
            ProposalStatus::Resolved => {}
            ProposalStatus::Proposed => return Err(GovernorError::ProposalNotResolved.into()),
            ProposalStatus::Executed => {
                return Err(GovernorError::ProposalAlreadyExecuted.into())
            }
            ProposalStatus::Rejected => return Err(GovernorError::ProposalWasRejected.into()),
        }
        require!(
            now >= self.challenge_window_ends,
            GovernorError::ChallengeWindowOpen
        );
        Ok(())
    }

    pub fn mark_executed(&mut self, now: i64) -> Result<()> {
        self.check_executable(now)?;
        self.status = ProposalStatus::Executed;
        self.executed_at = now;
        Ok(())
    }
}

/// Record that a voter proved their entry in a proposal's vote tree.
/// PDA seeds: ["attestation", proposal, voter]
#[account]
#[derive(Default, InitSpace)]
pub struct VoteAttestation {
    pub proposal: Pubkey,
    pub voter: Pubkey,
    pub for_amount: u64,
    pub against_amount: u64,
    pub abstain_amount: u64,
    /// Attestation timestamp (0 until attested)
    pub attested_at: i64,
    /// Bump seed
    pub bump: u8,
}

impl VoteAttestation {
    pub const SIZE: usize = 8 +  // discriminator
        32 + // proposal
        32 + // voter
        8 +  // for_amount
        8 +  // against_amount
        8 +  // abstain_amount
        8 +  // attested_at
        1;   // bump

    pub fn is_attested(&self) -> bool {
        self.attested_at != 0
    }
}

// ============================================================================
// PDA helpers
// ============================================================================

pub fn find_governor_address(avatar: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"governor", avatar.as_ref()], &crate::ID)
}

pub fn find_proposal_lock_address(governor: &Pubkey, proposal_hash: &[u8; 32]) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"proposal_lock", governor.as_ref(), proposal_hash.as_ref()],
        &crate::ID,
    )
}

pub fn find_proposal_address(
    governor: &Pubkey,
    proposal_hash: &[u8; 32],
    round: u64,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            b"proposal",
            governor.as_ref(),
            proposal_hash.as_ref(),
            round.to_le_bytes().as_ref(),
        ],
        &crate::ID,
    )
}

pub fn find_attestation_address(proposal: &Pubkey, voter: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"attestation", proposal.as_ref(), voter.as_ref()],
        &crate::ID,
    )
}

pub fn find_bond_vault_address(governor: &Pubkey, collateral_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"bond_vault", governor.as_ref(), collateral_mint.as_ref()],
        &crate::ID,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: SIZE should equal INIT_SPACE (borsh serialized) + 8-byte discriminator.
    macro_rules! test_size_constant {
        ($struct:ty) => {
            assert_eq!(
                <$struct>::SIZE,
                <$struct as anchor_lang::Space>::INIT_SPACE + 8,
                concat!(stringify!($struct), "::SIZE mismatch with INIT_SPACE")
            );
        };
    }

    fn resolved_proposal(challenge_window_ends: i64) -> Proposal {
        Proposal {
            status: ProposalStatus::Resolved,
            challenge_window_ends,
            ..Proposal::default()
        }
    }

    #[test]
    fn test_governor_config_size() {
        test_size_constant!(GovernorConfig);
    }

    #[test]
    fn test_proposal_hash_lock_size() {
        test_size_constant!(ProposalHashLock);
    }

    #[test]
    fn test_proposal_size() {
        test_size_constant!(Proposal);
    }

    #[test]
    fn test_vote_attestation_size() {
        test_size_constant!(VoteAttestation);
    }

    #[test]
    fn test_lock_rejects_second_live_proposal() {
        let mut lock = ProposalHashLock::default();
        let first = Pubkey::new_from_array([1u8; 32]);

        assert_eq!(lock.acquire(first).unwrap(), 0);
        assert_eq!(lock.live_proposal, first);
        assert_eq!(
            lock.acquire(Pubkey::new_from_array([2u8; 32])).unwrap_err(),
            GovernorError::DuplicateProposal.into()
        );
        assert_eq!(lock.rounds, 1);
    }

    #[test]
    fn test_lock_reacquire_after_release_uses_next_round() {
        let mut lock = ProposalHashLock::default();
        lock.acquire(Pubkey::new_from_array([1u8; 32])).unwrap();
        lock.release();

        assert!(!lock.live);
        assert_eq!(lock.live_proposal, Pubkey::default());
        assert_eq!(lock.acquire(Pubkey::new_from_array([3u8; 32])).unwrap(), 1);
        assert_eq!(lock.rounds, 2);
    }

    #[test]
    fn test_settlement_true_resolves() {
        let mut proposal = Proposal::default();
        assert_eq!(
            proposal.record_settlement(true, 100).unwrap(),
            ProposalStatus::Resolved
        );
        assert_eq!(proposal.settled_at, 100);
    }

    #[test]
    fn test_settlement_false_rejects() {
        let mut proposal = Proposal::default();
        assert_eq!(
            proposal.record_settlement(false, 100).unwrap(),
            ProposalStatus::Rejected
        );
        assert!(proposal.status.is_terminal());
    }

    #[test]
    fn test_settlement_only_once() {
        let mut proposal = Proposal::default();
        proposal.record_settlement(true, 100).unwrap();
        assert_eq!(
            proposal.record_settlement(false, 200).unwrap_err(),
            GovernorError::ProposalNotPending.into()
        );
        assert_eq!(proposal.status, ProposalStatus::Resolved);
    }

    #[test]
    fn test_execute_blocked_inside_challenge_window() {
        let proposal = resolved_proposal(1_000);
        assert_eq!(
            proposal.check_executable(999).unwrap_err(),
            GovernorError::ChallengeWindowOpen.into()
        );
        assert!(proposal.check_executable(1_000).is_ok());
    }

    #[test]
    fn test_execute_requires_resolution() {
        let mut proposal = resolved_proposal(0);
        proposal.status = ProposalStatus::Proposed;
        assert_eq!(
            proposal.check_executable(10).unwrap_err(),
            GovernorError::ProposalNotResolved.into()
        );
        proposal.status = ProposalStatus::Rejected;
        assert_eq!(
            proposal.check_executable(10).unwrap_err(),
            GovernorError::ProposalWasRejected.into()
        );
    }

    #[test]
    fn test_execute_succeeds_exactly_once() {
        let mut proposal = resolved_proposal(50);
        proposal.mark_executed(60).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Executed);
        assert_eq!(proposal.executed_at, 60);
        assert_eq!(
            proposal.mark_executed(70).unwrap_err(),
            GovernorError::ProposalAlreadyExecuted.into()
        );
    }

    #[test]
    fn test_attach_vote_resolution_copies_tallies() {
        let mut proposal = Proposal::default();
        let resolution = VoteResolution {
            for_votes: 7,
            against_votes: 2,
            abstain_votes: 1,
            vote_merkle_root: [9u8; 32],
            data: "ignored".to_string(),
        };
        proposal.attach_vote_resolution(&resolution);
        assert!(proposal.has_vote_resolution);
        assert_eq!(proposal.for_votes, 7);
        assert_eq!(proposal.against_votes, 2);
        assert_eq!(proposal.abstain_votes, 1);
        assert_eq!(proposal.vote_merkle_root, [9u8; 32]);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ProposalStatus::Proposed.is_terminal());
        assert!(!ProposalStatus::Resolved.is_terminal());
        assert!(ProposalStatus::Executed.is_terminal());
        assert!(ProposalStatus::Rejected.is_terminal());
    }
}
