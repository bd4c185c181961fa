//! Fuzz testing scenarios that simulate instruction execution
//!
//! The ledger below runs the governor's instruction logic against in-memory
//! stand-ins for the token program, the oracle and the avatar. State
//! transitions, hashing, validation, Merkle proofs and assertion decoding are
//! the program's own code. Each instruction runs against a snapshot that is
//! restored if it fails, as the Solana runtime does for a failed transaction.

use std::collections::{HashMap, HashSet};

use anchor_lang::prelude::*;
use solana_sha256_hasher::hashv;
use optimistic_governor::avatar::ExecTransactionArgs;
use optimistic_governor::errors::GovernorError;
use optimistic_governor::oracle::{
    AssertionResult, OracleAssertion, ASSERTION_ACCOUNT_DISCRIMINATOR,
};
use optimistic_governor::state::{
    find_proposal_address, GovernanceTransaction, Proposal, ProposalHashLock, ProposalStatus,
    VoteAttestation, VoteResolution,
};
use optimistic_governor::utils::merkle;
use optimistic_governor::utils::proposal_hash::{
    compute_proposal_hash, construct_claim, hash_explanation, hash_transactions,
};
use optimistic_governor::utils::validation::{
    validate_explanation, validate_transactions, validate_vote_resolution,
};

use crate::invariants::*;

/// Governor address used by every simulation
pub const GOVERNOR: Pubkey = Pubkey::new_from_array([0x60; 32]);

/// Simulated governor parameters
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub bond_amount: u64,
    pub liveness: i64,
    pub identifier: [u8; 32],
    pub rules: String,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            bond_amount: 1_000_000,
            liveness: 2 * 60 * 60,
            identifier: *b"ASSERT_TRUTH\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0",
            rules: "Proposals must be approved by a snapshot vote".to_string(),
        }
    }
}

/// Collateral balances: holders, delegations to the governor, the bond vault
/// and the oracle's escrow
#[derive(Debug, Clone, Default)]
pub struct SimulatedToken {
    pub balances: HashMap<Pubkey, u64>,
    pub delegations: HashMap<Pubkey, u64>,
    pub bond_vault: u64,
    pub oracle_escrow: u64,
}

impl SimulatedToken {
    pub fn mint(&mut self, owner: Pubkey, amount: u64) {
        *self.balances.entry(owner).or_default() += amount;
    }

    /// SPL `approve` of the governor PDA as delegate
    pub fn approve(&mut self, owner: Pubkey, amount: u64) {
        self.delegations.insert(owner, amount);
    }

    /// Delegate transfer from `owner` into the bond vault
    pub fn pull_bond(&mut self, owner: Pubkey, amount: u64) -> Result<()> {
        let delegated = self.delegations.get(&owner).copied().unwrap_or(0);
        require!(delegated >= amount, GovernorError::BondNotApproved);
        let balance = self.balances.entry(owner).or_default();
        require!(*balance >= amount, GovernorError::BondTransferFailed);
        *balance -= amount;
        self.delegations.insert(owner, delegated - amount);
        self.bond_vault += amount;
        Ok(())
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|b| *b as u128).sum::<u128>()
            + self.bond_vault as u128
            + self.oracle_escrow as u128
    }
}

/// In-memory assertion oracle. Assertion accounts are stored as raw account
/// data and decoded with the program's reader.
#[derive(Debug, Clone, Default)]
pub struct SimulatedOracle {
    pub accounts: HashMap<[u8; 32], Vec<u8>>,
    pub claims: HashMap<[u8; 32], Vec<u8>>,
    pub nonce: u64,
    /// Fail the next `assert_truth`
    pub reject_next: bool,
}

impl SimulatedOracle {
    fn store(&mut self, assertion: &OracleAssertion) {
        let mut data = ASSERTION_ACCOUNT_DISCRIMINATOR.to_vec();
        // Serializing into a Vec cannot fail
        let _ = assertion.serialize(&mut data);
        self.accounts.insert(assertion.assertion_id, data);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn assert_truth(
        &mut self,
        claim: Vec<u8>,
        asserter: Pubkey,
        bond: u64,
        liveness: i64,
        identifier: [u8; 32],
        now: i64,
        tokens: &mut SimulatedToken,
    ) -> Result<[u8; 32]> {
        if std::mem::take(&mut self.reject_next) {
            return Err(governor_error(GovernorError::OracleAssertionFailed));
        }
        require!(tokens.bond_vault >= bond, GovernorError::OracleAssertionFailed);
        tokens.bond_vault -= bond;
        tokens.oracle_escrow += bond;

        self.nonce += 1;
        let assertion_id = hashv(&[&claim, &self.nonce.to_le_bytes(), &now.to_le_bytes()]).to_bytes();
        self.store(&OracleAssertion {
            assertion_id,
            asserter,
            bond,
            identifier,
            assertion_time: now,
            expiration_time: now + liveness,
            ..OracleAssertion::default()
        });
        self.claims.insert(assertion_id, claim);
        Ok(assertion_id)
    }

    pub fn get_result(&self, assertion_id: &[u8; 32]) -> Result<AssertionResult> {
        let data = self
            .accounts
            .get(assertion_id)
            .ok_or(GovernorError::UnknownAssertion)?;
        let assertion = OracleAssertion::try_from_account_data(data, assertion_id)?;
        Ok(AssertionResult::from(&assertion))
    }

    /// Settle an assertion; the bond goes back to the asserter when the claim
    /// holds and stays in escrow for the disputer otherwise.
    pub fn settle(&mut self, assertion_id: &[u8; 32], result: bool, tokens: &mut SimulatedToken) {
        let Some(data) = self.accounts.get(assertion_id) else {
            return;
        };
        let Ok(mut assertion) = OracleAssertion::try_from_account_data(data, assertion_id) else {
            return;
        };
        if assertion.settled {
            return;
        }
        assertion.settled = true;
        assertion.settlement_resolution = result;
        if result {
            tokens.oracle_escrow -= assertion.bond;
            tokens.mint(assertion.asserter, assertion.bond);
        }
        self.store(&assertion);
    }
}

/// In-memory avatar. Runs module calls and records them in order.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAvatar {
    pub lamports: u64,
    pub executed: Vec<ExecTransactionArgs>,
    /// Lamports forwarded to each target
    pub received: HashMap<Pubkey, u64>,
    /// Targets whose call reports failure
    pub failing_targets: HashSet<Pubkey>,
}

impl SimulatedAvatar {
    /// Returns the avatar's success flag
    pub fn exec_transaction_from_module(&mut self, args: ExecTransactionArgs) -> bool {
        if self.failing_targets.contains(&args.to) || args.value > self.lamports {
            return false;
        }
        self.lamports -= args.value;
        *self.received.entry(args.to).or_default() += args.value;
        self.executed.push(args);
        true
    }
}

/// Event records, in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    TransactionsProposed {
        proposal: Pubkey,
        proposal_hash: [u8; 32],
        assertion_id: [u8; 32],
        round: u64,
        transaction_count: usize,
    },
    VoteResolved {
        proposal: Pubkey,
        vote_merkle_root: [u8; 32],
    },
    ProposalResolved {
        proposal: Pubkey,
        approved: bool,
    },
    VoteAttested {
        proposal: Pubkey,
        voter: Pubkey,
    },
    TransactionExecuted {
        proposal_hash: [u8; 32],
        assertion_id: [u8; 32],
        transaction_index: u16,
    },
    ProposalExecuted {
        proposal_hash: [u8; 32],
        assertion_id: [u8; 32],
    },
}

/// Anchor error for a governor error code, for comparisons in tests
pub fn governor_error(code: GovernorError) -> anchor_lang::error::Error {
    code.into()
}

fn not_initialized() -> anchor_lang::error::Error {
    error!(anchor_lang::error::ErrorCode::AccountNotInitialized)
}

/// Whole-governor simulation
#[derive(Clone, Default)]
pub struct SimulatedLedger {
    pub config: SimulatedConfig,
    pub tokens: SimulatedToken,
    pub oracle: SimulatedOracle,
    pub avatar: SimulatedAvatar,
    pub locks: HashMap<[u8; 32], ProposalHashLock>,
    pub proposals: HashMap<Pubkey, Proposal>,
    pub attestations: HashMap<(Pubkey, Pubkey), VoteAttestation>,
    pub events: Vec<SimEvent>,
    pub total_proposals: u64,
    pub now: i64,
}

impl SimulatedLedger {
    pub fn new(config: SimulatedConfig, now: i64) -> Self {
        Self {
            config,
            now,
            avatar: SimulatedAvatar {
                lamports: u64::MAX / 2,
                ..SimulatedAvatar::default()
            },
            ..Self::default()
        }
    }

    /// Fund `proposer` and approve the governor for one bond
    pub fn fund_proposer(&mut self, proposer: Pubkey) {
        let bond = self.config.bond_amount;
        self.tokens.mint(proposer, bond);
        self.tokens.approve(proposer, bond);
    }

    pub fn advance(&mut self, seconds: i64) {
        self.now = self.now.saturating_add(seconds);
    }

    pub fn proposal(&self, key: &Pubkey) -> Option<&Proposal> {
        self.proposals.get(key)
    }

    /// Run `f` atomically: on error every account is restored.
    fn atomic<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }

    fn proposal_mut(&mut self, key: &Pubkey) -> Result<&mut Proposal> {
        self.proposals.get_mut(key).ok_or_else(not_initialized)
    }

    // ========================================================================
    // propose_transactions
    // ========================================================================

    pub fn propose(
        &mut self,
        proposer: Pubkey,
        transactions: Vec<GovernanceTransaction>,
        explanation: Vec<u8>,
        vote_resolution: Option<VoteResolution>,
    ) -> Result<Pubkey> {
        self.atomic(|ledger| {
            validate_transactions(&transactions)?;
            validate_explanation(&explanation)?;
            if let Some(resolution) = vote_resolution.as_ref() {
                validate_vote_resolution(resolution)?;
            }
            let proposal_hash = compute_proposal_hash(&transactions, &explanation)?;

            let lock = ledger
                .locks
                .entry(proposal_hash)
                .or_insert_with(|| ProposalHashLock {
                    governor: GOVERNOR,
                    proposal_hash,
                    ..ProposalHashLock::default()
                });
            let key = find_proposal_address(&GOVERNOR, &proposal_hash, lock.rounds).0;
            let round = lock.acquire(key)?;

            let bond = ledger.config.bond_amount;
            ledger.tokens.pull_bond(proposer, bond)?;

            let claim = construct_claim(&proposal_hash, &explanation, &ledger.config.rules);
            let assertion_id = ledger.oracle.assert_truth(
                claim,
                proposer,
                bond,
                ledger.config.liveness,
                ledger.config.identifier,
                ledger.now,
                &mut ledger.tokens,
            )?;

            let mut proposal = Proposal {
                governor: GOVERNOR,
                proposal_hash,
                transactions_hash: hash_transactions(&transactions)?,
                explanation_hash: hash_explanation(&explanation),
                round,
                proposer,
                proposal_time: ledger.now,
                challenge_window_ends: ledger
                    .now
                    .checked_add(ledger.config.liveness)
                    .ok_or(GovernorError::ArithmeticOverflow)?,
                assertion_id,
                bond_amount: bond,
                transaction_count: transactions.len() as u16,
                status: ProposalStatus::Proposed,
                ..Proposal::default()
            };
            if let Some(resolution) = vote_resolution.as_ref() {
                proposal.attach_vote_resolution(resolution);
            }
            ledger.proposals.insert(key, proposal);
            ledger.total_proposals += 1;

            ledger.events.push(SimEvent::TransactionsProposed {
                proposal: key,
                proposal_hash,
                assertion_id,
                round,
                transaction_count: transactions.len(),
            });
            if let Some(resolution) = vote_resolution {
                ledger.events.push(SimEvent::VoteResolved {
                    proposal: key,
                    vote_merkle_root: resolution.vote_merkle_root,
                });
            }
            Ok(key)
        })
    }

    // ========================================================================
    // Oracle side
    // ========================================================================

    /// Oracle settles the proposal's assertion (undisputed = true,
    /// disputed and lost = false)
    pub fn oracle_settles(&mut self, proposal: &Pubkey, result: bool) {
        if let Some(assertion_id) = self.proposals.get(proposal).map(|p| p.assertion_id) {
            self.oracle.settle(&assertion_id, result, &mut self.tokens);
        }
    }

    // ========================================================================
    // settle_proposal
    // ========================================================================

    pub fn settle(&mut self, key: Pubkey) -> Result<ProposalStatus> {
        self.atomic(|ledger| {
            let now = ledger.now;
            let assertion_id = {
                let proposal = ledger.proposal_mut(&key)?;
                require!(
                    proposal.status == ProposalStatus::Proposed,
                    GovernorError::ProposalNotPending
                );
                proposal.assertion_id
            };
            let result = ledger.oracle.get_result(&assertion_id)?;
            require!(result.settled, GovernorError::AssertionNotSettled);

            let proposal = ledger.proposal_mut(&key)?;
            let status = proposal.record_settlement(result.result, now)?;
            let proposal_hash = proposal.proposal_hash;

            if status == ProposalStatus::Rejected {
                if let Some(lock) = ledger.locks.get_mut(&proposal_hash) {
                    if lock.live_proposal == key {
                        lock.release();
                    }
                }
            }
            ledger.events.push(SimEvent::ProposalResolved {
                proposal: key,
                approved: result.result,
            });
            Ok(status)
        })
    }

    // ========================================================================
    // attest_vote
    // ========================================================================

    pub fn attest(
        &mut self,
        key: Pubkey,
        voter: Pubkey,
        record: (u64, u64, u64),
        proof: &[[u8; 32]],
    ) -> Result<()> {
        self.atomic(|ledger| {
            let now = ledger.now;
            let proposal = ledger.proposals.get_mut(&key).ok_or_else(not_initialized)?;
            require!(proposal.has_vote_resolution, GovernorError::NoVoteResolution);

            let leaf = merkle::vote_leaf(&voter, record.0, record.1, record.2);
            require!(
                merkle::verify(&proposal.vote_merkle_root, leaf, proof),
                GovernorError::InvalidVoteProof
            );

            let attestation = ledger.attestations.entry((key, voter)).or_default();
            require!(!attestation.is_attested(), GovernorError::AlreadyAttested);
            *attestation = VoteAttestation {
                proposal: key,
                voter,
                for_amount: record.0,
                against_amount: record.1,
                abstain_amount: record.2,
                attested_at: now,
                bump: 0,
            };
            proposal.attestations = proposal
                .attestations
                .checked_add(1)
                .ok_or(GovernorError::ArithmeticOverflow)?;

            ledger.events.push(SimEvent::VoteAttested {
                proposal: key,
                voter,
            });
            Ok(())
        })
    }

    // ========================================================================
    // execute_proposal
    // ========================================================================

    pub fn execute(&mut self, key: Pubkey, transactions: &[GovernanceTransaction]) -> Result<()> {
        self.atomic(|ledger| {
            let now = ledger.now;
            let (proposal_hash, assertion_id) = {
                let proposal = ledger.proposal_mut(&key)?;
                proposal.check_executable(now)?;
                require!(
                    hash_transactions(transactions)? == proposal.transactions_hash,
                    GovernorError::TransactionsMismatch
                );
                (proposal.proposal_hash, proposal.assertion_id)
            };

            for (index, tx) in transactions.iter().enumerate() {
                require!(
                    ledger
                        .avatar
                        .exec_transaction_from_module(ExecTransactionArgs::from(tx)),
                    GovernorError::TransactionExecutionFailed
                );
                ledger.events.push(SimEvent::TransactionExecuted {
                    proposal_hash,
                    assertion_id,
                    transaction_index: index as u16,
                });
            }

            ledger.proposal_mut(&key)?.mark_executed(now)?;
            if let Some(lock) = ledger.locks.get_mut(&proposal_hash) {
                if lock.live_proposal == key {
                    lock.release();
                }
            }
            ledger.events.push(SimEvent::ProposalExecuted {
                proposal_hash,
                assertion_id,
            });
            Ok(())
        })
    }

    // ========================================================================
    // Invariants
    // ========================================================================

    /// Check every ledger-wide invariant, returning a description of each
    /// violation.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (key, proposal) in &self.proposals {
            if let ProposalInvariantResult::ChallengeWindowMismatch { expected, actual } =
                check_challenge_window(proposal, self.config.liveness)
            {
                violations.push(format!(
                    "P3: proposal {} window ends {} (expected {})",
                    key, actual, expected
                ));
            }
            let timing = check_execution_timing(proposal);
            if timing != ProposalInvariantResult::Valid {
                violations.push(format!("P4: proposal {}: {:?}", key, timing));
            }
        }

        for (hash, lock) in &self.locks {
            let proposals = self
                .proposals
                .iter()
                .filter(|(_, p)| p.proposal_hash == *hash);
            let result = check_hash_lock(lock, proposals);
            if result != LockInvariantResult::Valid {
                violations.push(format!("L1: {:?}", result));
            }
        }

        violations
    }

    /// Snapshot of status and assertion id per proposal, for P1/P2 checks
    pub fn status_snapshot(&self) -> HashMap<Pubkey, (ProposalStatus, [u8; 32])> {
        self.proposals
            .iter()
            .map(|(key, p)| (*key, (p.status, p.assertion_id)))
            .collect()
    }

    /// P1/P2 between two snapshots of the same ledger
    pub fn transition_violations(
        before: &HashMap<Pubkey, (ProposalStatus, [u8; 32])>,
        after: &HashMap<Pubkey, (ProposalStatus, [u8; 32])>,
    ) -> Vec<String> {
        let mut violations = Vec::new();
        for (key, (status, assertion_id)) in before {
            let Some((new_status, new_id)) = after.get(key) else {
                violations.push(format!("proposal {} disappeared", key));
                continue;
            };
            let transition = check_status_transition(*status, *new_status);
            if transition != ProposalInvariantResult::Valid {
                violations.push(format!("P1: {:?}", transition));
            }
            if check_assertion_id_stable(assertion_id, new_id) != ProposalInvariantResult::Valid {
                violations.push(format!("P2: assertion id of {} changed", key));
            }
        }
        violations
    }
}

/// Build a resolution and per-voter proofs for `records`
pub fn build_vote_resolution(
    records: &[(Pubkey, (u64, u64, u64))],
) -> Option<(VoteResolution, merkle::VoteTree)> {
    let leaves = records
        .iter()
        .map(|(voter, (f, a, x))| merkle::vote_leaf(voter, *f, *a, *x))
        .collect();
    let tree = merkle::VoteTree::from_leaves(leaves)?;
    let sum = |pick: fn(&(u64, u64, u64)) -> u64| -> u64 {
        records.iter().map(|(_, r)| pick(r)).fold(0u64, u64::saturating_add)
    };
    let resolution = VoteResolution {
        for_votes: sum(|r| r.0),
        against_votes: sum(|r| r.1),
        abstain_votes: sum(|r| r.2),
        vote_merkle_root: tree.root(),
        data: String::new(),
    };
    Some((resolution, tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use optimistic_governor::state::Operation;

    fn proposer() -> Pubkey {
        Pubkey::new_from_array([7u8; 32])
    }

    fn batch() -> Vec<GovernanceTransaction> {
        vec![GovernanceTransaction {
            to: Pubkey::new_from_array([9u8; 32]),
            value: 10,
            data: vec![1],
            operation: Operation::Call,
            accounts: vec![],
        }]
    }

    #[test]
    fn test_failed_propose_restores_state() {
        let mut ledger = SimulatedLedger::new(SimulatedConfig::default(), 1_700_000_000);
        ledger.fund_proposer(proposer());
        ledger.oracle.reject_next = true;

        let supply = ledger.tokens.total_supply();
        let err = ledger.propose(proposer(), batch(), b"x".to_vec(), None).unwrap_err();

        assert_eq!(err, governor_error(GovernorError::OracleAssertionFailed));
        assert!(ledger.proposals.is_empty());
        assert!(ledger.locks.is_empty());
        assert_eq!(ledger.tokens.total_supply(), supply);
        assert_eq!(ledger.tokens.balances[&proposer()], ledger.config.bond_amount);
    }

    #[test]
    fn test_unapproved_bond_rejected() {
        let mut ledger = SimulatedLedger::new(SimulatedConfig::default(), 1_700_000_000);
        ledger.tokens.mint(proposer(), ledger.config.bond_amount);

        let err = ledger.propose(proposer(), batch(), vec![], None).unwrap_err();
        assert_eq!(err, governor_error(GovernorError::BondNotApproved));
        assert!(ledger.events.is_empty());
    }

    #[test]
    fn test_settle_before_oracle_settles() {
        let mut ledger = SimulatedLedger::new(SimulatedConfig::default(), 1_700_000_000);
        ledger.fund_proposer(proposer());
        let key = ledger.propose(proposer(), batch(), vec![], None).unwrap();

        assert_eq!(
            ledger.settle(key).unwrap_err(),
            governor_error(GovernorError::AssertionNotSettled)
        );
        assert_eq!(ledger.proposals[&key].status, ProposalStatus::Proposed);
    }
}
