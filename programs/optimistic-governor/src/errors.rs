//! Error codes for the Optimistic Governor

use anchor_lang::prelude::*;

#[error_code]
pub enum GovernorError {
    // Validation errors (6000-6099): rejected before any external call
    #[msg("Proposal must contain at least one transaction")]
    EmptyProposal,

    #[msg("Proposal contains too many transactions")]
    TooManyTransactions,

    #[msg("Transaction instruction data exceeds maximum length")]
    TransactionDataTooLong,

    #[msg("Transaction references too many accounts")]
    TooManyTransactionAccounts,

    #[msg("Transaction target cannot be the default pubkey")]
    InvalidTransactionTarget,

    #[msg("Explanation exceeds maximum length")]
    ExplanationTooLong,

    #[msg("Supplied proposal hash does not match the transactions and explanation")]
    ProposalHashMismatch,

    #[msg("A live proposal with the same hash already exists")]
    DuplicateProposal,

    #[msg("Vote resolution data exceeds maximum length")]
    VoteDataTooLong,

    #[msg("Vote resolution must carry a non-zero Merkle root")]
    InvalidVoteResolution,

    // Precondition errors (6100-6199): rejected, no state change
    #[msg("Proposal is not awaiting settlement")]
    ProposalNotPending,

    #[msg("Proposal has not been resolved by the oracle")]
    ProposalNotResolved,

    #[msg("Proposal has already been executed")]
    ProposalAlreadyExecuted,

    #[msg("Proposal was rejected by the oracle")]
    ProposalWasRejected,

    #[msg("Challenge window has not elapsed")]
    ChallengeWindowOpen,

    #[msg("Transactions do not match the proposal")]
    TransactionsMismatch,

    #[msg("Oracle has not settled the assertion")]
    AssertionNotSettled,

    #[msg("Assertion is unknown to the oracle")]
    UnknownAssertion,

    #[msg("Proposal has no vote resolution")]
    NoVoteResolution,

    #[msg("Vote proof does not verify against the proposal's vote root")]
    InvalidVoteProof,

    #[msg("Voter has already attested for this proposal")]
    AlreadyAttested,

    #[msg("Account required by a proposed transaction was not supplied")]
    MissingTransactionAccount,

    // External dependency errors (6200-6299): surfaced from collaborators
    #[msg("Proposer has not approved the governor to transfer the bond")]
    BondNotApproved,

    #[msg("Bond transfer failed")]
    BondTransferFailed,

    #[msg("Oracle rejected the assertion")]
    OracleAssertionFailed,

    #[msg("Oracle did not return an assertion id")]
    MissingAssertionId,

    #[msg("Avatar failed to execute a proposed transaction")]
    TransactionExecutionFailed,

    // Configuration errors (6300-6399)
    #[msg("Only the governor owner can perform this action")]
    UnauthorizedOwner,

    #[msg("Liveness must be positive and below the maximum")]
    InvalidLiveness,

    #[msg("Rules must be non-empty and within the maximum length")]
    InvalidRules,

    #[msg("Identifier cannot be zero")]
    InvalidIdentifier,

    #[msg("Bond amount must be positive")]
    InvalidBondAmount,

    #[msg("Collateral mint does not match the governor")]
    InvalidCollateral,

    #[msg("Avatar account does not match the governor")]
    InvalidAvatar,

    #[msg("Oracle program or assertion account does not match the governor")]
    InvalidOracle,

    // General errors (6400-6499)
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,
}
