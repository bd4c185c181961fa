//! Shared constants for instruction handlers

// ============================================================================
// Proposal Limits
// ============================================================================

/// Maximum transactions in one proposed batch
pub const MAX_TRANSACTIONS: usize = 16;

/// Maximum instruction data carried by a single transaction
pub const MAX_TRANSACTION_DATA_LEN: usize = 512;

/// Maximum accounts a single transaction may reference
pub const MAX_TRANSACTION_ACCOUNTS: usize = 16;

/// Maximum explanation length in bytes
pub const MAX_EXPLANATION_LEN: usize = 256;

/// Maximum opaque vote-resolution data length in bytes
pub const MAX_VOTE_DATA_LEN: usize = 512;

// ============================================================================
// Oracle
// ============================================================================

/// Domain id passed to the oracle; the governor does not use domains
pub const NO_DOMAIN: [u8; 32] = [0u8; 32];
