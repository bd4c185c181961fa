//! Instruction handlers for the Optimistic Governor

pub mod constants;

pub mod attest_vote;
pub mod execute_proposal;
pub mod initialize_governor;
pub mod propose_transactions;
pub mod settle_proposal;
pub mod update_governor;

#[allow(ambiguous_glob_reexports)]
pub use attest_vote::*;
#[allow(ambiguous_glob_reexports)]
pub use execute_proposal::*;
#[allow(ambiguous_glob_reexports)]
pub use initialize_governor::*;
#[allow(ambiguous_glob_reexports)]
pub use propose_transactions::*;
#[allow(ambiguous_glob_reexports)]
pub use settle_proposal::*;
pub use update_governor::*;
