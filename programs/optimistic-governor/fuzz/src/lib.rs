//! Property-based fuzz testing library for the Optimistic Governor
//!
//! This crate provides fuzzing infrastructure to test the governor's
//! proposal, execution and vote attestation invariants against an in-memory
//! ledger that runs the program's own state and hashing code.
//!
//! # Usage
//!
//! ```bash
//! # Run all property-based tests
//! cargo test --release
//!
//! # Run the fuzz test runner
//! cargo run --release
//!
//! # Run with more iterations
//! PROPTEST_CASES=10000 cargo test --release
//! ```

pub mod arbitrary;
pub mod invariants;
pub mod scenarios;

pub use arbitrary::*;
pub use invariants::*;
pub use scenarios::*;

// Include fuzz targets as test modules
#[cfg(test)]
#[path = "../fuzz_targets/propose.rs"]
mod propose_tests;

#[cfg(test)]
#[path = "../fuzz_targets/execution.rs"]
mod execution_tests;

#[cfg(test)]
#[path = "../fuzz_targets/batch_atomicity.rs"]
mod batch_atomicity_tests;

#[cfg(test)]
#[path = "../fuzz_targets/vote_attestation.rs"]
mod vote_attestation_tests;

#[cfg(test)]
#[path = "../fuzz_targets/end_to_end.rs"]
mod end_to_end_tests;
