//! Pure helpers shared by the instruction handlers and off-chain clients

pub mod merkle;
pub mod proposal_hash;
pub mod validation;
