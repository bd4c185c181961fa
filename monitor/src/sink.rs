//! Destinations for monitored assertions

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use optimistic_governor::oracle::OracleAssertion;
use tracing::info;

use crate::config::MonitorParams;
use crate::error::Result;

/// One assertion seen in the log, with its current oracle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionRecord {
    /// Signature of the transaction that made the assertion
    pub signature: String,
    pub slot: u64,
    pub assertion_id: [u8; 32],
    pub claim: Vec<u8>,
    pub assertion: OracleAssertion,
}

impl AssertionRecord {
    /// Claim as text; claims are UTF-8 unless the explanation was not.
    pub fn claim_text(&self) -> String {
        String::from_utf8_lossy(&self.claim).into_owned()
    }

    pub fn is_disputed(&self) -> bool {
        self.assertion.disputer != Pubkey::default()
    }
}

#[async_trait]
pub trait AssertionSink: Send + Sync {
    async fn log_assertion(&self, record: &AssertionRecord, params: &MonitorParams) -> Result<()>;
}

/// Writes each record as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl AssertionSink for TracingSink {
    async fn log_assertion(&self, record: &AssertionRecord, params: &MonitorParams) -> Result<()> {
        let assertion = &record.assertion;
        info!(
            target: "assertion_monitor",
            oracle = %params.oracle_program,
            signature = %record.signature,
            slot = record.slot,
            assertion_id = %hex::encode(record.assertion_id),
            claim = %record.claim_text(),
            asserter = %assertion.asserter,
            bond = assertion.bond,
            currency = %assertion.currency,
            expiration_time = assertion.expiration_time,
            disputed = record.is_disputed(),
            settled = assertion.settled,
            settlement_resolution = assertion.settlement_resolution,
            "Assertion made"
        );
        Ok(())
    }
}
