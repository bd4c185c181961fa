//! Monitoring parameters
//!
//! Built directly or loaded from `MONITOR_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{MonitorError, Result};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
/// `getSignaturesForAddress` rejects larger limits
pub const MAX_PAGE_SIZE: usize = 1000;

/// Inclusive slot range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRange {
    pub start: u64,
    pub end: u64,
}

impl SlotRange {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(MonitorError::invalid_parameter(format!(
                "slot range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, slot: u64) -> bool {
        (self.start..=self.end).contains(&slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorParams {
    pub rpc_url: String,
    #[serde(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub oracle_program: Pubkey,
    pub slot_range: SlotRange,
    /// Signatures fetched per `getSignaturesForAddress` call
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Delay between scans when polling
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn serialize_pubkey<S: Serializer>(key: &Pubkey, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&key.to_string())
}

fn deserialize_pubkey<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Pubkey, D::Error> {
    let text = String::deserialize(deserializer)?;
    Pubkey::from_str(&text).map_err(serde::de::Error::custom)
}

impl MonitorParams {
    pub fn new(rpc_url: impl Into<String>, oracle_program: Pubkey, slot_range: SlotRange) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            oracle_program,
            slot_range,
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Load from the process environment:
    /// `MONITOR_RPC_URL`, `MONITOR_ORACLE_PROGRAM` (required),
    /// `MONITOR_START_SLOT`, `MONITOR_END_SLOT` (required),
    /// `MONITOR_PAGE_SIZE`, `MONITOR_POLL_INTERVAL_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| MonitorError::invalid_parameter(format!("{} is not set", name)))
        };
        let rpc_url = lookup("MONITOR_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let oracle_program = Pubkey::from_str(&required("MONITOR_ORACLE_PROGRAM")?)
            .map_err(|e| MonitorError::invalid_parameter(format!("MONITOR_ORACLE_PROGRAM: {}", e)))?;
        let start = parse_number("MONITOR_START_SLOT", &required("MONITOR_START_SLOT")?)?;
        let end = parse_number("MONITOR_END_SLOT", &required("MONITOR_END_SLOT")?)?;
        let page_size = match lookup("MONITOR_PAGE_SIZE") {
            Some(value) => parse_number("MONITOR_PAGE_SIZE", &value)?,
            None => DEFAULT_PAGE_SIZE,
        };
        let poll_interval_ms = match lookup("MONITOR_POLL_INTERVAL_MS") {
            Some(value) => parse_number("MONITOR_POLL_INTERVAL_MS", &value)?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };

        let params = Self {
            rpc_url,
            oracle_program,
            slot_range: SlotRange::new(start, end)?,
            page_size,
            poll_interval_ms,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(MonitorError::invalid_parameter(format!(
                "page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if self.slot_range.start > self.slot_range.end {
            return Err(MonitorError::invalid_parameter("slot range start is after end"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| MonitorError::invalid_parameter(format!("{}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_lookup_with_defaults() {
        let oracle = Pubkey::new_from_array([5; 32]);
        let oracle_text = oracle.to_string();
        let env = vars(&[
            ("MONITOR_ORACLE_PROGRAM", oracle_text.as_str()),
            ("MONITOR_START_SLOT", "100"),
            ("MONITOR_END_SLOT", "200"),
        ]);
        let params = MonitorParams::from_lookup(|name| env.get(name).cloned()).unwrap();
        assert_eq!(params.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(params.oracle_program, oracle);
        assert_eq!(params.slot_range, SlotRange { start: 100, end: 200 });
        assert_eq!(params.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(params.poll_interval(), Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
    }

    #[test]
    fn test_missing_oracle_rejected() {
        let env = vars(&[("MONITOR_START_SLOT", "1"), ("MONITOR_END_SLOT", "2")]);
        let err = MonitorParams::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidParameter(msg) if msg.contains("MONITOR_ORACLE_PROGRAM")));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let oracle_text = Pubkey::new_from_array([5; 32]).to_string();
        let env = vars(&[
            ("MONITOR_ORACLE_PROGRAM", oracle_text.as_str()),
            ("MONITOR_START_SLOT", "300"),
            ("MONITOR_END_SLOT", "200"),
        ]);
        assert!(MonitorParams::from_lookup(|name| env.get(name).cloned()).is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        let mut params = MonitorParams::new(
            DEFAULT_RPC_URL,
            Pubkey::new_from_array([5; 32]),
            SlotRange::new(0, 10).unwrap(),
        );
        assert!(params.validate().is_ok());
        params.page_size = 0;
        assert!(params.validate().is_err());
        params.page_size = MAX_PAGE_SIZE + 1;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_serde_roundtrip_uses_base58_program_id() {
        let params = MonitorParams::new(
            "https://api.devnet.solana.com",
            Pubkey::new_from_array([5; 32]),
            SlotRange::new(1, 2).unwrap(),
        );
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["oracle_program"], Pubkey::new_from_array([5; 32]).to_string());
        let back: MonitorParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }
}
