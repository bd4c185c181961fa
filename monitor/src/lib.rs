//! Optimistic Governor assertion monitor
//!
//! Off-chain, read-only observer of the assertion oracle. For a slot range it
//! collects every `AssertionMade` event the oracle program emitted, looks up
//! each assertion's current state and forwards the result to a sink.
//!
//! ```rust,no_run
//! use optimistic_governor_monitor::{monitor_assertions, MonitorParams, RpcEventLog, TracingSink};
//!
//! # async fn run() -> optimistic_governor_monitor::Result<()> {
//! let params = MonitorParams::from_env()?;
//! let log = RpcEventLog::new(&params);
//! let forwarded = monitor_assertions(&log, &TracingSink, &params).await?;
//! # let _ = forwarded;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod log;
pub mod monitor;
pub mod rpc;
pub mod sink;

pub use config::{MonitorParams, SlotRange};
pub use error::{MonitorError, Result};
pub use events::{decode_event, AssertionMade};
pub use log::{EventLog, LoggedEvent, MemoryEventLog};
pub use monitor::{monitor_assertions, poll_assertions};
pub use rpc::RpcEventLog;
pub use sink::{AssertionRecord, AssertionSink, TracingSink};
