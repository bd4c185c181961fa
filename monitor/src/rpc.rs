//! `EventLog` over Solana JSON-RPC
//!
//! Walks `getSignaturesForAddress` for the oracle program backwards from the
//! newest signature until the page falls before the range, then decodes the
//! logs of each successful transaction in range.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::{stream, StreamExt, TryStreamExt};
use optimistic_governor::oracle::{assertion_address, OracleAssertion};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use anchor_lang::prelude::Pubkey;

use crate::config::{MonitorParams, SlotRange};
use crate::error::{MonitorError, Result};
use crate::events::{events_from_logs, AssertionMade};
use crate::log::{EventLog, LoggedEvent};

/// Transactions fetched concurrently while decoding a range
const TRANSACTION_FETCH_CONCURRENCY: usize = 8;
const COMMITMENT: &str = "confirmed";

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SignatureInfo {
    signature: String,
    slot: u64,
    err: Option<Value>,
}

#[derive(Deserialize)]
struct TransactionResult {
    meta: Option<TransactionMeta>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionMeta {
    err: Option<Value>,
    #[serde(default)]
    log_messages: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct AccountInfoResult {
    value: Option<AccountValue>,
}

#[derive(Deserialize)]
struct AccountValue {
    /// `[payload, encoding]`
    data: (String, String),
    owner: String,
}

pub struct RpcEventLog {
    client: reqwest::Client,
    url: String,
    oracle_program: Pubkey,
    page_size: usize,
}

impl RpcEventLog {
    pub fn new(params: &MonitorParams) -> Self {
        Self::with_client(reqwest::Client::new(), params)
    }

    pub fn with_client(client: reqwest::Client, params: &MonitorParams) -> Self {
        Self {
            client,
            url: params.rpc_url.clone(),
            oracle_program: params.oracle_program,
            page_size: params.page_size,
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: RpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(MonitorError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result)
    }

    /// Successful oracle transactions in `range`, newest first.
    async fn signatures_in_range(&self, range: SlotRange) -> Result<Vec<SignatureInfo>> {
        let mut found = Vec::new();
        let mut before: Option<String> = None;
        loop {
            let mut config = json!({ "limit": self.page_size, "commitment": COMMITMENT });
            if let Some(signature) = before.as_ref() {
                config["before"] = json!(signature);
            }
            let page: Vec<SignatureInfo> = self
                .call(
                    "getSignaturesForAddress",
                    json!([self.oracle_program.to_string(), config]),
                )
                .await?
                .unwrap_or_default();
            debug!(count = page.len(), before = ?before, "fetched signature page");

            let Some(last) = page.last() else {
                break;
            };
            let exhausted = last.slot < range.start || page.len() < self.page_size;
            before = Some(last.signature.clone());
            found.extend(
                page.into_iter()
                    .filter(|info| info.err.is_none() && range.contains(info.slot)),
            );
            if exhausted {
                break;
            }
        }
        Ok(found)
    }

    async fn transaction_events(&self, info: SignatureInfo) -> Result<Vec<LoggedEvent<AssertionMade>>> {
        let transaction: Option<TransactionResult> = self
            .call(
                "getTransaction",
                json!([
                    info.signature,
                    {
                        "encoding": "json",
                        "commitment": COMMITMENT,
                        "maxSupportedTransactionVersion": 0
                    }
                ]),
            )
            .await?;
        logged_events(info, transaction, &self.oracle_program)
    }
}

/// `AssertionMade` events of one fetched transaction. A listed signature
/// whose transaction or metadata the node cannot return is an error, so the
/// scan never skips an assertion silently.
fn logged_events(
    info: SignatureInfo,
    transaction: Option<TransactionResult>,
    oracle_program: &Pubkey,
) -> Result<Vec<LoggedEvent<AssertionMade>>> {
    let Some(meta) = transaction.and_then(|tx| tx.meta) else {
        warn!(signature = %info.signature, "transaction not available");
        return Err(MonitorError::TransactionNotFound(info.signature));
    };
    if meta.err.is_some() {
        return Ok(Vec::new());
    }
    let logs = meta.log_messages.unwrap_or_default();
    let events = events_from_logs::<AssertionMade>(&logs, oracle_program)?;
    Ok(events
        .into_iter()
        .map(|event| LoggedEvent {
            signature: info.signature.clone(),
            slot: info.slot,
            event,
        })
        .collect())
}

#[async_trait]
impl EventLog for RpcEventLog {
    async fn assertion_made_events(&self, range: SlotRange) -> Result<Vec<LoggedEvent<AssertionMade>>> {
        let mut signatures = self.signatures_in_range(range).await?;
        signatures.reverse();

        let per_transaction: Vec<Vec<LoggedEvent<AssertionMade>>> = stream::iter(signatures)
            .map(|info| self.transaction_events(info))
            .buffered(TRANSACTION_FETCH_CONCURRENCY)
            .try_collect()
            .await?;
        Ok(per_transaction.into_iter().flatten().collect())
    }

    async fn assertion(&self, assertion_id: &[u8; 32]) -> Result<OracleAssertion> {
        let address = assertion_address(&self.oracle_program, assertion_id);
        let account: Option<AccountInfoResult> = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), { "encoding": "base64", "commitment": COMMITMENT }]),
            )
            .await?;
        let Some(value) = account.and_then(|account| account.value) else {
            return Err(MonitorError::assertion_not_found(assertion_id));
        };
        if value.owner != self.oracle_program.to_string() {
            return Err(MonitorError::assertion_not_found(assertion_id));
        }
        let data = STANDARD
            .decode(value.data.0.as_bytes())
            .map_err(|e| MonitorError::decode(format!("assertion account data: {e}")))?;
        OracleAssertion::try_from_account_data(&data, assertion_id)
            .map_err(|e| MonitorError::decode(format!("assertion account: {e}")))
    }

    async fn latest_slot(&self) -> Result<u64> {
        self.call("getSlot", json!([{ "commitment": COMMITMENT }]))
            .await?
            .ok_or_else(|| MonitorError::decode("getSlot returned no result"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_response_parses() {
        let response: RpcResponse<u64> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid param"},"id":1}"#,
        )
        .unwrap();
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.message, "Invalid param");
    }

    #[test]
    fn test_signature_page_parses() {
        let page: Vec<SignatureInfo> = serde_json::from_str(
            r#"[
                {"signature":"5h6x","slot":120,"err":null,"memo":null,"blockTime":1700000000,"confirmationStatus":"finalized"},
                {"signature":"3k9p","slot":118,"err":{"InstructionError":[0,{"Custom":6001}]},"memo":null,"blockTime":null}
            ]"#,
        )
        .unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].err.is_none());
        assert!(page[1].err.is_some());
        assert_eq!(page[1].slot, 118);
    }

    #[test]
    fn test_transaction_meta_parses_logs() {
        let tx: TransactionResult = serde_json::from_str(
            r#"{"slot":5,"meta":{"err":null,"logMessages":["Program log: hi"],"fee":5000}}"#,
        )
        .unwrap();
        let meta = tx.meta.unwrap();
        assert_eq!(meta.log_messages.unwrap(), vec!["Program log: hi".to_string()]);
    }

    fn signature(slot: u64) -> SignatureInfo {
        SignatureInfo {
            signature: "5h6x".to_string(),
            slot,
            err: None,
        }
    }

    #[test]
    fn test_missing_transaction_is_an_error() {
        let oracle = Pubkey::new_from_array([8; 32]);

        let err = logged_events(signature(150), None, &oracle).unwrap_err();
        assert!(matches!(err, MonitorError::TransactionNotFound(sig) if sig == "5h6x"));

        let no_meta: TransactionResult = serde_json::from_str(r#"{"slot":150,"meta":null}"#).unwrap();
        let err = logged_events(signature(150), Some(no_meta), &oracle).unwrap_err();
        assert!(matches!(err, MonitorError::TransactionNotFound(_)));
    }

    #[test]
    fn test_transaction_events_carry_signature_and_slot() {
        let oracle = Pubkey::new_from_array([8; 32]);
        let event = AssertionMade {
            assertion_id: [1; 32],
            domain_id: [0; 32],
            claim: b"proposalHash:01,explanation:pay,rules:r".to_vec(),
            asserter: Pubkey::new_from_array([1; 32]),
            callback_recipient: Pubkey::new_from_array([2; 32]),
            escalation_manager: Pubkey::default(),
            caller: Pubkey::new_from_array([2; 32]),
            expiration_time: 1_700_007_200,
            currency: Pubkey::new_from_array([3; 32]),
            bond: 1_000_000,
            identifier: [4; 32],
        };
        let logs = vec![
            format!("Program {} invoke [1]", oracle),
            crate::events::encode_event(&event),
            format!("Program {} success", oracle),
        ];
        let tx = TransactionResult {
            meta: Some(TransactionMeta {
                err: None,
                log_messages: Some(logs),
            }),
        };

        let events = logged_events(signature(150), Some(tx), &oracle).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].signature, "5h6x");
        assert_eq!(events[0].slot, 150);
        assert_eq!(events[0].event, event);

        let failed = TransactionResult {
            meta: Some(TransactionMeta {
                err: Some(serde_json::json!({"InstructionError": [0, {"Custom": 1}]})),
                log_messages: None,
            }),
        };
        assert!(logged_events(signature(150), Some(failed), &oracle).unwrap().is_empty());
    }

    #[test]
    fn test_account_info_parses_base64_tuple() {
        let info: AccountInfoResult = serde_json::from_str(
            r#"{"context":{"slot":9},"value":{"data":["AAEC","base64"],"executable":false,"lamports":1,"owner":"11111111111111111111111111111111","rentEpoch":0}}"#,
        )
        .unwrap();
        let value = info.value.unwrap();
        assert_eq!(value.data.1, "base64");
        assert_eq!(STANDARD.decode(value.data.0).unwrap(), vec![0, 1, 2]);
    }
}
