//! Soroban RPC client. Polls `getEvents` and decodes fundraise events.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the RPC returns an error or rate-limit
//!   response, up to [`MAX_BACKOFF_SECS`] seconds.
//! * Transient network errors (connection reset, timeout) are retried silently.
//!
//! ## Encoding
//!
//! Events are requested with `xdrFormat: "json"`, so topics and data arrive as
//! JSON renderings of `ScVal` (`{"symbol":"recorded"}`,
//! `{"map":[{"key":…,"val":…}]}`). Flat objects and JSON-in-string topics are
//! accepted as well.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{IndexerError, Result};
use crate::events::{EventKind, FundraiseEvent};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<EventsResult>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsResult {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    #[serde(rename = "latestLedger")]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawEvent {
    #[serde(default, alias = "topicJson")]
    pub topic: Vec<Value>,
    #[serde(default, alias = "valueJson")]
    pub value: Value,
    #[serde(rename = "contractId")]
    pub contract_id: Option<String>,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
    pub id: Option<String>,
    pub ledger: Option<u64>,
    #[serde(rename = "ledgerClosedAt")]
    pub ledger_closed_at: Option<String>,
    #[serde(rename = "inSuccessfulContractCall")]
    pub in_successful_contract_call: Option<bool>,
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

/// Fetch a page of events from the RPC.
///
/// Returns `(events, next_cursor, latest_ledger)`.
pub async fn fetch_events(
    client: &Client,
    rpc_url: &str,
    contract_id: &str,
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
) -> Result<(Vec<RawEvent>, Option<String>, Option<u64>)> {
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        let params = build_params(contract_id, start_ledger, cursor, limit);

        let response = client
            .post(rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "getEvents",
                "params": params,
            }))
            .send()
            .await;

        let resp = match response {
            Ok(resp) => resp,
            Err(e) => {
                warn!("RPC request failed (will retry in {backoff}s): {e}");
                backoff = sleep_backoff(backoff).await;
                continue;
            }
        };

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate-limited by RPC (will retry in {backoff}s)");
            backoff = sleep_backoff(backoff).await;
            continue;
        }

        let body: RpcResponse = resp.json().await?;

        if let Some(err) = body.error {
            if is_hard_error(err.code) {
                return Err(IndexerError::Rpc {
                    code: err.code,
                    message: err.message,
                });
            }
            warn!(
                "RPC soft error (will retry in {backoff}s): {} {}",
                err.code, err.message
            );
            backoff = sleep_backoff(backoff).await;
            continue;
        }

        let result = body
            .result
            .ok_or_else(|| IndexerError::EventParse("Empty result from getEvents".to_string()))?;

        debug!(
            "Fetched {} events (latest_ledger={:?})",
            result.events.len(),
            result.latest_ledger
        );

        return Ok((result.events, result.cursor, result.latest_ledger));
    }
}

async fn sleep_backoff(backoff: u64) -> u64 {
    tokio::time::sleep(Duration::from_secs(backoff)).await;
    (backoff * 2).min(MAX_BACKOFF_SECS)
}

/// Invalid request, unknown method and invalid params are not worth retrying.
fn is_hard_error(code: i64) -> bool {
    matches!(code, -32600 | -32601 | -32602)
}

fn build_params(contract_id: &str, start_ledger: u32, cursor: Option<&str>, limit: u32) -> Value {
    let mut params = json!({
        "filters": [
            {
                "type": "contract",
                "contractIds": [contract_id]
            }
        ],
        "pagination": {
            "limit": limit
        },
        "xdrFormat": "json"
    });

    if let Some(cur) = cursor {
        params["pagination"]["cursor"] = json!(cur);
    } else {
        params["startLedger"] = json!(start_ledger);
    }

    params
}

// ─────────────────────────────────────────────────────────
// Event decoding
// ─────────────────────────────────────────────────────────

/// Decode raw RPC events, skipping those from failed calls or without topics.
pub fn decode_events(raw: &[RawEvent], contract_id: &str) -> Vec<FundraiseEvent> {
    raw.iter()
        .filter(|e| e.in_successful_contract_call != Some(false))
        .filter_map(|e| decode_single(e, contract_id))
        .collect()
}

fn decode_single(raw: &RawEvent, contract_id: &str) -> Option<FundraiseEvent> {
    let kind = EventKind::from_topic(&scalar(raw.topic.first()?)?);

    let ledger = raw.ledger.unwrap_or(0) as i64;
    let timestamp = raw
        .ledger_closed_at
        .as_deref()
        .and_then(parse_iso_to_unix)
        .unwrap_or(0);
    let account = raw.topic.get(1).and_then(scalar);

    let mut event = FundraiseEvent {
        event_id: raw.id.clone().unwrap_or_else(|| {
            format!(
                "{}-{}-{}",
                ledger,
                raw.tx_hash.as_deref().unwrap_or("-"),
                kind.as_str()
            )
        }),
        event_type: kind.as_str().to_string(),
        account,
        currency: None,
        amount: None,
        sequence: None,
        detail: None,
        ledger,
        timestamp,
        contract_id: raw
            .contract_id
            .clone()
            .unwrap_or_else(|| contract_id.to_string()),
        tx_hash: raw.tx_hash.clone(),
    };

    let data = &raw.value;
    if kind.moves_value() {
        event.currency = field(data, "currency");
        event.amount = field(data, "amount");
        event.sequence = field(data, "sequence").and_then(|s| s.parse().ok());
    }
    match kind {
        EventKind::TokensClaimed => event.amount = field(data, "amount"),
        EventKind::StateTransitioned => {
            let from = field(data, "from")?;
            let to = field(data, "to")?;
            event.detail = Some(format!("{}->{}", from.to_lowercase(), to.to_lowercase()));
        }
        EventKind::ManagerAdded | EventKind::ManagerRemoved => event.detail = scalar(data),
        EventKind::ContributionRecorded => event.detail = field(data, "bcy_value"),
        _ => {}
    }

    Some(event)
}

/// Value of `key` in a struct payload, either a flat JSON object or an
/// `ScVal` map.
fn field(value: &Value, key: &str) -> Option<String> {
    if let Some(v) = value.get(key) {
        return scalar(v);
    }
    let entries = value.get("map")?.as_array()?;
    entries
        .iter()
        .find(|entry| entry.get("key").and_then(scalar).as_deref() == Some(key))
        .and_then(|entry| entry.get("val"))
        .and_then(scalar)
}

/// Flatten a scalar `ScVal` rendering to its string form.
///
/// Handles raw strings and numbers, JSON encoded inside a string,
/// single-key wrappers such as `{"symbol":"x"}` or `{"i128":"5"}`, the
/// `{"type":…,"value":…}` shape, and unit enum variants rendered as a
/// one-element `vec`.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(inner @ Value::Object(_)) => scalar(&inner),
            _ => Some(s.clone()),
        },
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => {
            if let Some(v) = map.get("value") {
                return scalar(v);
            }
            if let Some(Value::Array(items)) = map.get("vec") {
                return items.first().and_then(scalar);
            }
            if map.len() == 1 {
                return map.values().next().and_then(scalar);
            }
            None
        }
        _ => None,
    }
}

fn parse_iso_to_unix(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
