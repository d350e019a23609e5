use std::{
    future::Future,
    pin::Pin,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::error::{DashboardError, Result};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

const PAGE_LIMIT: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinObject {
    pub coin_type: String,
    pub coin_object_id: String,
    #[serde(deserialize_with = "u64_string")]
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub object_id: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub content: Option<MoveContent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveContent {
    pub data_type: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub fields: Value,
}

#[derive(Debug, Deserialize)]
struct ObjectResponse {
    data: Option<ObjectData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    data: Vec<T>,
    next_cursor: Option<String>,
    has_next_page: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResult {
    pub digest: String,
    #[serde(default)]
    pub effects: Option<Effects>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Effects {
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Abort reason when the ledger executed the transaction but the call failed.
    pub fn failure(&self) -> Option<String> {
        let status = &self.effects.as_ref()?.status;
        if status.status == "success" {
            None
        } else {
            Some(
                status
                    .error
                    .clone()
                    .unwrap_or_else(|| status.status.clone()),
            )
        }
    }
}

/// Sui's JSON encoding renders every u64 as a decimal string.
pub(crate) fn u64_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse::<u64>().map_err(serde::de::Error::custom)
}

/// Checks a `0x`-prefixed hex address and returns it lowercased.
pub fn parse_address(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| DashboardError::InvalidAddress(raw.to_string()))?;
    if hex.is_empty() || hex.len() > 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DashboardError::InvalidAddress(raw.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// The subset of the ledger's JSON-RPC surface the dashboard reads and writes.
pub trait LedgerRpc: Send + Sync {
    fn get_coins<'a>(
        &'a self,
        owner: &'a str,
        coin_type: &'a str,
    ) -> BoxFuture<'a, Result<Vec<CoinObject>>>;

    fn get_object<'a>(&'a self, object_id: &'a str) -> BoxFuture<'a, Result<ObjectData>>;

    fn get_owned_objects<'a>(
        &'a self,
        owner: &'a str,
        struct_type: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ObjectData>>>;

    fn execute_transaction<'a>(
        &'a self,
        tx_bytes: &'a str,
        signatures: &'a [String],
    ) -> BoxFuture<'a, Result<ExecutionResult>>;
}

pub struct SuiRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl SuiRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, id, "rpc call");
        let response: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        decode_rpc_response(response)
    }
}

fn decode_rpc_response<T: DeserializeOwned>(mut response: Value) -> Result<T> {
    if let Some(error) = response.get("error") {
        return Err(DashboardError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    let result = response
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| DashboardError::decode("rpc response", "missing `result`"))?;
    serde_json::from_value(result)
        .map_err(|e| DashboardError::decode("rpc response", e.to_string()))
}

impl LedgerRpc for SuiRpcClient {
    fn get_coins<'a>(
        &'a self,
        owner: &'a str,
        coin_type: &'a str,
    ) -> BoxFuture<'a, Result<Vec<CoinObject>>> {
        Box::pin(async move {
            let mut coins = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let page: Page<CoinObject> = self
                    .call("suix_getCoins", json!([owner, coin_type, cursor, PAGE_LIMIT]))
                    .await?;
                coins.extend(page.data);
                match page.next_cursor {
                    Some(next) if page.has_next_page => cursor = Some(next),
                    _ => break,
                }
            }
            Ok(coins)
        })
    }

    fn get_object<'a>(&'a self, object_id: &'a str) -> BoxFuture<'a, Result<ObjectData>> {
        Box::pin(async move {
            let response: ObjectResponse = self
                .call(
                    "sui_getObject",
                    json!([object_id, { "showContent": true, "showType": true }]),
                )
                .await?;
            response
                .data
                .ok_or_else(|| DashboardError::ObjectNotFound(object_id.to_string()))
        })
    }

    fn get_owned_objects<'a>(
        &'a self,
        owner: &'a str,
        struct_type: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ObjectData>>> {
        Box::pin(async move {
            let mut objects = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let page: Page<ObjectResponse> = self
                    .call(
                        "suix_getOwnedObjects",
                        json!([
                            owner,
                            {
                                "filter": { "StructType": struct_type },
                                "options": { "showContent": true, "showType": true }
                            },
                            cursor,
                            PAGE_LIMIT
                        ]),
                    )
                    .await?;
                objects.extend(page.data.into_iter().filter_map(|entry| entry.data));
                match page.next_cursor {
                    Some(next) if page.has_next_page => cursor = Some(next),
                    _ => break,
                }
            }
            Ok(objects)
        })
    }

    fn execute_transaction<'a>(
        &'a self,
        tx_bytes: &'a str,
        signatures: &'a [String],
    ) -> BoxFuture<'a, Result<ExecutionResult>> {
        Box::pin(async move {
            self.call(
                "sui_executeTransactionBlock",
                json!([
                    tx_bytes,
                    signatures,
                    { "showEffects": true },
                    "WaitForLocalExecution"
                ]),
            )
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_addresses() {
        assert_eq!(parse_address(" 0xABcd ").unwrap(), "0xabcd");
        assert!(parse_address("abcd").is_err());
        assert!(parse_address("0x").is_err());
        assert!(parse_address("0xzz").is_err());
        assert!(parse_address(&format!("0x{}", "a".repeat(65))).is_err());
    }

    #[test]
    fn rpc_error_is_surfaced() {
        let response = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "Invalid params" }
        });
        let err = decode_rpc_response::<Value>(response).unwrap_err();
        assert!(matches!(err, DashboardError::Rpc { code: -32602, .. }));
    }

    #[test]
    fn coin_page_decodes_string_balances() {
        let response = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "data": [{
                    "coinType": "0x2::sui::SUI",
                    "coinObjectId": "0x11",
                    "version": "4",
                    "digest": "abc",
                    "balance": "2500000000"
                }],
                "nextCursor": null,
                "hasNextPage": false
            }
        });
        let page: Page<CoinObject> = decode_rpc_response(response).unwrap();
        assert_eq!(page.data[0].balance, 2_500_000_000);
        assert!(!page.has_next_page);
    }

    #[test]
    fn numeric_balance_is_rejected() {
        let coin = json!({
            "coinType": "0x2::sui::SUI",
            "coinObjectId": "0x11",
            "balance": 5
        });
        assert!(serde_json::from_value::<CoinObject>(coin).is_err());
    }

    #[test]
    fn execution_failure_reports_abort() {
        let result: ExecutionResult = serde_json::from_value(json!({
            "digest": "D1",
            "effects": { "status": { "status": "failure", "error": "MoveAbort(3)" } }
        }))
        .unwrap();
        assert_eq!(result.failure().as_deref(), Some("MoveAbort(3)"));

        let ok: ExecutionResult = serde_json::from_value(json!({
            "digest": "D2",
            "effects": { "status": { "status": "success" } }
        }))
        .unwrap();
        assert!(ok.failure().is_none());
    }
}
