//! JSON-RPC Ledger Client
//!
//! Talks JSON-RPC 2.0 over HTTP to a gateway in front of the deployed
//! contract. The gateway owns the admin key; this client only sends the
//! write intent, authenticated with a bearer token.
//!
//! ```text
//! get_total_commitments  []        -> u32 | "0x.."
//! get_commitment_at      [index]   -> "0x.."
//! get_merkle_root        []        -> "0x.."
//! update_merkle_root     [root]    -> "0x.." | { txHash }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use aion_privacy::FieldElement;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{Ledger, LedgerError, TransactionReceipt};

pub const METHOD_TOTAL_COMMITMENTS: &str = "get_total_commitments";
pub const METHOD_COMMITMENT_AT: &str = "get_commitment_at";
pub const METHOD_MERKLE_ROOT: &str = "get_merkle_root";
pub const METHOD_UPDATE_ROOT: &str = "update_merkle_root";

/// Caller lacks the root-write privilege
pub const CODE_UNAUTHORIZED: i64 = -32001;
/// Commitment index past the end of the list
pub const CODE_INDEX_OUT_OF_RANGE: i64 = -32002;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Ledger reached through a JSON-RPC gateway
pub struct RpcLedger {
    client: reqwest::Client,
    url: String,
    auth_token: Option<String>,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(
        url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            auth_token,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value, privileged: bool) -> Result<Value, LedgerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("rpc -> {} {}", method, request.params);

        let mut builder = self.client.post(&self.url).json(&request);
        if privileged {
            if let Some(token) = &self.auth_token {
                builder = builder.bearer_auth(token);
            }
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LedgerError::Unauthorized(format!("gateway returned {status}")));
        }
        if !status.is_success() {
            return Err(LedgerError::Transport(format!("gateway returned {status}")));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(classify_error(error, &request.params, privileged));
        }
        body.result
            .ok_or_else(|| LedgerError::InvalidResponse(format!("{method}: missing result")))
    }
}

fn classify_error(error: RpcErrorObject, params: &Value, privileged: bool) -> LedgerError {
    match error.code {
        CODE_UNAUTHORIZED => LedgerError::Unauthorized(error.message),
        CODE_INDEX_OUT_OF_RANGE => {
            let index = params
                .get(0)
                .and_then(Value::as_u64)
                .and_then(|i| u32::try_from(i).ok())
                .unwrap_or(u32::MAX);
            LedgerError::IndexOutOfRange(index)
        }
        code if privileged => {
            LedgerError::TransactionRejected(format!("{} (code {code})", error.message))
        }
        code => LedgerError::InvalidResponse(format!("{} (code {code})", error.message)),
    }
}

/// Integer result, either a JSON number or a hex/decimal string
fn parse_count(value: &Value) -> Result<u32, LedgerError> {
    let wide = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    };
    wide.and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| LedgerError::InvalidResponse(format!("not a commitment count: {value}")))
}

fn parse_field(value: &Value) -> Result<FieldElement, LedgerError> {
    match value {
        Value::String(s) => {
            FieldElement::from_hex(s).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
        }
        Value::Number(n) => n
            .as_u64()
            .map(FieldElement::from)
            .ok_or_else(|| LedgerError::InvalidResponse(format!("not a field element: {n}"))),
        other => Err(LedgerError::InvalidResponse(format!(
            "not a field element: {other}"
        ))),
    }
}

fn parse_receipt(value: &Value) -> Result<TransactionReceipt, LedgerError> {
    let tx_hash = match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("txHash")
            .or_else(|| map.get("transaction_hash"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    tx_hash
        .map(|tx_hash| TransactionReceipt { tx_hash })
        .ok_or_else(|| LedgerError::InvalidResponse(format!("not a receipt: {value}")))
}

impl Ledger for RpcLedger {
    async fn total_commitments(&self) -> Result<u32, LedgerError> {
        let result = self.call(METHOD_TOTAL_COMMITMENTS, json!([]), false).await?;
        parse_count(&result)
    }

    async fn commitment_at(&self, index: u32) -> Result<FieldElement, LedgerError> {
        let result = self.call(METHOD_COMMITMENT_AT, json!([index]), false).await?;
        parse_field(&result)
    }

    async fn current_root(&self) -> Result<FieldElement, LedgerError> {
        let result = self.call(METHOD_MERKLE_ROOT, json!([]), false).await?;
        parse_field(&result)
    }

    async fn set_root(&self, root: FieldElement) -> Result<TransactionReceipt, LedgerError> {
        let result = self
            .call(METHOD_UPDATE_ROOT, json!([root.to_hex()]), true)
            .await?;
        parse_receipt(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_forms() {
        assert_eq!(parse_count(&json!(7)).unwrap(), 7);
        assert_eq!(parse_count(&json!("0x1a")).unwrap(), 26);
        assert_eq!(parse_count(&json!("12")).unwrap(), 12);
        assert!(parse_count(&json!(-1)).is_err());
        assert!(parse_count(&json!(u64::MAX)).is_err());
        assert!(parse_count(&json!(null)).is_err());
    }

    #[test]
    fn test_parse_field_forms() {
        assert_eq!(parse_field(&json!("0xAB")).unwrap(), FieldElement::from(0xabu64));
        assert_eq!(parse_field(&json!(5)).unwrap(), FieldElement::from(5u64));
        assert!(parse_field(&json!("0xnope")).is_err());
        assert!(parse_field(&json!([1])).is_err());
    }

    #[test]
    fn test_parse_receipt_forms() {
        assert_eq!(parse_receipt(&json!("0xfeed")).unwrap().tx_hash, "0xfeed");
        assert_eq!(
            parse_receipt(&json!({"transaction_hash": "0xbeef"})).unwrap().tx_hash,
            "0xbeef"
        );
        assert!(parse_receipt(&json!({})).is_err());
    }

    #[test]
    fn test_error_classification() {
        let err = |code| RpcErrorObject {
            code,
            message: "boom".into(),
        };

        assert!(matches!(
            classify_error(err(CODE_UNAUTHORIZED), &json!([]), true),
            LedgerError::Unauthorized(_)
        ));
        assert_eq!(
            classify_error(err(CODE_INDEX_OUT_OF_RANGE), &json!([9]), false),
            LedgerError::IndexOutOfRange(9)
        );
        assert!(matches!(
            classify_error(err(-32000), &json!(["0x1"]), true),
            LedgerError::TransactionRejected(_)
        ));
        assert!(matches!(
            classify_error(err(-32000), &json!([]), false),
            LedgerError::InvalidResponse(_)
        ));
    }
}
