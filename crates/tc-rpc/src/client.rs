use crate::RpcError;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tc_api_types::{AccountAddress, ChainId, TxHash};
use url::Url;

static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Plain JSON-RPC 2.0 client for the read-only fallback endpoints.
#[derive(Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .expect("TLS and DNS resolver work");
        Self {
            http,
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn request(&self, url: &Url, method: &str, params: Value) -> Result<Value, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|err| RpcError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| RpcError::Decode(err.to_string()))?;

        if let Some(error) = body.get("error") {
            return Err(RpcError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown rpc error")
                    .to_owned(),
            });
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| RpcError::Decode("response missing result field".to_owned()))
    }

    pub async fn chain_id(&self, url: &Url) -> Result<ChainId, RpcError> {
        let result = self.request(url, "eth_chainId", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| RpcError::Decode("eth_chainId result must be a string".to_owned()))?;
        ChainId::parse(raw).map_err(|err| RpcError::Decode(err.to_string()))
    }

    /// `eth_call` against the latest block.
    pub async fn call(
        &self,
        url: &Url,
        to: &AccountAddress,
        data: &[u8],
    ) -> Result<Vec<u8>, RpcError> {
        let params = json!([{ "to": to.as_str(), "data": to_hex_prefixed(data) }, "latest"]);
        let result = self.request(url, "eth_call", params).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| RpcError::Decode("eth_call result must be a hex string".to_owned()))?;
        from_hex(raw)
    }

    /// `None` until the transaction is mined.
    pub async fn transaction_receipt(
        &self,
        url: &Url,
        hash: &TxHash,
    ) -> Result<Option<TxReceipt>, RpcError> {
        let result = self
            .request(url, "eth_getTransactionReceipt", json!([hash.0]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        TxReceipt::from_value(&result).map(Some)
    }
}

/// The slice of a transaction receipt this layer cares about: identity,
/// inclusion, and the success bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub status: bool,
}

impl TxReceipt {
    pub fn from_value(value: &Value) -> Result<Self, RpcError> {
        let transaction_hash = value
            .get("transactionHash")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::Decode("receipt missing transactionHash".to_owned()))?;

        let block_number = match value.get("blockNumber") {
            Some(Value::String(raw)) => Some(parse_hex_u64(raw)?),
            _ => None,
        };

        let status = value
            .get("status")
            .and_then(Value::as_str)
            .map(|raw| raw == "0x1")
            .unwrap_or(false);

        Ok(Self {
            transaction_hash: TxHash(transaction_hash.to_owned()),
            block_number,
            status,
        })
    }
}

fn parse_hex_u64(raw: &str) -> Result<u64, RpcError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16)
        .map_err(|err| RpcError::Decode(format!("invalid hex quantity {raw}: {err}")))
}

pub fn to_hex(input: &[u8]) -> String {
    let mut output = String::with_capacity(input.len() * 2);
    for byte in input {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

pub fn to_hex_prefixed(input: &[u8]) -> String {
    format!("0x{}", to_hex(input))
}

pub fn from_hex(raw: &str) -> Result<Vec<u8>, RpcError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.len() % 2 != 0 {
        return Err(RpcError::Decode(format!("odd-length hex string: {raw}")));
    }
    let mut out = Vec::with_capacity(digits.len() / 2);
    for chunk in digits.as_bytes().chunks(2) {
        out.push((hex_value(chunk[0])? << 4) | hex_value(chunk[1])?);
    }
    Ok(out)
}

fn hex_value(ascii: u8) -> Result<u8, RpcError> {
    match ascii {
        b'0'..=b'9' => Ok(ascii - b'0'),
        b'a'..=b'f' => Ok(ascii - b'a' + 10),
        b'A'..=b'F' => Ok(ascii - b'A' + 10),
        other => Err(RpcError::Decode(format!("invalid hex character {other:#04x}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let bytes = vec![0x00, 0x01, 0xab, 0xff];
        let encoded = to_hex_prefixed(&bytes);
        assert_eq!(encoded, "0x0001abff");
        assert_eq!(from_hex(&encoded).unwrap(), bytes);
        assert_eq!(from_hex("0x").unwrap(), Vec::<u8>::new());
        assert!(from_hex("0x123").is_err());
        assert!(from_hex("0xzz").is_err());
    }

    #[test]
    fn receipt_parses_mined_success() {
        let value = serde_json::json!({
            "transactionHash": "0xdead",
            "blockNumber": "0x10",
            "status": "0x1",
        });
        let receipt = TxReceipt::from_value(&value).unwrap();
        assert_eq!(receipt.transaction_hash.0, "0xdead");
        assert_eq!(receipt.block_number, Some(16));
        assert!(receipt.status);
    }

    #[test]
    fn receipt_parses_reverted_and_pending_fields() {
        let reverted = serde_json::json!({
            "transactionHash": "0xbeef",
            "blockNumber": "0x2a",
            "status": "0x0",
        });
        let receipt = TxReceipt::from_value(&reverted).unwrap();
        assert!(!receipt.status);

        let no_block = serde_json::json!({ "transactionHash": "0xbeef" });
        let receipt = TxReceipt::from_value(&no_block).unwrap();
        assert_eq!(receipt.block_number, None);

        assert!(TxReceipt::from_value(&serde_json::json!({})).is_err());
    }
}
