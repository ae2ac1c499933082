//! JSON-RPC access to the execution environment.
//!
//! The pipeline only ever talks to the chain through the [`Provider`] trait;
//! the signing of submitted transactions is owned by the endpoint behind it
//! (a dev node with an unlocked account, or a wallet bridge).

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unexpected rpc response: {0}")]
    InvalidResponse(String),
}

/// A transaction as submitted over `eth_sendTransaction`. Creation
/// transactions leave `to` empty and carry the init code in `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(with = "quantity_opt", skip_serializing_if = "Option::is_none", default)]
    pub gas: Option<U256>,
    #[serde(with = "quantity_opt", skip_serializing_if = "Option::is_none", default)]
    pub gas_price: Option<U256>,
    /// 0x-prefixed hex payload.
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// Post-Byzantium execution status quantity, `0x1` on success.
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    /// Receipts from chains that predate execution statuses carry no
    /// `status` field at all; only an explicit `0x0` marks a revert.
    pub fn succeeded(&self) -> bool {
        match self.status.as_deref() {
            Some(status) => U256::from_str_radix(status.trim_start_matches("0x"), 16)
                .map(|s| s != U256::ZERO)
                .unwrap_or(false),
            None => true,
        }
    }
}

#[async_trait]
pub trait Provider {
    /// Accounts the wallet endpoint is able to sign for.
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Read-only gas simulation of `request` against current state.
    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<U256, ProviderError>;

    /// Submits `request` for signing and inclusion, returning its hash.
    async fn send_transaction(&self, request: &TransactionRequest) -> Result<B256, ProviderError>;

    /// The receipt for `hash`, or `None` while the transaction is pending.
    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, ProviderError>;
}

#[async_trait]
impl<P> Provider for &P
where
    P: Provider + Sync,
{
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        (**self).accounts().await
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<U256, ProviderError> {
        (**self).estimate_gas(request).await
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<B256, ProviderError> {
        (**self).send_transaction(request).await
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        (**self).transaction_receipt(hash).await
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// `eth_*` JSON-RPC over HTTP.
#[derive(Debug)]
pub struct HttpProvider {
    client: reqwest::Client,
    url: Url,
    id: AtomicU64,
}

impl HttpProvider {
    pub fn new(url: Url) -> Self {
        Self { client: reqwest::Client::new(), url, id: AtomicU64::new(1) }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .client
            .post(self.url.clone())
            .json(&json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": id,
            }))
            .send()
            .await?;

        let body: JsonRpcResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(ProviderError::Rpc { code: error.code, message: error.message });
        }

        body.result.ok_or_else(|| {
            ProviderError::InvalidResponse(format!("`{method}` returned neither result nor error"))
        })
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let result = self.request("eth_accounts", json!([])).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<U256, ProviderError> {
        let result = self.request("eth_estimateGas", json!([request])).await?;
        quantity_from_value(&result)
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<B256, ProviderError> {
        let result = self.request("eth_sendTransaction", json!([request])).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        let result = self.request("eth_getTransactionReceipt", json!([hash])).await?;
        Ok(serde_json::from_value(result)?)
    }
}

fn quantity_from_value(value: &Value) -> Result<U256, ProviderError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("expected quantity, got {value}")))?;
    U256::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|_| ProviderError::InvalidResponse(format!("malformed quantity `{raw}`")))
}

/// Serde helpers for optional `0x`-prefixed quantities, which the RPC spec
/// wants minimally encoded rather than zero-padded.
mod quantity_opt {
    use alloy_primitives::U256;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&format!("{value:#x}")),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|raw| {
            U256::from_str_radix(raw.trim_start_matches("0x"), 16)
                .map_err(|_| D::Error::custom(format!("malformed quantity `{raw}`")))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn creation_request_serializes_without_to() {
        let request = TransactionRequest {
            from: Address::from_str("0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1").unwrap(),
            to: None,
            gas: Some(U256::from(0x5208)),
            gas_price: Some(U256::from(1_000_000_000u64)),
            data: "0x6060".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("to").is_none());
        assert_eq!(value["gas"], "0x5208");
        assert_eq!(value["gasPrice"], "0x3b9aca00");
        assert_eq!(value["data"], "0x6060");
    }

    #[test]
    fn receipt_status_parsing() {
        let mined: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "contractAddress": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "status": "0x1",
        }))
        .unwrap();
        assert!(mined.succeeded());
        assert!(mined.contract_address.is_some());

        let reverted: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "status": "0x0",
        }))
        .unwrap();
        assert!(!reverted.succeeded());

        let pre_byzantium: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
        }))
        .unwrap();
        assert!(pre_byzantium.succeeded());
    }

    #[test]
    fn quantities_decode_from_minimal_hex() {
        assert_eq!(quantity_from_value(&json!("0x0")).unwrap(), U256::ZERO);
        assert_eq!(quantity_from_value(&json!("0x2386f26fc10000")).unwrap(), U256::from(10_000_000_000_000_000u64));
        assert!(quantity_from_value(&json!(12)).is_err());
    }
}
