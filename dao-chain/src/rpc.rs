//! EVM JSON-RPC Client
//!
//! Fetches transaction receipts from an Ethereum-compatible node. Every
//! verification re-fetches; there is no caching and no retry.

use alloy_primitives::B256;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::config::ChainConfig;
use crate::error::{ChainError, ChainResult};
use crate::receipt::{parse_quantity, TransactionReceipt, WireReceipt};

/// Source of transaction receipts
#[async_trait]
pub trait ReceiptFetcher: Send + Sync {
    /// Fetch the receipt for `tx_hash`
    ///
    /// Fails with [`ChainError::ReceiptNotFound`] when the node has no receipt,
    /// which is distinct from a receipt whose status reports a revert.
    async fn fetch_receipt(&self, tx_hash: &B256) -> ChainResult<TransactionReceipt>;
}

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
    #[allow(dead_code)]
    id: u64,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Receipt fetcher backed by an EVM node's JSON-RPC endpoint
pub struct JsonRpcReceiptFetcher {
    client: Client,
    config: ChainConfig,
    request_id: AtomicU64,
}

impl JsonRpcReceiptFetcher {
    /// Create a new client
    pub fn new(config: ChainConfig) -> ChainResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChainError::RpcConnection(e.to_string()))?;

        Ok(Self {
            client,
            config,
            request_id: AtomicU64::new(0),
        })
    }

    /// Make an RPC call; `Ok(None)` when the node answers `null`
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> ChainResult<Option<T>> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!("EVM RPC call: {} id={}", method, id);

        let response = self
            .client
            .post(&self.config.rpc_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::RpcRequest(format!("HTTP {} - {}", status, body)));
        }

        let rpc_response: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainError::RpcRequest(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            return Err(ChainError::RpcResponse {
                code: error.code,
                message: error.message,
            });
        }

        Ok(rpc_response.result)
    }

    /// Latest block number, used as a connectivity check
    pub async fn block_number(&self) -> ChainResult<u64> {
        let raw: Option<String> = self.call("eth_blockNumber", serde_json::json!([])).await?;
        let raw = raw.ok_or_else(|| ChainError::RpcRequest("Empty response".to_string()))?;
        parse_quantity("blockNumber", &raw)
    }

    /// Configured endpoint
    pub fn rpc_url(&self) -> &str {
        &self.config.rpc_url
    }
}

#[async_trait]
impl ReceiptFetcher for JsonRpcReceiptFetcher {
    async fn fetch_receipt(&self, tx_hash: &B256) -> ChainResult<TransactionReceipt> {
        let wire: Option<WireReceipt> = self
            .call("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
            .await?;

        match wire {
            Some(wire) => TransactionReceipt::try_from(wire),
            None => Err(ChainError::ReceiptNotFound(tx_hash.to_string())),
        }
    }
}

/// Fetcher serving receipts registered in process
///
/// Stands in for a node in tests and offline tooling.
#[derive(Default)]
pub struct InMemoryReceiptFetcher {
    receipts: RwLock<HashMap<B256, TransactionReceipt>>,
}

impl InMemoryReceiptFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a receipt under its transaction hash
    pub fn insert(&self, receipt: TransactionReceipt) {
        self.receipts
            .write()
            .insert(receipt.transaction_hash, receipt);
    }

    /// Forget a receipt, as if the transaction had never been mined
    pub fn remove(&self, tx_hash: &B256) -> Option<TransactionReceipt> {
        self.receipts.write().remove(tx_hash)
    }
}

#[async_trait]
impl ReceiptFetcher for InMemoryReceiptFetcher {
    async fn fetch_receipt(&self, tx_hash: &B256) -> ChainResult<TransactionReceipt> {
        self.receipts
            .read()
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| ChainError::ReceiptNotFound(tx_hash.to_string()))
    }
}
