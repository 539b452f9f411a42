//! Transaction receipt model
//!
//! Receipts are read-only snapshots of a mined transaction. The wire shape is
//! the `eth_getTransactionReceipt` result object; quantities arrive as
//! `0x`-prefixed hex strings.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ChainResult};

/// A raw log entry emitted during execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event selector for non-anonymous events
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed arguments
    pub data: Bytes,
    /// Position of the log within the block
    pub log_index: u64,
}

/// Execution receipt of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    /// `status == 1`
    pub success: bool,
    /// Signer of the transaction
    pub from: Address,
    /// Destination; `None` for contract creation
    pub to: Option<Address>,
    pub block_number: u64,
    /// Logs in emission order
    pub logs: Vec<RawLog>,
}

/// `eth_getTransactionReceipt` log object
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireLog {
    address: Address,
    #[serde(default)]
    topics: Vec<B256>,
    #[serde(default)]
    data: Bytes,
    log_index: Option<String>,
}

/// `eth_getTransactionReceipt` result object
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireReceipt {
    transaction_hash: B256,
    status: Option<String>,
    from: Address,
    to: Option<Address>,
    block_number: Option<String>,
    #[serde(default)]
    logs: Vec<WireLog>,
}

impl TryFrom<WireReceipt> for TransactionReceipt {
    type Error = ChainError;

    fn try_from(wire: WireReceipt) -> ChainResult<Self> {
        let success = match wire.status.as_deref() {
            Some(status) => parse_quantity("status", status)? == 1,
            // Pre-Byzantium receipts carry a state root instead of a status
            None => false,
        };

        let block_number = match wire.block_number.as_deref() {
            Some(n) => parse_quantity("blockNumber", n)?,
            None => {
                return Err(ChainError::MalformedReceipt(
                    "receipt has no block number".to_string(),
                ))
            }
        };

        let logs = wire
            .logs
            .into_iter()
            .enumerate()
            .map(|(position, log)| {
                let log_index = match log.log_index.as_deref() {
                    Some(idx) => parse_quantity("logIndex", idx)?,
                    None => position as u64,
                };
                Ok(RawLog {
                    address: log.address,
                    topics: log.topics,
                    data: log.data,
                    log_index,
                })
            })
            .collect::<ChainResult<Vec<_>>>()?;

        Ok(Self {
            transaction_hash: wire.transaction_hash,
            success,
            from: wire.from,
            to: wire.to,
            block_number,
            logs,
        })
    }
}

/// Parse a JSON-RPC hex quantity
pub fn parse_quantity(field: &str, value: &str) -> ChainResult<u64> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::MalformedReceipt(format!("{} is not hex: {}", field, value)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|_| ChainError::MalformedReceipt(format!("{} is not hex: {}", field, value)))
}
