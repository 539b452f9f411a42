//! Transaction verification
//!
//! A claimed on-chain action is accepted only after every gate passes, in
//! order:
//!
//! 1. the node has a receipt for the hash,
//! 2. the receipt reports success,
//! 3. the transaction targeted the expected contract, when one is given,
//! 4. the receipt carries the expected event, when one is given, emitted by
//!    the expected contract when that is known.
//!
//! The first failing gate ends verification; nothing is returned partially.

use alloy_primitives::{Address, B256, U256};
use dao_core::{CanonicalAddress, DaoError, DaoResult};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::abi::{AbiModule, AbiRegistry};
use crate::decoder::DecodedEvent;
use crate::receipt::TransactionReceipt;
use crate::rpc::ReceiptFetcher;

/// What a transaction must satisfy beyond having succeeded
#[derive(Debug, Clone, Default)]
pub struct Expectation<'a> {
    /// Contract the transaction must have been sent to
    pub destination: Option<Address>,
    /// Event that must appear in the logs
    pub event: Option<(AbiModule, &'a str)>,
    /// Contract that must have emitted the event
    pub emitter: Option<Address>,
}

impl<'a> Expectation<'a> {
    /// Require `event` from `module`'s ABI
    pub fn event(module: AbiModule, event: &'a str) -> Self {
        Self {
            destination: None,
            event: Some((module, event)),
            emitter: None,
        }
    }

    /// Additionally require the destination
    pub fn sent_to(mut self, destination: Option<Address>) -> Self {
        self.destination = destination;
        self
    }

    /// Additionally require the event's emitting contract
    pub fn emitted_by(mut self, emitter: Option<Address>) -> Self {
        self.emitter = emitter;
        self
    }
}

/// A transaction that passed verification
#[derive(Debug, Clone)]
pub struct VerifiedTx {
    pub receipt: TransactionReceipt,
    /// The expected event, present whenever one was asked for
    pub event: Option<DecodedEvent>,
}

impl VerifiedTx {
    /// Signer of the transaction
    pub fn sender(&self) -> Address {
        self.receipt.from
    }

    pub fn tx_hash(&self) -> B256 {
        self.receipt.transaction_hash
    }

    /// The matched event
    pub fn event(&self) -> DaoResult<&DecodedEvent> {
        self.event.as_ref().ok_or_else(|| DaoError::EventNotFound {
            event: "<unspecified>".to_string(),
            tx_hash: self.receipt.transaction_hash.to_string(),
        })
    }
}

/// Verifies claimed transactions against the chain
#[derive(Clone)]
pub struct TransactionVerifier {
    fetcher: Arc<dyn ReceiptFetcher>,
    registry: Arc<AbiRegistry>,
}

impl TransactionVerifier {
    pub fn new(fetcher: Arc<dyn ReceiptFetcher>, registry: Arc<AbiRegistry>) -> Self {
        Self { fetcher, registry }
    }

    pub fn registry(&self) -> &AbiRegistry {
        &self.registry
    }

    /// Run every gate for `tx_hash`
    pub async fn verify(&self, tx_hash: &B256, expect: &Expectation<'_>) -> DaoResult<VerifiedTx> {
        debug!(tx_hash = %tx_hash, "Fetching receipt");
        let receipt = self.fetcher.fetch_receipt(tx_hash).await?;

        if !receipt.success {
            warn!(tx_hash = %tx_hash, "Rejected reverted transaction");
            return Err(DaoError::TxReverted(tx_hash.to_string()));
        }

        if let Some(expected) = expect.destination {
            if receipt.to != Some(expected) {
                let actual = receipt
                    .to
                    .map(|a| a.canonical())
                    .unwrap_or_else(|| "contract creation".to_string());
                warn!(tx_hash = %tx_hash, expected = %expected, actual = %actual, "Rejected transaction sent elsewhere");
                return Err(DaoError::TxWrongDestination {
                    expected: expected.canonical(),
                    actual,
                });
            }
        }

        let event = match expect.event {
            Some((module, name)) => match self.find_event(&receipt, module, name, expect.emitter)? {
                Some(event) => {
                    debug!(tx_hash = %tx_hash, event = %event.name, log_index = event.log_index, "Matched event");
                    Some(event)
                }
                None => {
                    warn!(tx_hash = %tx_hash, event = name, emitter = ?expect.emitter, "Expected event missing from receipt");
                    return Err(DaoError::EventNotFound {
                        event: name.to_string(),
                        tx_hash: tx_hash.to_string(),
                    });
                }
            },
            None => None,
        };

        Ok(VerifiedTx { receipt, event })
    }

    /// Verify and require `event` from `module`
    pub async fn verify_event(
        &self,
        tx_hash: &B256,
        module: AbiModule,
        event: &str,
    ) -> DaoResult<VerifiedTx> {
        self.verify(tx_hash, &Expectation::event(module, event)).await
    }

    /// First occurrence of `event` in an already fetched receipt
    ///
    /// With `emitter` set, logs from any other contract are skipped.
    pub fn find_event(
        &self,
        receipt: &TransactionReceipt,
        module: AbiModule,
        event: &str,
        emitter: Option<Address>,
    ) -> DaoResult<Option<DecodedEvent>> {
        Ok(self.find_events(receipt, module, event, emitter)?.into_iter().next())
    }

    /// Every occurrence of `event` in an already fetched receipt
    pub fn find_events(
        &self,
        receipt: &TransactionReceipt,
        module: AbiModule,
        event: &str,
        emitter: Option<Address>,
    ) -> DaoResult<Vec<DecodedEvent>> {
        let decoder = self.registry.decoder(module)?;
        Ok(decoder
            .decode(&receipt.logs)
            .filter(|decoded| decoded.matches(event))
            .filter(|decoded| emitter.map(|e| decoded.emitter == e).unwrap_or(true))
            .collect())
    }

    /// Occurrence of `event` whose `id_field` equals `id`
    ///
    /// Used for secondary events such as finalization that may or may not be
    /// present alongside the primary one.
    pub fn find_event_for(
        &self,
        receipt: &TransactionReceipt,
        module: AbiModule,
        event: &str,
        emitter: Option<Address>,
        id_field: &str,
        id: &U256,
    ) -> DaoResult<Option<DecodedEvent>> {
        Ok(self
            .find_events(receipt, module, event, emitter)?
            .into_iter()
            .find(|decoded| decoded.uint(id_field).map(|v| v == *id).unwrap_or(false)))
    }
}
