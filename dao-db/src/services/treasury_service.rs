//! Treasury Service
//!
//! Read-only view of a DAO's treasury: the summary document (token, balance,
//! last update) and its transaction ledger keyed by transaction hash.

use alloy_primitives::Address;
use dao_core::{CanonicalAddress, DaoError, DaoResult};
use serde_json::Value;

use super::ListOptions;
use crate::paths;
use crate::reconcile::Reconciler;
use crate::store::{Direction, Query};

#[derive(Clone)]
pub struct TreasuryService {
    reconciler: Reconciler,
}

impl TreasuryService {
    pub fn new(reconciler: Reconciler) -> Self {
        Self { reconciler }
    }

    pub async fn summary(&self, dao: &Address) -> DaoResult<Value> {
        self.reconciler.require_dao(dao).await?;
        self.reconciler
            .store()
            .get(&paths::treasury(dao))
            .await?
            .map(|s| Value::Object(s.data))
            .ok_or_else(|| {
                DaoError::not_found(format!("treasury of DAO {} not found", dao.canonical()))
            })
    }

    /// Ledger entries, newest first; `startAfter` is a transaction hash
    pub async fn transactions(&self, dao: &Address, options: &ListOptions) -> DaoResult<Vec<Value>> {
        self.reconciler.require_dao(dao).await?;
        let query = options.apply(
            Query::new(paths::treasury_transactions(dao)).order_by("timestamp", Direction::Desc),
        );
        Ok(self
            .reconciler
            .store()
            .query(&query)
            .await?
            .iter()
            .map(|s| s.with_id("txHash"))
            .collect())
    }
}
