//! Domain services
//!
//! One service per entity family. Every write that mirrors an on-chain
//! action goes through [`crate::reconcile`]; reads are plain store queries.

pub mod announcement_service;
pub mod calendar_service;
pub mod claim_service;
pub mod dao_service;
pub mod document_service;
pub mod member_service;
pub mod proposal_service;
pub mod task_service;
pub mod treasury_service;
pub mod user_service;

pub use announcement_service::{AnnouncementService, AnnouncementUpdate, NewAnnouncement};
pub use calendar_service::{CalendarService, EventUpdate, NewCalendarEvent};
pub use claim_service::{ClaimService, NewClaim};
pub use dao_service::{CreatedDao, DaoService, DaoSort, ListDaosOptions, MemberCountBucket, NewDao};
pub use document_service::{DocumentFilter, DocumentService, NewDocument, SignOutcome};
pub use member_service::MemberService;
pub use proposal_service::{NewProposal, ProposalService};
pub use task_service::{NewTask, TaskList, TaskService, TaskUpdate};
pub use treasury_service::TreasuryService;
pub use user_service::{ProfileUpdate, UserDaoPage, UserDaosOptions, UserService};

use alloy_primitives::Address;
use dao_core::{clamp_limit, DaoError, DaoResult, EntityKind, DEFAULT_LIST_LIMIT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::paths;
use crate::reconcile::Reconciler;
use crate::store::{timestamp_from_unix, Direction, DocumentStore, Query, Snapshot};

/// Paging parameters shared by list operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Document id to resume after
    pub start_after: Option<String>,
}

impl ListOptions {
    pub fn page_size(&self) -> usize {
        clamp_limit(self.limit, DEFAULT_LIST_LIMIT)
    }

    /// Apply cursor, offset and limit to `query`
    pub fn apply(&self, query: Query) -> Query {
        query
            .start_after(self.start_after.clone())
            .offset(self.offset.unwrap_or(0))
            .limit(self.page_size())
    }
}

/// Render snapshots as response bodies carrying their document id
pub(crate) fn render(snapshots: Vec<Snapshot>) -> Vec<Value> {
    snapshots.iter().map(|s| s.with_id("id")).collect()
}

/// Ordered, paged listing of one entity collection
pub(crate) async fn list_entities(
    store: &dyn DocumentStore,
    dao: &Address,
    kind: EntityKind,
    order_field: &str,
    direction: Direction,
    options: &ListOptions,
) -> DaoResult<Vec<Value>> {
    let query = options.apply(Query::new(paths::entities(dao, kind)).order_by(order_field, direction));
    Ok(render(store.query(&query).await?))
}

/// Single entity document
pub(crate) async fn get_entity(
    store: &dyn DocumentStore,
    dao: &Address,
    kind: EntityKind,
    id: &str,
) -> DaoResult<Value> {
    store
        .get(&paths::entity(dao, kind, id))
        .await?
        .map(|s| s.with_id("id"))
        .ok_or_else(|| DaoError::not_found(format!("{} {} not found", kind, id)))
}

/// Stored timestamp for a unix-seconds request field
pub(crate) fn unix_field(field: &str, seconds: u64) -> DaoResult<String> {
    let seconds = i64::try_from(seconds)
        .map_err(|_| DaoError::validation(format!("{} is out of range", field)))?;
    timestamp_from_unix(seconds).map_err(|_| DaoError::validation(format!("{} is out of range", field)))
}

/// Every service, wired to one store and verifier
#[derive(Clone)]
pub struct Services {
    pub daos: DaoService,
    pub proposals: ProposalService,
    pub claims: ClaimService,
    pub tasks: TaskService,
    pub calendar: CalendarService,
    pub documents: DocumentService,
    pub announcements: AnnouncementService,
    pub members: MemberService,
    pub treasury: TreasuryService,
    pub users: UserService,
}

impl Services {
    pub fn new(reconciler: Reconciler, dao_factory: Option<Address>) -> Self {
        let store: Arc<dyn DocumentStore> = reconciler.store().clone();
        Self {
            daos: DaoService::new(reconciler.clone(), dao_factory),
            proposals: ProposalService::new(reconciler.clone()),
            claims: ClaimService::new(reconciler.clone()),
            tasks: TaskService::new(reconciler.clone()),
            calendar: CalendarService::new(reconciler.clone()),
            documents: DocumentService::new(reconciler.clone()),
            announcements: AnnouncementService::new(reconciler.clone()),
            members: MemberService::new(reconciler.clone()),
            treasury: TreasuryService::new(reconciler),
            users: UserService::new(store),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the service tests

    use alloy_dyn_abi::DynSolValue;
    use alloy_primitives::{address, Address, B256, U256};
    use dao_chain::{
        AbiModule, AbiRegistry, InMemoryReceiptFetcher, RawLog, TransactionReceipt, TransactionVerifier,
    };
    use dao_core::CallerIdentity;
    use std::sync::Arc;

    use crate::paths;
    use crate::reconcile::Reconciler;
    use crate::store::{DocumentData, DocumentStore, MemoryDocumentStore};

    pub const DAO: Address = address!("0x00000000000000000000000000000000000da0da");
    pub const CONTRACT: Address = address!("0x0000000000000000000000000000000000c0ffee");
    pub const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");
    pub const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");
    pub const CAROL: Address = address!("0x000000000000000000000000000000000000ca01");

    pub struct Harness {
        pub store: Arc<MemoryDocumentStore>,
        pub fetcher: Arc<InMemoryReceiptFetcher>,
        pub registry: Arc<AbiRegistry>,
        pub reconciler: Reconciler,
    }

    impl Harness {
        /// Empty store holding only the test DAO document
        pub async fn new() -> Self {
            let store = Arc::new(MemoryDocumentStore::new());
            let fetcher = Arc::new(InMemoryReceiptFetcher::new());
            let registry = Arc::new(AbiRegistry::embedded().unwrap());
            let verifier = TransactionVerifier::new(fetcher.clone(), registry.clone());
            let reconciler = Reconciler::new(store.clone(), verifier);

            store
                .set(
                    &paths::dao(&DAO),
                    DocumentData::new()
                        .set("daoAddress", DAO.to_checksum(None))
                        .set("memberCount", 1),
                )
                .await
                .unwrap();

            Self {
                store,
                fetcher,
                registry,
                reconciler,
            }
        }

        /// ABI-encoded log for `event` of `module`
        pub fn log(&self, module: AbiModule, event: &str, values: Vec<DynSolValue>) -> RawLog {
            self.registry
                .decoder(module)
                .unwrap()
                .event(event)
                .unwrap()
                .encode_log(CONTRACT, 0, values)
                .unwrap()
        }

        /// Register a receipt sent by `from` with `logs`, returning its hash
        pub fn receipt(&self, seed: u8, from: Address, success: bool, logs: Vec<RawLog>) -> B256 {
            let hash = B256::repeat_byte(seed);
            let logs = logs
                .into_iter()
                .enumerate()
                .map(|(i, mut log)| {
                    log.log_index = i as u64;
                    log
                })
                .collect();
            self.fetcher.insert(TransactionReceipt {
                transaction_hash: hash,
                success,
                from,
                to: Some(CONTRACT),
                block_number: 100 + seed as u64,
                logs,
            });
            hash
        }

        pub fn document_count(&self) -> usize {
            self.store.document_count()
        }
    }

    pub fn caller(uid: &str, wallet: Address) -> CallerIdentity {
        CallerIdentity::new(uid, Some(wallet))
    }

    pub fn uint(n: u64) -> DynSolValue {
        DynSolValue::Uint(U256::from(n), 256)
    }

    pub fn small_uint(n: u64) -> DynSolValue {
        DynSolValue::Uint(U256::from(n), 8)
    }

    pub fn addr(a: Address) -> DynSolValue {
        DynSolValue::Address(a)
    }

    pub fn text(s: &str) -> DynSolValue {
        DynSolValue::String(s.to_string())
    }
}
