//! In-process document store
//!
//! Holds every collection in memory behind a single lock, which makes
//! `commit` trivially atomic. Used for development and tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use super::data::{now_timestamp, Document};
use super::path::DocumentPath;
use super::query::Query;
use super::{DocumentStore, Snapshot, Write};
use crate::error::{StoreError, StoreResult};

/// Collection path → document id → body
type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// Memory-backed [`DocumentStore`]
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<Collections>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents across all collections
    pub fn document_count(&self) -> usize {
        self.collections.read().values().map(BTreeMap::len).sum()
    }

    /// Drop everything
    pub fn clear(&self) {
        self.collections.write().clear();
    }

    /// Every collection as JSON, for persisting between runs
    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(&*self.collections.read())?)
    }

    /// Store seeded from the output of [`to_json`](Self::to_json)
    pub fn from_json(raw: &str) -> StoreResult<Self> {
        let collections: Collections = serde_json::from_str(raw)?;
        debug!(collections = collections.len(), "Loaded document snapshot");
        Ok(Self {
            collections: RwLock::new(collections),
        })
    }
}

fn validate_id(path: &DocumentPath) -> StoreResult<()> {
    let id = path.id();
    if id.is_empty() || id.contains('/') {
        return Err(StoreError::InvalidPath(format!("bad document id in {}", path)));
    }
    Ok(())
}

fn lookup<'a>(collections: &'a Collections, path: &DocumentPath) -> Option<&'a Document> {
    collections
        .get(path.parent().as_str())
        .and_then(|docs| docs.get(path.id()))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Snapshot>> {
        let collections = self.collections.read();
        Ok(lookup(&collections, path).map(|data| Snapshot {
            path: path.clone(),
            data: data.clone(),
        }))
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Snapshot>> {
        let collections = self.collections.read();
        let Some(docs) = collections.get(query.collection.as_str()) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<(&String, &Document)> =
            docs.iter().filter(|(_, doc)| query.matches(doc)).collect();
        hits.sort_by(|a, b| query.compare((a.0.as_str(), a.1), (b.0.as_str(), b.1)));

        if let Some(cursor_id) = &query.start_after {
            if let Some(cursor) = docs.get(cursor_id) {
                hits.retain(|(id, doc)| {
                    query.compare((id.as_str(), *doc), (cursor_id.as_str(), cursor)) == Ordering::Greater
                });
            }
        }

        let page = hits.into_iter().skip(query.offset);
        let page: Vec<_> = match query.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        };

        Ok(page
            .into_iter()
            .map(|(id, data)| Snapshot {
                path: query.collection.doc(id.clone()),
                data: data.clone(),
            })
            .collect())
    }

    async fn count(&self, query: &Query) -> StoreResult<usize> {
        let collections = self.collections.read();
        Ok(collections
            .get(query.collection.as_str())
            .map(|docs| docs.values().filter(|doc| query.matches(doc)).count())
            .unwrap_or(0))
    }

    async fn commit(&self, writes: Vec<Write>) -> StoreResult<()> {
        let now = now_timestamp();
        let mut collections = self.collections.write();

        // Stage against a view of earlier writes in the same batch, then apply
        let mut staged: BTreeMap<DocumentPath, Option<Document>> = BTreeMap::new();
        for write in &writes {
            let path = write.path();
            validate_id(path)?;
            let current = match staged.get(path) {
                Some(doc) => doc.clone(),
                None => lookup(&collections, path).cloned(),
            };

            let next = match write {
                Write::Set { data, .. } => {
                    let mut doc = Document::new();
                    data.apply(&mut doc, &now)?;
                    Some(doc)
                }
                Write::Merge { data, .. } => {
                    let mut doc = current.unwrap_or_default();
                    data.apply(&mut doc, &now)?;
                    Some(doc)
                }
                Write::Update { data, .. } => {
                    let mut doc = current.ok_or_else(|| StoreError::NotFound(path.to_string()))?;
                    data.apply(&mut doc, &now)?;
                    Some(doc)
                }
                Write::Delete { .. } => None,
            };
            staged.insert(path.clone(), next);
        }

        for (path, doc) in staged {
            match doc {
                Some(doc) => {
                    collections
                        .entry(path.parent().as_str().to_string())
                        .or_default()
                        .insert(path.id().to_string(), doc);
                }
                None => {
                    if let Some(docs) = collections.get_mut(path.parent().as_str()) {
                        docs.remove(path.id());
                    }
                }
            }
        }

        debug!(writes = writes.len(), "Committed document writes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CollectionPath, Direction, DocumentData, FilterOp};
    use serde_json::json;

    fn daos() -> CollectionPath {
        CollectionPath::root("daos")
    }

    async fn seed(store: &MemoryDocumentStore) {
        for (id, members, created) in [("a", 3, "2026-01-01"), ("b", 12, "2026-01-03"), ("c", 7, "2026-01-02")] {
            store
                .set(
                    &daos().doc(id),
                    DocumentData::new().set("memberCount", members).set("createdAt", created),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_set_overwrites_and_update_merges() {
        let store = MemoryDocumentStore::new();
        let path = daos().doc("a");

        store.set(&path, DocumentData::new().set("x", 1).set("y", 2)).await.unwrap();
        store.set(&path, DocumentData::new().set("x", 3)).await.unwrap();
        let doc = store.require(&path).await.unwrap();
        assert_eq!(doc.get_i64("x"), Some(3));
        assert!(doc.get("y").is_none());

        store.update(&path, DocumentData::new().set("y", 4)).await.unwrap();
        let doc = store.require(&path).await.unwrap();
        assert_eq!(doc.get_i64("x"), Some(3));
        assert_eq!(doc.get_i64("y"), Some(4));
    }

    #[tokio::test]
    async fn test_json_snapshot_restores_documents() {
        let store = MemoryDocumentStore::new();
        seed(&store).await;

        let restored = MemoryDocumentStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(restored.document_count(), store.document_count());
        let ordered = Query::new(daos()).order_by("createdAt", Direction::Desc);
        assert_eq!(
            restored.query(&ordered).await.unwrap().len(),
            store.query(&ordered).await.unwrap().len()
        );
        assert!(MemoryDocumentStore::from_json("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        let result = store.update(&daos().doc("nope"), DocumentData::new().set("x", 1)).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));

        store.set_merge(&daos().doc("nope"), DocumentData::new().set("x", 1)).await.unwrap();
        assert!(store.get(&daos().doc("nope")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = MemoryDocumentStore::new();
        let result = store
            .commit(vec![
                Write::Set {
                    path: daos().doc("a"),
                    data: DocumentData::new().set("x", 1),
                },
                Write::Update {
                    path: daos().doc("missing"),
                    data: DocumentData::new().set("x", 1),
                },
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(store.document_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_sees_earlier_writes() {
        let store = MemoryDocumentStore::new();
        store
            .commit(vec![
                Write::Set {
                    path: daos().doc("a"),
                    data: DocumentData::new().set("n", 1),
                },
                Write::Update {
                    path: daos().doc("a"),
                    data: DocumentData::new().increment("n", 1),
                },
            ])
            .await
            .unwrap();
        assert_eq!(store.require(&daos().doc("a")).await.unwrap().get_i64("n"), Some(2));
    }

    #[tokio::test]
    async fn test_query_order_cursor_and_paging() {
        let store = MemoryDocumentStore::new();
        seed(&store).await;

        let recent = Query::new(daos()).order_by("createdAt", Direction::Desc);
        let ids: Vec<_> = store
            .query(&recent)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(ids, ["b", "c", "a"]);

        let after_b = store
            .query(&recent.clone().start_after(Some("b")).limit(1))
            .await
            .unwrap();
        assert_eq!(after_b.len(), 1);
        assert_eq!(after_b[0].id(), "c");

        // Unknown cursor is ignored
        let unknown = store.query(&recent.clone().start_after(Some("zzz"))).await.unwrap();
        assert_eq!(unknown.len(), 3);

        let paged = store.query(&recent.clone().offset(1).limit(5)).await.unwrap();
        assert_eq!(paged.len(), 2);
    }

    #[tokio::test]
    async fn test_query_filters_and_count() {
        let store = MemoryDocumentStore::new();
        seed(&store).await;

        let big = Query::new(daos())
            .filter("memberCount", FilterOp::Gt, 5)
            .order_by("memberCount", Direction::Asc)
            .limit(1);
        let hits = store.query(&big).await.unwrap();
        assert_eq!(hits[0].id(), "c");
        assert_eq!(store.count(&big).await.unwrap(), 2);

        let none = Query::new(CollectionPath::root("empty"));
        assert!(store.query(&none).await.unwrap().is_empty());
        assert_eq!(store.count(&none).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_subcollections_survive_parent_delete() {
        let store = MemoryDocumentStore::new();
        let dao = daos().doc("a");
        let member = dao.collection("members").doc("0xA");

        store.set(&dao, DocumentData::new().set("x", 1)).await.unwrap();
        store.set(&member, DocumentData::new().set("role", "Admin")).await.unwrap();
        store.delete(&dao).await.unwrap();

        assert!(store.get(&dao).await.unwrap().is_none());
        assert!(store.get(&member).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_server_timestamp_and_invalid_id() {
        let store = MemoryDocumentStore::new();
        store
            .set(&daos().doc("a"), DocumentData::new().server_timestamp("createdAt"))
            .await
            .unwrap();
        let doc = store.require(&daos().doc("a")).await.unwrap();
        assert!(doc.get_str("createdAt").unwrap().ends_with('Z'));

        let bad = store.set(&daos().doc("a/b"), DocumentData::new().set("x", json!(1))).await;
        assert!(matches!(bad, Err(StoreError::InvalidPath(_))));
    }
}
