//! Document store abstraction
//!
//! A hierarchical key/document store: collections of JSON documents, each
//! document optionally owning sub-collections. Writes go through [`Write`]
//! values so several mutations can be committed atomically.

pub mod data;
pub mod memory;
pub mod path;
pub mod query;

pub use data::{
    compare_values, field, format_timestamp, now_timestamp, timestamp_from_unix, Document,
    DocumentData, FieldOp,
};
pub use memory::MemoryDocumentStore;
pub use path::{CollectionPath, DocumentPath};
pub use query::{Direction, Filter, FilterOp, Query};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// A document read from the store
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: DocumentPath,
    pub data: Document,
}

impl Snapshot {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Field by dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        field(&self.data, path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// Deserialize the whole body
    pub fn deserialize<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }

    /// Body with the document id added under `id_field`
    pub fn with_id(&self, id_field: &str) -> Value {
        let mut body = self.data.clone();
        body.insert(id_field.to_string(), Value::String(self.id().to_string()));
        Value::Object(body)
    }
}

/// One mutation within a commit
#[derive(Debug, Clone)]
pub enum Write {
    /// Replace the document
    Set { path: DocumentPath, data: DocumentData },
    /// Apply to the existing document, creating it if absent
    Merge { path: DocumentPath, data: DocumentData },
    /// Apply to the existing document; fails when absent
    Update { path: DocumentPath, data: DocumentData },
    Delete { path: DocumentPath },
}

impl Write {
    pub fn path(&self) -> &DocumentPath {
        match self {
            Write::Set { path, .. }
            | Write::Merge { path, .. }
            | Write::Update { path, .. }
            | Write::Delete { path } => path,
        }
    }
}

/// Document store operations
///
/// `commit` is all-or-nothing: if any write fails, none is applied.
/// Sub-collections survive deletion of their parent document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Snapshot>>;

    async fn query(&self, query: &Query) -> StoreResult<Vec<Snapshot>>;

    /// Documents matching the filters, ignoring cursor, offset and limit
    async fn count(&self, query: &Query) -> StoreResult<usize>;

    async fn commit(&self, writes: Vec<Write>) -> StoreResult<()>;

    async fn set(&self, path: &DocumentPath, data: DocumentData) -> StoreResult<()> {
        self.commit(vec![Write::Set { path: path.clone(), data }]).await
    }

    async fn set_merge(&self, path: &DocumentPath, data: DocumentData) -> StoreResult<()> {
        self.commit(vec![Write::Merge { path: path.clone(), data }]).await
    }

    async fn update(&self, path: &DocumentPath, data: DocumentData) -> StoreResult<()> {
        self.commit(vec![Write::Update { path: path.clone(), data }]).await
    }

    async fn delete(&self, path: &DocumentPath) -> StoreResult<()> {
        self.commit(vec![Write::Delete { path: path.clone() }]).await
    }

    /// Fetch a document that must exist
    async fn require(&self, path: &DocumentPath) -> StoreResult<Snapshot> {
        self.get(path)
            .await?
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }
}
