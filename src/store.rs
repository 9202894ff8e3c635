//! The declared interface of the database under test.
//!
//! Building real clients (connection strings, TLS, credentials) is the
//! caller's job; the engine and the built-in workloads only speak
//! [`DocumentStore`]. The trait distills the operations the built-in
//! workloads need: key-value get/upsert, a secondary-index prefix lookup, a
//! full-text search, and index management for setup.
//!
//! [`MemoryStore`] is a process-local implementation used by the test suite
//! and by the binary's self-contained target.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::error::StoreError;

/// State of a named index, as reported by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexState {
    Online,
    Building,
    Missing,
}

/// What kind of index to create during workload setup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexSpec {
    /// Secondary index over one document field, backing prefix lookups.
    Query { field: String },
    /// Full-text search index over one document field.
    Search { field: String },
}

/// Minimal document-database surface. Implementations must be safe for
/// concurrent use from every runner; the engine never synchronizes around
/// them.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Value, StoreError>;

    async fn upsert(&self, name: &str, data: Value) -> Result<(), StoreError>;

    /// Secondary-index lookup: documents whose `field` starts with `prefix`,
    /// capped at `limit`.
    async fn find_by_prefix(
        &self,
        field: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<Value>, StoreError>;

    /// Full-text search against a named index; returns matching document
    /// names.
    async fn search(&self, index: &str, term: &str) -> Result<Vec<String>, StoreError>;

    /// Create a named index if it does not already exist. Existing indexes
    /// succeed unchanged.
    async fn create_index(&self, name: &str, spec: IndexSpec) -> Result<(), StoreError>;

    async fn index_state(&self, name: &str) -> Result<IndexState, StoreError>;
}

/// How long to wait between polls of a building index.
const INDEX_POLL: Duration = Duration::from_secs(30);

/// Block until `index` is online. `Building` sleeps and polls again; any
/// other state is an error.
pub async fn wait_for_index(
    store: &dyn DocumentStore,
    index: &str,
) -> Result<(), StoreError> {
    info!(index, "waiting for index to build");
    loop {
        match store.index_state(index).await? {
            IndexState::Online => {
                info!(index, "index is online");
                return Ok(());
            }
            IndexState::Building => {
                info!(index, "index still building");
                tokio::time::sleep(INDEX_POLL).await;
            }
            IndexState::Missing => {
                return Err(StoreError::IndexState {
                    index: index.to_string(),
                    state: "missing".to_string(),
                });
            }
        }
    }
}

#[derive(Default)]
struct Inner {
    documents: HashMap<String, Value>,
    indexes: HashMap<String, IndexSpec>,
}

/// In-memory [`DocumentStore`]. Indexes come online instantly; search scans
/// the indexed field for substring matches.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn field_of(doc: &Value, field: &str) -> Option<String> {
        doc.get(field).and_then(Value::as_str).map(str::to_string)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<Value, StoreError> {
        self.inner
            .read()
            .unwrap()
            .documents
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn upsert(&self, name: &str, data: Value) -> Result<(), StoreError> {
        self.inner
            .write()
            .unwrap()
            .documents
            .insert(name.to_string(), data);
        Ok(())
    }

    async fn find_by_prefix(
        &self,
        field: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<Value>, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .documents
            .values()
            .filter(|doc| {
                Self::field_of(doc, field).is_some_and(|v| v.starts_with(prefix))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn search(&self, index: &str, term: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().unwrap();
        let spec = inner
            .indexes
            .get(index)
            .ok_or_else(|| StoreError::NotFound(index.to_string()))?;
        let IndexSpec::Search { field } = spec else {
            return Err(StoreError::Backend(format!(
                "index {index} is not a search index"
            )));
        };
        Ok(inner
            .documents
            .iter()
            .filter(|(_, doc)| Self::field_of(doc, field).is_some_and(|v| v.contains(term)))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn create_index(&self, name: &str, spec: IndexSpec) -> Result<(), StoreError> {
        self.inner
            .write()
            .unwrap()
            .indexes
            .entry(name.to_string())
            .or_insert(spec);
        Ok(())
    }

    async fn index_state(&self, name: &str) -> Result<IndexState, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(if inner.indexes.contains_key(name) {
            IndexState::Online
        } else {
            IndexState::Missing
        })
    }
}
