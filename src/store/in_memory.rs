//! InMemoryDocumentStore - HashMap-backed document store for testing and development.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tracing::debug;

use super::{DocumentRef, DocumentStore, StoreError, WriteBatch};

/// Per-batch write limit of hosted document stores.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

type Collections = HashMap<String, BTreeMap<String, Value>>;

struct Shared {
    collections: RwLock<Collections>,
    injected_failure: Mutex<Option<StoreError>>,
    commits: AtomicU64,
}

/// In-memory document store backed by a HashMap of collections.
///
/// Clone-friendly via Arc: clones share the same documents, so a test can
/// hand one clone to a batch unit and inspect the other.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    shared: Arc<Shared>,
    max_batch_size: usize,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                collections: RwLock::new(HashMap::new()),
                injected_failure: Mutex::new(None),
                commits: AtomicU64::new(0),
            }),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Set the maximum number of writes a single batch may carry.
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    /// Make the next batch commit fail with `error`, leaving data untouched.
    pub fn fail_next_commit(&self, error: StoreError) {
        if let Ok(mut injected) = self.shared.injected_failure.lock() {
            *injected = Some(error);
        }
    }

    /// Read a document.
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    /// All documents of a collection, ordered by id.
    pub fn documents(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| (id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Number of batch commits that reached the store, including failed ones.
    pub fn commit_count(&self) -> u64 {
        self.shared.commits.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Collections>, StoreError> {
        self.shared
            .collections
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    type Batch = InMemoryBatch;

    fn batch(&self) -> InMemoryBatch {
        InMemoryBatch {
            shared: Arc::clone(&self.shared),
            max_batch_size: self.max_batch_size,
            writes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Create,
    Update,
    Set,
    Delete,
}

struct BufferedWrite {
    kind: WriteKind,
    doc: DocumentRef,
    data: Value,
}

/// Write batch for [`InMemoryDocumentStore`].
///
/// Writes are buffered and applied under one write lock at commit. Every
/// write is checked against a working copy of the touched collections, and
/// the copy only replaces the stored data once the whole batch succeeded.
pub struct InMemoryBatch {
    shared: Arc<Shared>,
    max_batch_size: usize,
    writes: Vec<BufferedWrite>,
}

impl InMemoryBatch {
    fn push(&mut self, kind: WriteKind, doc: &DocumentRef, data: &Value) {
        self.writes.push(BufferedWrite {
            kind,
            doc: doc.clone(),
            data: data.clone(),
        });
    }

    /// Number of writes buffered since the last commit.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    fn apply(&mut self) -> Result<(), StoreError> {
        let writes = std::mem::take(&mut self.writes);

        if let Some(error) = self
            .shared
            .injected_failure
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?
            .take()
        {
            return Err(error);
        }

        if writes.len() > self.max_batch_size {
            return Err(StoreError::BatchTooLarge {
                size: writes.len(),
                max: self.max_batch_size,
            });
        }

        let mut collections = self
            .shared
            .collections
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;

        let mut working: Collections = HashMap::new();
        for write in writes {
            let docs = working
                .entry(write.doc.collection().to_string())
                .or_insert_with(|| {
                    collections
                        .get(write.doc.collection())
                        .cloned()
                        .unwrap_or_default()
                });
            let id = write.doc.id().to_string();

            match write.kind {
                WriteKind::Create => {
                    if docs.contains_key(&id) {
                        return Err(StoreError::AlreadyExists(write.doc.path()));
                    }
                    docs.insert(id, write.data);
                }
                WriteKind::Update => match docs.get_mut(&id) {
                    Some(existing) => merge(existing, write.data),
                    None => return Err(StoreError::NotFound(write.doc.path())),
                },
                WriteKind::Set => {
                    docs.insert(id, write.data);
                }
                WriteKind::Delete => {
                    docs.remove(&id);
                }
            }
        }

        for (collection, docs) in working {
            collections.insert(collection, docs);
        }

        Ok(())
    }
}

/// Field-level merge used by `update`: top-level fields of `patch` replace
/// those of `existing`.
fn merge(existing: &mut Value, patch: Value) {
    match (existing, patch) {
        (Value::Object(target), Value::Object(fields)) => {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        (existing, patch) => *existing = patch,
    }
}

impl WriteBatch for InMemoryBatch {
    fn create(&mut self, doc: &DocumentRef, data: &Value) {
        self.push(WriteKind::Create, doc, data);
    }

    fn update(&mut self, doc: &DocumentRef, data: &Value) {
        self.push(WriteKind::Update, doc, data);
    }

    fn set(&mut self, doc: &DocumentRef, data: &Value) {
        self.push(WriteKind::Set, doc, data);
    }

    fn delete(&mut self, doc: &DocumentRef, data: &Value) {
        self.push(WriteKind::Delete, doc, data);
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        let count = self.writes.len();
        let result = self.apply();
        debug!(writes = count, ok = result.is_ok(), "in-memory batch applied");
        result
    }
}
