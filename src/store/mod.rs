//! Store - The document-store client contract the batch layer writes through.
//!
//! A [`DocumentStore`] hands out collection references and atomic
//! [`WriteBatch`] handles. [`InMemoryDocumentStore`] implements it over a
//! shared `HashMap` for tests and development; a network-backed client
//! implements the same two traits.

mod in_memory;

use std::fmt;
use std::future::Future;

use serde_json::Value;
use thiserror::Error;

pub use in_memory::{InMemoryBatch, InMemoryDocumentStore, DEFAULT_MAX_BATCH_SIZE};

/// Errors a store reports when an atomic batch cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A `create` targeted a document that already exists.
    #[error("document already exists: {0}")]
    AlreadyExists(String),

    /// An `update` targeted a document that does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The batch holds more writes than the store accepts at once.
    #[error("batch of {size} writes exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// The store could not be reached or its storage failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the batch for any other reason.
    #[error("batch rejected: {0}")]
    Rejected(String),
}

/// Reference to a collection by its slash-separated path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    path: String,
}

impl CollectionRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reference a document in this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocumentRef {
        DocumentRef {
            collection: self.path.clone(),
            id: id.into(),
        }
    }
}

/// Reference to a single document: collection path plus id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    collection: String,
    id: String,
}

impl DocumentRef {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full document path, `"collection/id"`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// An atomic write batch obtained from a [`DocumentStore`].
///
/// Write methods only buffer; nothing reaches the store until `commit`,
/// which applies every buffered write or none of them in one round trip.
pub trait WriteBatch {
    /// Create a document. Fails at commit if it already exists.
    fn create(&mut self, doc: &DocumentRef, data: &Value);

    /// Update an existing document. Fails at commit if it is missing.
    fn update(&mut self, doc: &DocumentRef, data: &Value);

    /// Write a document, replacing any existing one.
    fn set(&mut self, doc: &DocumentRef, data: &Value);

    /// Delete a document. `data` is the last known representation.
    fn delete(&mut self, doc: &DocumentRef, data: &Value);

    /// Send the buffered writes to the store as one atomic operation.
    fn commit(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// The document-store client the batch layer depends on.
pub trait DocumentStore {
    type Batch: WriteBatch;

    /// Start a new atomic write batch.
    fn batch(&self) -> Self::Batch;

    /// Reference a collection by path.
    fn collection(&self, path: &str) -> CollectionRef {
        CollectionRef::new(path)
    }
}
