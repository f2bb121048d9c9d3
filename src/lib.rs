mod batch;
mod config;
mod document;
mod error;
mod schema;
mod store;

pub use batch::{
    generate_id, BatchRepository, BatchUnit, OperationKind, PendingValidation, StagedOperation,
    WriteOpts, GENERATED_ID_LEN,
};
pub use config::OrmConfig;
pub use document::Document;
pub use error::BatchError;
pub use schema::{
    check_document, CollectionSchema, Constraint, EntityViolation, FieldRule, FieldViolation,
    SchemaRegistry, ValidationErrors, DEFAULT_ID_FIELD,
};
pub use store::{
    CollectionRef, DocumentRef, DocumentStore, InMemoryBatch, InMemoryDocumentStore, StoreError,
    WriteBatch, DEFAULT_MAX_BATCH_SIZE,
};

// Re-exported so callers can build `Constraint::Matches` without adding the crate.
pub use regex_lite::Regex;
