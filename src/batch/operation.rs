use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::schema::{check_document, EntityViolation, FieldRule};
use crate::store::{DocumentRef, WriteBatch};

/// Kind of write a staged operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        })
    }
}

/// A write intent recorded in memory, not yet sent to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedOperation {
    pub kind: OperationKind,
    /// Collection path.
    pub path: String,
    /// Document id.
    pub id: String,
    /// Storage representation, id field included.
    pub data: Value,
}

impl StagedOperation {
    /// Forward this operation to a store batch. Creates go through `set`.
    pub(crate) fn apply_to<B: WriteBatch>(&self, batch: &mut B, doc: &DocumentRef) {
        match self.kind {
            OperationKind::Create => batch.set(doc, &self.data),
            OperationKind::Update => batch.update(doc, &self.data),
            OperationKind::Delete => batch.delete(doc, &self.data),
        }
    }
}

/// An entity registered for validation at the next commit.
#[derive(Debug, Clone)]
pub struct PendingValidation {
    pub path: String,
    pub id: String,
    pub data: Map<String, Value>,
    pub(crate) rules: Arc<Vec<FieldRule>>,
}

impl PendingValidation {
    /// Run the rules; `None` when every rule passes.
    pub fn validate(&self) -> Option<EntityViolation> {
        let fields = check_document(&self.rules, &self.data);
        if fields.is_empty() {
            return None;
        }
        Some(EntityViolation {
            collection: self.path.clone(),
            id: self.id.clone(),
            fields,
        })
    }
}
