use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::operation::{OperationKind, PendingValidation, StagedOperation};
use super::repository::BatchRepository;
use crate::document::Document;
use crate::error::BatchError;
use crate::schema::{SchemaRegistry, ValidationErrors};
use crate::store::{DocumentStore, WriteBatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitStatus {
    Pending,
    Committing,
    Poisoned,
}

struct UnitState<B> {
    status: UnitStatus,
    /// Taken out for the duration of a commit.
    handle: Option<B>,
    operations: Vec<StagedOperation>,
    validations: Vec<PendingValidation>,
}

/// Poisons the unit when a commit future is dropped before it finishes,
/// since the staged operations and the store handle went with it.
struct CommitGuard<'a, B> {
    state: &'a Mutex<UnitState<B>>,
    armed: bool,
}

impl<B> Drop for CommitGuard<'_, B> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.status = UnitStatus::Poisoned;
        warn!("commit dropped before completion; batch unit poisoned");
    }
}

/// Accumulates staged writes and flushes them to the store atomically.
///
/// Staging never touches the store. [`commit`](Self::commit) validates every
/// registered entity, forwards the operations staged since the last commit
/// to the store batch in staging order, and commits it in one round trip.
/// A failed commit poisons the unit; build a new one to retry.
///
/// ```ignore
/// let unit = BatchUnit::new(store);
/// let bands = unit.repository::<Band>(&registry)?;
/// let albums = unit.repository::<Album>(&registry)?;
///
/// bands.create(&mut band)?;
/// albums.create(&mut album)?;
/// unit.commit().await?;
/// ```
pub struct BatchUnit<S: DocumentStore> {
    store: S,
    state: Mutex<UnitState<S::Batch>>,
}

impl<S: DocumentStore> BatchUnit<S> {
    pub fn new(store: S) -> Self {
        let handle = store.batch();
        Self {
            store,
            state: Mutex::new(UnitState {
                status: UnitStatus::Pending,
                handle: Some(handle),
                operations: Vec::new(),
                validations: Vec::new(),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build a typed repository that stages into this unit.
    pub fn repository<'u, T: Document>(
        &'u self,
        registry: &SchemaRegistry,
    ) -> Result<BatchRepository<'u, T, S>, BatchError> {
        BatchRepository::new(self, registry)
    }

    pub fn stage_create(&self, path: &str, id: &str, data: Value) -> Result<(), BatchError> {
        self.stage(OperationKind::Create, path, id, data, None)
    }

    pub fn stage_update(&self, path: &str, id: &str, data: Value) -> Result<(), BatchError> {
        self.stage(OperationKind::Update, path, id, data, None)
    }

    pub fn stage_delete(&self, path: &str, id: &str, data: Value) -> Result<(), BatchError> {
        self.stage(OperationKind::Delete, path, id, data, None)
    }

    /// Append an operation and, optionally, its deferred validation under
    /// one lock so either both are recorded or neither is.
    pub(crate) fn stage(
        &self,
        kind: OperationKind,
        path: &str,
        id: &str,
        data: Value,
        validation: Option<PendingValidation>,
    ) -> Result<(), BatchError> {
        if path.is_empty() {
            return Err(BatchError::InvalidArgument(format!(
                "cannot stage {} without a collection path",
                kind
            )));
        }
        if id.is_empty() {
            return Err(BatchError::InvalidArgument(format!(
                "cannot stage {} on {} without a document id",
                kind, path
            )));
        }

        let mut state = self.state("stage")?;
        if state.status == UnitStatus::Poisoned {
            return Err(BatchError::Poisoned);
        }

        debug!(%kind, path, id, validate = validation.is_some(), "staged operation");
        if let Some(validation) = validation {
            state.validations.push(validation);
        }
        state.operations.push(StagedOperation {
            kind,
            path: path.to_string(),
            id: id.to_string(),
            data,
        });

        Ok(())
    }

    /// Number of operations staged since the last commit. Reads as 0 if the
    /// unit's lock is poisoned; use [`operations`](Self::operations) to see
    /// the `LockPoisoned` error.
    pub fn len(&self) -> usize {
        self.state("len").map(|s| s.operations.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the operations staged since the last commit.
    pub fn operations(&self) -> Result<Vec<StagedOperation>, BatchError> {
        Ok(self.state("operations")?.operations.clone())
    }

    /// Number of entities waiting to be validated at the next commit. Reads
    /// as 0 if the unit's lock is poisoned.
    pub fn pending_validations(&self) -> usize {
        self.state("pending_validations")
            .map(|s| s.validations.len())
            .unwrap_or(0)
    }

    /// Whether a failed or cancelled commit has made this unit unusable. A
    /// poisoned lock also reads as poisoned.
    pub fn is_poisoned(&self) -> bool {
        self.state("is_poisoned")
            .map(|s| s.status == UnitStatus::Poisoned)
            .unwrap_or(true)
    }

    /// Validate, then send every operation staged since the last commit to
    /// the store as one atomic batch.
    ///
    /// With nothing staged this still performs the store's commit round
    /// trip, and never re-sends operations from an earlier commit. Dropping
    /// the returned future before it completes poisons the unit.
    pub async fn commit(&self) -> Result<(), BatchError> {
        let (mut handle, operations, validations) = {
            let mut state = self.state("commit")?;
            match state.status {
                UnitStatus::Poisoned => return Err(BatchError::Poisoned),
                UnitStatus::Committing => return Err(BatchError::CommitInProgress),
                UnitStatus::Pending => {}
            }
            let handle = state.handle.take().ok_or(BatchError::CommitInProgress)?;
            state.status = UnitStatus::Committing;
            (
                handle,
                std::mem::take(&mut state.operations),
                std::mem::take(&mut state.validations),
            )
        };
        let mut guard = CommitGuard {
            state: &self.state,
            armed: true,
        };

        info!(
            operations = operations.len(),
            validations = validations.len(),
            "committing batch"
        );
        let result = self.flush(&mut handle, &operations, &validations).await;

        let mut state = self.state("commit")?;
        guard.armed = false;
        match result {
            Ok(()) => {
                state.status = UnitStatus::Pending;
                state.handle = Some(handle);
                info!(operations = operations.len(), "batch committed");
                Ok(())
            }
            Err(err) => {
                state.status = UnitStatus::Poisoned;
                Err(err)
            }
        }
    }

    async fn flush(
        &self,
        handle: &mut S::Batch,
        operations: &[StagedOperation],
        validations: &[PendingValidation],
    ) -> Result<(), BatchError> {
        let mut errors = ValidationErrors::new();
        for pending in validations {
            if let Some(violation) = pending.validate() {
                errors.push(violation);
            }
        }
        if !errors.is_empty() {
            warn!(entities = errors.len(), "batch validation failed; nothing sent");
            return Err(BatchError::Validation(errors));
        }

        for operation in operations {
            let doc = self
                .store
                .collection(&operation.path)
                .doc(operation.id.as_str());
            operation.apply_to(handle, &doc);
        }

        if let Err(err) = handle.commit().await {
            warn!(error = %err, "store rejected batch");
            return Err(BatchError::Commit(err));
        }

        Ok(())
    }

    fn state(
        &self,
        operation: &'static str,
    ) -> Result<MutexGuard<'_, UnitState<S::Batch>>, BatchError> {
        self.state
            .lock()
            .map_err(|_| BatchError::LockPoisoned(operation))
    }
}
