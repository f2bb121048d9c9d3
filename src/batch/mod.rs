//! Batch - Unit-of-work staging with deferred validation and atomic commit.

mod id;
mod operation;
mod repository;
mod unit;

pub use id::{generate_id, GENERATED_ID_LEN};
pub use operation::{OperationKind, PendingValidation, StagedOperation};
pub use repository::{BatchRepository, WriteOpts};
pub use unit::BatchUnit;
