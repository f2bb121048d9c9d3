//! A store whose commits wait until the test opens the gate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use docbatch::{DocumentRef, DocumentStore, StoreError, WriteBatch};
use serde_json::Value;
use tokio::sync::Notify;

#[derive(Default)]
struct Gate {
    open: Notify,
    started: AtomicBool,
    landed: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct GatedStore {
    gate: Arc<Gate>,
}

impl GatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let one waiting (or the next) commit through.
    pub fn open(&self) {
        self.gate.open.notify_one();
    }

    /// Whether a commit has reached the store and is waiting on the gate.
    pub fn commit_started(&self) -> bool {
        self.gate.started.load(Ordering::SeqCst)
    }

    /// Writes from commits that made it through the gate.
    pub fn landed(&self) -> usize {
        self.gate.landed.load(Ordering::SeqCst)
    }
}

pub struct GatedBatch {
    gate: Arc<Gate>,
    writes: usize,
}

impl WriteBatch for GatedBatch {
    fn create(&mut self, _doc: &DocumentRef, _data: &Value) {
        self.writes += 1;
    }

    fn update(&mut self, _doc: &DocumentRef, _data: &Value) {
        self.writes += 1;
    }

    fn set(&mut self, _doc: &DocumentRef, _data: &Value) {
        self.writes += 1;
    }

    fn delete(&mut self, _doc: &DocumentRef, _data: &Value) {
        self.writes += 1;
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.gate.started.store(true, Ordering::SeqCst);
        self.gate.open.notified().await;
        self.gate.landed.fetch_add(std::mem::take(&mut self.writes), Ordering::SeqCst);
        Ok(())
    }
}

impl DocumentStore for GatedStore {
    type Batch = GatedBatch;

    fn batch(&self) -> GatedBatch {
        GatedBatch {
            gate: Arc::clone(&self.gate),
            writes: 0,
        }
    }
}
