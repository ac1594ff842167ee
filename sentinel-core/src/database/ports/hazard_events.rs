use async_trait::async_trait;

use crate::{HazardEvent, HazardId, Result};

/// One staged mutation of the active hazard collection.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Full overwrite of the record stored under `event.id`.
    Set(HazardEvent),
    Delete(HazardId),
}

impl BatchOp {
    pub fn id(&self) -> &HazardId {
        match self {
            BatchOp::Set(event) => &event.id,
            BatchOp::Delete(id) => id,
        }
    }
}

/// Operations applied all-or-nothing by [`HazardEventRepository::commit_batch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, event: HazardEvent) {
        self.ops.push(BatchOp::Set(event));
    }

    pub fn delete(&mut self, id: HazardId) {
        self.ops.push(BatchOp::Delete(id));
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn writes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, BatchOp::Set(_)))
            .count()
    }

    pub fn deletes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, BatchOp::Delete(_)))
            .count()
    }
}

/// Keyed document collection holding the currently active hazards.
#[async_trait]
pub trait HazardEventRepository: Send + Sync {
    /// Every stored record, in id order.
    async fn list_all(&self) -> Result<Vec<HazardEvent>>;

    async fn get(&self, id: &HazardId) -> Result<Option<HazardEvent>>;

    /// Stores `event` under its id, replacing any previous record.
    async fn upsert(&self, event: &HazardEvent) -> Result<()>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &HazardId) -> Result<bool>;

    /// Applies every op in order inside one atomic unit. On error nothing is
    /// applied.
    async fn commit_batch(&self, batch: &WriteBatch) -> Result<()>;
}
