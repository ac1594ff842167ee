use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::ports::hazard_events::{BatchOp, HazardEventRepository, WriteBatch};
use crate::error::{CoreError, Result};
use crate::{HazardEvent, HazardId};

/// Process-local store. Batches are applied under one write lock, so readers
/// never observe a half-applied commit.
#[derive(Debug, Default)]
pub struct InMemoryHazardEventRepository {
    records: RwLock<BTreeMap<HazardId, HazardEvent>>,
    fail_commits: AtomicBool,
}

impl InMemoryHazardEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = HazardEvent>) -> Self {
        let records = records
            .into_iter()
            .map(|event| (event.id.clone(), event))
            .collect();
        Self {
            records: RwLock::new(records),
            fail_commits: AtomicBool::new(false),
        }
    }

    /// Makes every following `commit_batch` fail without touching the data.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl HazardEventRepository for InMemoryHazardEventRepository {
    async fn list_all(&self) -> Result<Vec<HazardEvent>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &HazardId) -> Result<Option<HazardEvent>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn upsert(&self, event: &HazardEvent) -> Result<()> {
        self.records
            .write()
            .await
            .insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn delete(&self, id: &HazardId) -> Result<bool> {
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn commit_batch(&self, batch: &WriteBatch) -> Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(CoreError::Internal(
                "batch commit rejected by store".to_string(),
            ));
        }

        let mut records = self.records.write().await;
        for op in batch.ops() {
            match op {
                BatchOp::Set(event) => {
                    records.insert(event.id.clone(), event.clone());
                }
                BatchOp::Delete(id) => {
                    records.remove(id);
                }
            }
        }
        Ok(())
    }
}
