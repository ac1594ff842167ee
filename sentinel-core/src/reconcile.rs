use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::database::{HazardEventRepository, WriteBatch};
use crate::error::Result;
use crate::{HazardEvent, HazardId};

/// Counters for one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Records handed in, duplicates and invalid ones included.
    pub received: usize,
    pub written: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub skipped_invalid: usize,
}

impl SyncSummary {
    pub fn is_noop(&self) -> bool {
        self.written == 0 && self.deleted == 0
    }
}

/// Staged batch plus the counters describing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub batch: WriteBatch,
    pub summary: SyncSummary,
}

/// A stored record is rewritten only when `severity` or `lat` moved.
///
/// Title, timestamp and longitude changes alone are not picked up.
pub fn needs_write(stored: &HazardEvent, incoming: &HazardEvent) -> bool {
    stored.severity != incoming.severity || stored.lat != incoming.lat
}

/// Diffs `incoming` against the `existing` snapshot.
///
/// Every id in `existing` that no valid incoming record claims is deleted.
/// When an id repeats, the last occurrence decides. An empty `incoming` list
/// plans nothing at all.
pub fn plan_sync(existing: Vec<HazardEvent>, incoming: &[HazardEvent]) -> SyncPlan {
    if incoming.is_empty() {
        return SyncPlan::default();
    }

    let stored: BTreeMap<HazardId, HazardEvent> = existing
        .into_iter()
        .map(|event| (event.id.clone(), event))
        .collect();
    let mut unclaimed: BTreeSet<&HazardId> = stored.keys().collect();
    let mut claimed: BTreeSet<&HazardId> = BTreeSet::new();
    let mut upserts: BTreeMap<&HazardId, &HazardEvent> = BTreeMap::new();
    let mut skipped_invalid = 0;

    for event in incoming {
        if !event.has_valid_coordinates() {
            debug!(id = %event.id, "skipping record with invalid coordinates");
            skipped_invalid += 1;
            continue;
        }

        unclaimed.remove(&event.id);
        claimed.insert(&event.id);
        match stored.get(&event.id) {
            Some(previous) if !needs_write(previous, event) => {
                upserts.remove(&event.id);
            }
            _ => {
                upserts.insert(&event.id, event);
            }
        }
    }

    let mut batch = WriteBatch::new();
    for event in upserts.values() {
        batch.set((*event).clone());
    }
    for id in &unclaimed {
        batch.delete((*id).clone());
    }

    let summary = SyncSummary {
        received: incoming.len(),
        written: upserts.len(),
        deleted: unclaimed.len(),
        unchanged: claimed.len() - upserts.len(),
        skipped_invalid,
    };
    SyncPlan { batch, summary }
}

/// A diff computed against one snapshot of the store, not yet committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedSync {
    pub plan: SyncPlan,
    /// Records in the snapshot the plan was computed against.
    pub stored: usize,
}

/// Applies fresh feed output to the persisted collection.
#[derive(Clone)]
pub struct Reconciler {
    repository: Arc<dyn HazardEventRepository>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(repository: Arc<dyn HazardEventRepository>) -> Self {
        Self { repository }
    }

    /// Reads the stored collection, diffs it against `combined`, and commits
    /// the result as one batch. Any storage error aborts before the commit.
    pub async fn reconcile(&self, combined: &[HazardEvent]) -> Result<SyncSummary> {
        let prepared = self.prepare(combined).await?;
        self.commit(prepared).await
    }

    /// Read and diff only; the store is not touched beyond `list_all`.
    pub async fn prepare(&self, combined: &[HazardEvent]) -> Result<PreparedSync> {
        if combined.is_empty() {
            info!("no records received; stored hazards left untouched");
            return Ok(PreparedSync::default());
        }

        let existing = self.repository.list_all().await?;
        let stored = existing.len();
        Ok(PreparedSync {
            plan: plan_sync(existing, combined),
            stored,
        })
    }

    /// Commits a prepared plan as one atomic batch.
    pub async fn commit(&self, prepared: PreparedSync) -> Result<SyncSummary> {
        let PreparedSync {
            plan: SyncPlan { batch, summary },
            stored,
        } = prepared;
        if summary.received == 0 {
            return Ok(summary);
        }

        if !batch.is_empty() {
            self.repository.commit_batch(&batch).await?;
        }

        info!(
            events = summary.received,
            stored,
            writes = summary.written,
            deletes = summary.deleted,
            unchanged = summary.unchanged,
            skipped_invalid = summary.skipped_invalid,
            "hazard sync committed"
        );
        Ok(summary)
    }
}
