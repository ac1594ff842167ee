#![cfg(feature = "postgres-tests")]

mod support;

use anyhow::Result;
use sentinel_core::HazardId;
use sentinel_core::database::postgres::PoolSettings;
use sentinel_core::database::{HazardEventRepository, PostgresDatabase, WriteBatch};
use sentinel_core::reconcile::Reconciler;
use sqlx::PgPool;
use std::sync::Arc;
use support::hazard;

#[sqlx::test(migrator = "sentinel_core::MIGRATOR")]
async fn upsert_get_and_delete_roundtrip(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool, PoolSettings::default());
    let repo = db.hazard_events();
    let id = HazardId::new("123")?;

    repo.upsert(&hazard("123", "Medium", 45.0)).await?;
    repo.upsert(&hazard("123", "High", 45.0)).await?;

    let stored = repo.get(&id).await?.expect("row inserted");
    assert_eq!(stored.severity, "High");
    assert_eq!(stored.timestamp, "2024-05-01T10:00:00.000Z");

    assert!(repo.delete(&id).await?);
    assert!(!repo.delete(&id).await?);
    assert!(repo.list_all().await?.is_empty());
    Ok(())
}

#[sqlx::test(migrator = "sentinel_core::MIGRATOR")]
async fn batch_commit_is_atomic(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool.clone(), PoolSettings::default());
    let repo = db.hazard_events();
    repo.upsert(&hazard("keep", "High", 1.0)).await?;

    // The NaN latitude trips the finite-position check, so the whole batch
    // must roll back, including the delete queued before it.
    let mut broken = hazard("bad", "High", 1.0);
    broken.lat = f64::NAN;
    let mut batch = WriteBatch::new();
    batch.delete(HazardId::new("keep")?);
    batch.set(broken);
    assert!(repo.commit_batch(&batch).await.is_err());

    let ids: Vec<_> = repo
        .list_all()
        .await?
        .into_iter()
        .map(|event| event.id.into_inner())
        .collect();
    assert_eq!(ids, ["keep"]);
    Ok(())
}

#[sqlx::test(migrator = "sentinel_core::MIGRATOR")]
async fn reconciler_over_postgres(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool, PoolSettings::default());
    let repo = Arc::new(db.hazard_events());
    repo.upsert(&hazard("old", "High", 1.0)).await?;
    let reconciler = Reconciler::new(repo.clone());

    let summary = reconciler
        .reconcile(&[hazard("new", "Medium", 2.0)])
        .await?;
    assert_eq!(summary.written, 1);
    assert_eq!(summary.deleted, 1);

    let ids: Vec<_> = repo
        .list_all()
        .await?
        .into_iter()
        .map(|event| event.id.into_inner())
        .collect();
    assert_eq!(ids, ["new"]);
    Ok(())
}
