use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;

use crate::database::ports::hazard_events::{BatchOp, HazardEventRepository, WriteBatch};
use crate::error::{CoreError, Result};
use crate::{HazardEvent, HazardId};

const UPSERT_SQL: &str = r#"
    INSERT INTO active_hazards (
        id, hazard_type, title, lat, lng, severity, source, event_time, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
    ON CONFLICT (id) DO UPDATE SET
        hazard_type = EXCLUDED.hazard_type,
        title = EXCLUDED.title,
        lat = EXCLUDED.lat,
        lng = EXCLUDED.lng,
        severity = EXCLUDED.severity,
        source = EXCLUDED.source,
        event_time = EXCLUDED.event_time,
        updated_at = NOW()
"#;

#[derive(Debug, FromRow)]
struct HazardRow {
    id: String,
    hazard_type: String,
    title: String,
    lat: f64,
    lng: f64,
    severity: String,
    source: String,
    event_time: String,
}

impl TryFrom<HazardRow> for HazardEvent {
    type Error = CoreError;

    fn try_from(row: HazardRow) -> Result<Self> {
        let id = HazardId::new(row.id)
            .map_err(|e| CoreError::InvalidRecord(e.to_string()))?;
        Ok(HazardEvent {
            id,
            hazard_type: row.hazard_type,
            title: row.title,
            lat: row.lat,
            lng: row.lng,
            severity: row.severity,
            source: row.source,
            timestamp: row.event_time,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PostgresHazardEventRepository {
    pool: PgPool,
}

impl PostgresHazardEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HazardEventRepository for PostgresHazardEventRepository {
    async fn list_all(&self) -> Result<Vec<HazardEvent>> {
        let rows: Vec<HazardRow> = sqlx::query_as(
            r#"
            SELECT id, hazard_type, title, lat, lng, severity, source, event_time
            FROM active_hazards
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(HazardEvent::try_from).collect()
    }

    async fn get(&self, id: &HazardId) -> Result<Option<HazardEvent>> {
        let row: Option<HazardRow> = sqlx::query_as(
            r#"
            SELECT id, hazard_type, title, lat, lng, severity, source, event_time
            FROM active_hazards
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(HazardEvent::try_from).transpose()
    }

    async fn upsert(&self, event: &HazardEvent) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        Self::upsert_impl(&mut tx, event).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &HazardId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM active_hazards WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit_batch(&self, batch: &WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;
        for op in batch.ops() {
            match op {
                BatchOp::Set(event) => Self::upsert_impl(&mut tx, event).await?,
                BatchOp::Delete(id) => Self::delete_impl(&mut tx, id).await?,
            }
        }
        tx.commit().await?;

        debug!(
            writes = batch.writes(),
            deletes = batch.deletes(),
            "hazard batch committed"
        );
        Ok(())
    }
}

impl PostgresHazardEventRepository {
    async fn upsert_impl(
        tx: &mut Transaction<'_, Postgres>,
        event: &HazardEvent,
    ) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(event.id.as_str())
            .bind(&event.hazard_type)
            .bind(&event.title)
            .bind(event.lat)
            .bind(event.lng)
            .bind(&event.severity)
            .bind(&event.source)
            .bind(&event.timestamp)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn delete_impl(
        tx: &mut Transaction<'_, Postgres>,
        id: &HazardId,
    ) -> Result<()> {
        sqlx::query("DELETE FROM active_hazards WHERE id = $1")
            .bind(id.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
