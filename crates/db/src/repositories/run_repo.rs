//! Postgres-backed run store (`runs` table).
//!
//! Each run is one JSONB document. `state` is duplicated into its own
//! column for cheap listings; `version` guards conditional updates.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use wes_core::types::RunId;

use crate::models::run::{Run, RunSummary};
use crate::repositories::run_store::{RunStore, StoreError};

/// PostgreSQL unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, FromRow)]
struct RunDocumentRow {
    version: i64,
    document: serde_json::Value,
}

#[derive(Debug, FromRow)]
struct RunSummaryRow {
    run_id: String,
    state: String,
}

/// Run store over a Postgres connection pool.
#[derive(Clone)]
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(row: RunDocumentRow) -> Result<Run, StoreError> {
        let mut run: Run = serde_json::from_value(row.document)?;
        run.set_version(row.version);
        Ok(run)
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn exists(&self, run_id: &RunId) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM runs WHERE run_id = $1)",
        )
        .bind(run_id.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn create(&self, mut run: Run) -> Result<Run, StoreError> {
        let document = serde_json::to_value(&run)?;
        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO runs (run_id, state, version, document) \
             VALUES ($1, $2, 1, $3) \
             RETURNING version",
        )
        .bind(run.run_id().as_str())
        .bind(run.run_status.as_str())
        .bind(&document)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(version) => {
                run.set_version(version);
                Ok(run)
            }
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(StoreError::Duplicate(run.run_id().clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, run_id: &RunId) -> Result<Run, StoreError> {
        let row = sqlx::query_as::<_, RunDocumentRow>(
            "SELECT version, document FROM runs WHERE run_id = $1",
        )
        .bind(run_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(run_id.clone()))?;

        Self::decode(row)
    }

    async fn update(&self, mut run: Run) -> Result<Run, StoreError> {
        let document = serde_json::to_value(&run)?;
        let updated = sqlx::query_scalar::<_, i64>(
            "UPDATE runs \
             SET state = $2, document = $3, version = version + 1, updated_at = NOW() \
             WHERE run_id = $1 AND version = $4 \
             RETURNING version",
        )
        .bind(run.run_id().as_str())
        .bind(run.run_status.as_str())
        .bind(&document)
        .bind(run.version())
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(version) => {
                run.set_version(version);
                Ok(run)
            }
            None if self.exists(run.run_id()).await? => Err(StoreError::Conflict {
                run_id: run.run_id().clone(),
                expected_version: run.version(),
            }),
            None => Err(StoreError::NotFound(run.run_id().clone())),
        }
    }

    async fn list_summaries(&self) -> Result<Vec<RunSummary>, StoreError> {
        let rows = sqlx::query_as::<_, RunSummaryRow>(
            "SELECT run_id, state FROM runs ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let state = row
                    .state
                    .parse()
                    .map_err(|e: wes_core::error::CoreError| StoreError::Corrupt(e.to_string()))?;
                Ok(RunSummary {
                    run_id: RunId::from(row.run_id),
                    state,
                })
            })
            .collect()
    }
}
