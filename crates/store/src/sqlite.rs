//! SQLite transactional backend.
//!
//! Jobs live in a single `jobs` table keyed by an auto-incrementing id,
//! with a secondary index on `status` so "find one pending job" stays
//! cheap. Writers are serialized with immediate-mode transactions: the
//! write lock is taken at `BEGIN`, before the read, so no other writer can
//! claim between a reservation's SELECT and its UPDATE. sqlx's `begin`
//! starts a deferred transaction, so the `BEGIN IMMEDIATE` is issued
//! explicitly on a pinned connection.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use telq_core::clock;
use telq_core::JobId;

use crate::error::StoreError;
use crate::models::job::{Job, NewJob};
use crate::models::status::JobStatus;
use crate::store::CompleteOutcome;

/// Column list for `jobs` queries.
const COLUMNS: &str = "id, status, created_at, updated_at, description";

const CREATE_TABLE: &str = "\
    CREATE TABLE IF NOT EXISTS jobs ( \
        id          INTEGER PRIMARY KEY AUTOINCREMENT, \
        status      TEXT    NOT NULL, \
        created_at  TEXT    NOT NULL, \
        updated_at  TEXT    NOT NULL, \
        description TEXT    NOT NULL \
    )";

const CREATE_STATUS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status)";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url` and ensure the schema.
    ///
    /// The database file is created if missing, so a store deleted
    /// out-of-band comes back empty on the next run instead of failing.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, ensuring the schema. Used by tests.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_STATUS_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    /// Append `count` jobs with consecutive store-assigned ids.
    ///
    /// `build` is called once per job with the id it will receive. The
    /// batch is atomic: any failure rolls the whole insert back.
    pub async fn create_jobs(
        &self,
        count: usize,
        mut build: impl FnMut(JobId) -> NewJob,
    ) -> Result<Vec<JobId>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        match insert_batch(&mut conn, count, &mut build).await {
            Ok(ids) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(ids)
            }
            Err(err) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(err)
            }
        }
    }

    /// Claim the lowest-id pending job, if any.
    ///
    /// Select and conditional update run inside one immediate-mode
    /// transaction; the update re-checks `status = 'pending'` and a
    /// zero-row result is treated as "no job available".
    pub async fn reserve_next(&self) -> Result<Option<Job>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        match reserve_in_tx(&mut conn).await {
            Ok(Some(job)) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(Some(job))
            }
            Ok(None) => {
                sqlx::query("ROLLBACK").execute(&mut *conn).await?;
                Ok(None)
            }
            Err(err) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(err)
            }
        }
    }

    /// Complete a claimed job.
    ///
    /// Requires the job to be `in_progress`; a missing id or any other
    /// current status leaves the store unchanged and is reported through
    /// the outcome rather than as an error.
    pub async fn mark_done(&self, id: JobId) -> Result<CompleteOutcome, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        match complete_in_tx(&mut conn, id).await {
            Ok(outcome) => {
                let end = if outcome == CompleteOutcome::Completed {
                    "COMMIT"
                } else {
                    "ROLLBACK"
                };
                sqlx::query(end).execute(&mut *conn).await?;
                Ok(outcome)
            }
            Err(err) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(err)
            }
        }
    }

    /// All records in id order.
    pub async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs ORDER BY id ASC");
        Ok(sqlx::query_as::<_, Job>(&query)
            .fetch_all(&self.pool)
            .await?)
    }
}

async fn insert_batch(
    conn: &mut SqliteConnection,
    count: usize,
    build: &mut impl FnMut(JobId) -> NewJob,
) -> Result<Vec<JobId>, StoreError> {
    let max: Option<JobId> = sqlx::query_scalar("SELECT MAX(id) FROM jobs")
        .fetch_one(&mut *conn)
        .await?;
    let mut next_id = max.unwrap_or(0) + 1;
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let content = build(next_id);
        sqlx::query(
            "INSERT INTO jobs (id, status, created_at, updated_at, description) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(next_id)
        .bind(content.status)
        .bind(content.created_at)
        .bind(content.updated_at)
        .bind(&content.description)
        .execute(&mut *conn)
        .await?;
        ids.push(next_id);
        next_id += 1;
    }
    Ok(ids)
}

async fn reserve_in_tx(conn: &mut SqliteConnection) -> Result<Option<Job>, StoreError> {
    let query = format!(
        "SELECT {COLUMNS} FROM jobs WHERE status = ? ORDER BY id ASC LIMIT 1"
    );
    let Some(job) = sqlx::query_as::<_, Job>(&query)
        .bind(JobStatus::Pending)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let updated_at = clock::utc_now();
    let updated =
        sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(JobStatus::InProgress)
            .bind(updated_at)
            .bind(job.id)
            .bind(JobStatus::Pending)
            .execute(&mut *conn)
            .await?;
    if updated.rows_affected() == 0 {
        // Lost race; should not occur under immediate-mode locking.
        tracing::warn!(job_id = job.id, "conditional claim affected no rows");
        return Ok(None);
    }

    Ok(Some(Job {
        status: JobStatus::InProgress,
        updated_at,
        ..job
    }))
}

async fn complete_in_tx(
    conn: &mut SqliteConnection,
    id: JobId,
) -> Result<CompleteOutcome, StoreError> {
    let Some(status) = sqlx::query_scalar::<_, JobStatus>("SELECT status FROM jobs WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(CompleteOutcome::NotFound);
    };
    if status != JobStatus::InProgress {
        return Ok(CompleteOutcome::InvalidStatus(status));
    }

    let updated =
        sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(JobStatus::Done)
            .bind(clock::utc_now())
            .bind(id)
            .bind(JobStatus::InProgress)
            .execute(&mut *conn)
            .await?;
    if updated.rows_affected() == 0 {
        // Should not occur: the row was read in this same transaction.
        tracing::warn!(job_id = id, "conditional completion affected no rows");
        return Ok(CompleteOutcome::InvalidStatus(status));
    }
    Ok(CompleteOutcome::Completed)
}
