//! Job entity model.

use serde::Serialize;
use sqlx::FromRow;
use telq_core::{JobId, Timestamp};

use super::status::JobStatus;

/// A row from the `jobs` table / record file.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub description: String,
}

/// Caller-supplied content for one new job; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub status: JobStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub description: String,
}
