//! Backend dispatch.

use telq_core::JobId;

use crate::config::{Backend, StoreConfig};
use crate::error::StoreError;
use crate::file::FileStore;
use crate::models::job::{Job, NewJob};
use crate::models::status::JobStatus;
use crate::sqlite::SqliteStore;

/// Result of attempting to complete a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// The job moved in_progress -> done.
    Completed,
    /// No job with that id exists, e.g. it was deleted out-of-band.
    NotFound,
    /// The job exists but is not in_progress; nothing was changed.
    InvalidStatus(JobStatus),
}

/// A handle to whichever backend the configuration selected.
///
/// Constructed once at process start and passed by reference to every
/// operation; there is no ambient global store state.
pub enum Store {
    File(FileStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        match &config.backend {
            Backend::File { queue_path } => Ok(Store::File(FileStore::new(queue_path))),
            Backend::Sqlite { url } => Ok(Store::Sqlite(SqliteStore::connect(url).await?)),
        }
    }

    /// Append `count` jobs with consecutive store-assigned ids; `build`
    /// receives each final id. Atomic: all `count` insert or none do.
    pub async fn create_jobs(
        &self,
        count: usize,
        build: impl FnMut(JobId) -> NewJob,
    ) -> Result<Vec<JobId>, StoreError> {
        match self {
            Store::File(store) => store.create_jobs(count, build).await,
            Store::Sqlite(store) => store.create_jobs(count, build).await,
        }
    }

    /// Claim the lowest-id pending job, or `None` if nothing is pending.
    pub async fn reserve_next(&self) -> Result<Option<Job>, StoreError> {
        match self {
            Store::File(store) => store.reserve_next().await,
            Store::Sqlite(store) => store.reserve_next().await,
        }
    }

    /// Complete a claimed job; see [`CompleteOutcome`].
    pub async fn mark_done(&self, id: JobId) -> Result<CompleteOutcome, StoreError> {
        match self {
            Store::File(store) => store.mark_done(id).await,
            Store::Sqlite(store) => store.mark_done(id).await,
        }
    }

    /// All records in id order.
    pub async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        match self {
            Store::File(store) => store.list_jobs().await,
            Store::Sqlite(store) => store.list_jobs().await,
        }
    }
}
