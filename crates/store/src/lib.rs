//! Durable job storage and the reservation protocol.
//!
//! Two interchangeable backends persist the queue:
//!
//! - [`FileStore`] -- a flat CSV record file; every read-modify-write runs
//!   inside one [`FileLock`] scope, so all access is serialized through a
//!   single coarse cross-process lock.
//! - [`SqliteStore`] -- a single `jobs` table; writers are serialized with
//!   immediate-mode transactions instead of an external lock.
//!
//! Both guarantee that no two concurrent callers can reserve the same job
//! and that no partial state transition is ever persisted. [`Store`]
//! dispatches to whichever backend [`StoreConfig`] selects.

pub mod config;
pub mod error;
pub mod file;
pub mod lock;
pub mod models;
pub mod sqlite;
mod store;

pub use config::{Backend, StoreConfig};
pub use error::StoreError;
pub use file::FileStore;
pub use lock::{FileLock, FileLockGuard};
pub use models::job::{Job, NewJob};
pub use models::status::JobStatus;
pub use sqlite::SqliteStore;
pub use store::{CompleteOutcome, Store};
