//! Cross-process advisory locking via exclusive file creation.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::StoreError;

/// Delay between acquisition attempts while the marker is held elsewhere.
pub const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Advisory lock keyed by a well-known filesystem path.
///
/// Whoever wins the atomic create of the marker file holds the lock. There
/// is no timeout and no deadlock detection: a holder that crashes without
/// releasing starves every other participant until the marker is removed
/// manually. This is an accepted limitation of the design.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
    retry_delay: Duration,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retry_delay: LOCK_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(path: impl Into<PathBuf>, retry_delay: Duration) -> Self {
        Self {
            path: path.into(),
            retry_delay,
        }
    }

    /// Block until the lock is acquired. Retries indefinitely.
    pub async fn acquire(&self) -> Result<FileLockGuard, StoreError> {
        loop {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
                .await
            {
                Ok(_) => {
                    return Ok(FileLockGuard {
                        path: self.path.clone(),
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::trace!(path = %self.path.display(), "lock marker held, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// A held lock. Dropping the guard releases it, so release happens on every
/// exit path of the scope that acquired it.
#[derive(Debug)]
pub struct FileLockGuard {
    path: PathBuf,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        // An already-removed marker is a no-op release.
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), %err, "failed to remove lock marker");
            }
        }
    }
}
