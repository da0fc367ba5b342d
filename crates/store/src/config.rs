//! Store selection from the environment.

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::error::StoreError;

pub const ENV_BACKEND: &str = "TELQ_BACKEND";
pub const ENV_QUEUE_FILE: &str = "TELQ_QUEUE_FILE";
pub const ENV_DATABASE_URL: &str = "TELQ_DATABASE_URL";

pub const DEFAULT_QUEUE_FILE: &str = "jobs_queue.csv";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://jobs_queue.db";

/// Which backend persists the queue.
#[derive(Debug, Clone)]
pub enum Backend {
    File { queue_path: PathBuf },
    Sqlite { url: String },
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::File { queue_path } => write!(f, "{}", queue_path.display()),
            Backend::Sqlite { url } => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: Backend,
}

impl StoreConfig {
    /// Read the backend selection from `TELQ_*` variables.
    ///
    /// Defaults to the file backend with the well-known queue filename, so
    /// the binaries work out of the box in a shared working directory.
    pub fn from_env() -> Result<Self, StoreError> {
        let backend = match env::var(ENV_BACKEND).as_deref() {
            Err(_) | Ok("file") => Backend::File {
                queue_path: env::var(ENV_QUEUE_FILE)
                    .unwrap_or_else(|_| DEFAULT_QUEUE_FILE.into())
                    .into(),
            },
            Ok("sqlite") => Backend::Sqlite {
                url: env::var(ENV_DATABASE_URL).unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
            },
            Ok(other) => {
                return Err(StoreError::Config(format!(
                    "unknown {ENV_BACKEND} value `{other}`, expected `file` or `sqlite`"
                )));
            }
        };
        Ok(Self { backend })
    }
}
