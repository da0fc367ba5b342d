/// Job ids are store-assigned, positive, and monotonically increasing.
pub type JobId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
