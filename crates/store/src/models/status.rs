//! Job lifecycle status.
//!
//! Both backends persist the status word itself (`pending`, `in_progress`,
//! `done`), so the textual form here is a wire format, not a display nicety.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Lifecycle status of a queued job.
///
/// Transitions are monotonic: pending -> in_progress -> done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, not yet claimed by any consumer.
    Pending,
    /// Claimed by exactly one consumer, work assumed underway.
    InProgress,
    /// Completed; terminal.
    Done,
}

impl JobStatus {
    /// The persisted status word.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Done => "done",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "in_progress" => Ok(JobStatus::InProgress),
            "done" => Ok(JobStatus::Done),
            other => Err(format!(
                "unknown job status `{other}`, expected `pending`, `in_progress`, or `done`"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_words_match_persisted_form() {
        assert_eq!(JobStatus::Pending.as_str(), "pending");
        assert_eq!(JobStatus::InProgress.as_str(), "in_progress");
        assert_eq!(JobStatus::Done.as_str(), "done");
    }

    #[test]
    fn parse_round_trip() {
        for status in [JobStatus::Pending, JobStatus::InProgress, JobStatus::Done] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn parse_rejects_unknown_words() {
        assert!("running".parse::<JobStatus>().is_err());
        assert!("".parse::<JobStatus>().is_err());
    }
}
