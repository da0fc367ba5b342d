//! CSV record-file backend.
//!
//! The entire job set lives in one delimited file with a fixed header row.
//! Every mutation loads the full record set, changes it in memory, and
//! rewrites the file, synced to disk before the call returns. Each
//! read-modify-write runs inside one [`FileLock`] scope, so all access to
//! the file is serialized through the single coarse cross-process lock.

use std::path::{Path, PathBuf};

use telq_core::clock;
use telq_core::JobId;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::lock::FileLock;
use crate::models::job::{Job, NewJob};
use crate::models::status::JobStatus;
use crate::store::CompleteOutcome;

/// Header row of the record file.
const HEADER: &str = "id,status,created_at,updated_at,description";

const FIELD_COUNT: usize = 5;

pub struct FileStore {
    queue_path: PathBuf,
    lock: FileLock,
}

impl FileStore {
    /// Open a store over `queue_path`. The lock marker lives next to it as
    /// `<queue_path>.lock` and must not exist between operations.
    pub fn new(queue_path: impl Into<PathBuf>) -> Self {
        let queue_path = queue_path.into();
        let lock = FileLock::new(lock_path_for(&queue_path));
        Self { queue_path, lock }
    }

    pub fn queue_path(&self) -> &Path {
        &self.queue_path
    }

    /// Create the record file with its header if absent. Idempotent; each
    /// operation invokes it inside its lock scope before reading.
    pub async fn ensure_file(&self) -> Result<(), StoreError> {
        if tokio::fs::try_exists(&self.queue_path).await? {
            return Ok(());
        }
        self.write_all(&[]).await
    }

    /// Append `count` jobs with consecutive store-assigned ids.
    ///
    /// `build` is called once per job with the id it will receive, so
    /// descriptions can embed the final id. The whole batch lands in a
    /// single rewrite: either all records persist or none do.
    pub async fn create_jobs(
        &self,
        count: usize,
        mut build: impl FnMut(JobId) -> NewJob,
    ) -> Result<Vec<JobId>, StoreError> {
        let _guard = self.lock.acquire().await?;
        self.ensure_file().await?;
        let mut jobs = self.read_all().await?;
        let mut next_id = jobs.iter().map(|job| job.id).max().unwrap_or(0) + 1;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let content = build(next_id);
            jobs.push(Job {
                id: next_id,
                status: content.status,
                created_at: content.created_at,
                updated_at: content.updated_at,
                description: content.description,
            });
            ids.push(next_id);
            next_id += 1;
        }
        self.write_all(&jobs).await?;
        Ok(ids)
    }

    /// Claim the first pending job in stored order, if any.
    ///
    /// Runs entirely under the lock: no two concurrent callers can observe
    /// and claim the same record. Returns `None` without mutating the store
    /// when nothing is pending.
    pub async fn reserve_next(&self) -> Result<Option<Job>, StoreError> {
        let _guard = self.lock.acquire().await?;
        self.ensure_file().await?;
        let mut jobs = self.read_all().await?;
        let Some(job) = jobs
            .iter_mut()
            .find(|job| job.status == JobStatus::Pending)
        else {
            return Ok(None);
        };
        job.status = JobStatus::InProgress;
        job.updated_at = clock::utc_now();
        let claimed = job.clone();
        self.write_all(&jobs).await?;
        Ok(Some(claimed))
    }

    /// Complete a claimed job.
    ///
    /// Requires the job to be `in_progress`; a missing id or any other
    /// current status leaves the store unchanged and is reported through
    /// the outcome rather than as an error.
    pub async fn mark_done(&self, id: JobId) -> Result<CompleteOutcome, StoreError> {
        let _guard = self.lock.acquire().await?;
        self.ensure_file().await?;
        let mut jobs = self.read_all().await?;
        let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
            return Ok(CompleteOutcome::NotFound);
        };
        if job.status != JobStatus::InProgress {
            return Ok(CompleteOutcome::InvalidStatus(job.status));
        }
        job.status = JobStatus::Done;
        job.updated_at = clock::utc_now();
        self.write_all(&jobs).await?;
        Ok(CompleteOutcome::Completed)
    }

    /// All records in stored (id) order.
    pub async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let _guard = self.lock.acquire().await?;
        self.ensure_file().await?;
        self.read_all().await
    }

    async fn read_all(&self) -> Result<Vec<Job>, StoreError> {
        let text = tokio::fs::read_to_string(&self.queue_path).await?;
        parse_records(&self.queue_path, &text)
    }

    async fn write_all(&self, jobs: &[Job]) -> Result<(), StoreError> {
        let mut out = String::with_capacity(64 * (jobs.len() + 1));
        out.push_str(HEADER);
        out.push('\n');
        for job in jobs {
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                job.id,
                job.status.as_str(),
                clock::format_timestamp(job.created_at),
                clock::format_timestamp(job.updated_at),
                csv_escape(&job.description),
            ));
        }
        let mut file = tokio::fs::File::create(&self.queue_path).await?;
        file.write_all(out.as_bytes()).await?;
        // Durable before we return; callers may observe the file from
        // another process as soon as the lock is released.
        file.sync_all().await?;
        Ok(())
    }
}

fn lock_path_for(queue_path: &Path) -> PathBuf {
    let mut name = queue_path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    queue_path.with_file_name(name)
}

fn corrupt(path: &Path, line: usize, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

fn parse_records(path: &Path, text: &str) -> Result<Vec<Job>, StoreError> {
    let mut records = split_records(text).into_iter().enumerate();
    let Some((_, header)) = records.next() else {
        return Err(corrupt(path, 1, "missing header row"));
    };
    if header != HEADER {
        return Err(corrupt(path, 1, format!("unexpected header `{header}`")));
    }

    let mut jobs = Vec::new();
    for (index, record) in records {
        if record.trim().is_empty() {
            continue;
        }
        let line = index + 1;
        let fields = split_record_line(&record);
        if fields.len() != FIELD_COUNT {
            return Err(corrupt(
                path,
                line,
                format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
            ));
        }
        let id: JobId = fields[0]
            .parse()
            .map_err(|_| corrupt(path, line, format!("invalid id `{}`", fields[0])))?;
        let status: JobStatus = fields[1]
            .parse()
            .map_err(|reason: String| corrupt(path, line, reason))?;
        let created_at = clock::parse_timestamp(&fields[2])
            .map_err(|err| corrupt(path, line, format!("invalid created_at: {err}")))?;
        let updated_at = clock::parse_timestamp(&fields[3])
            .map_err(|err| corrupt(path, line, format!("invalid updated_at: {err}")))?;
        jobs.push(Job {
            id,
            status,
            created_at,
            updated_at,
            description: fields[4].clone(),
        });
    }
    Ok(jobs)
}

/// Escape a field for the record file: wrap in quotes if it contains a
/// comma, quote, or newline.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Split the file into physical records, honoring quoted fields that span
/// line breaks.
fn split_records(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in text.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '\n' if !in_quotes => {
                if current.ends_with('\r') {
                    current.pop();
                }
                records.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        records.push(current);
    }
    records
}

/// Split a single record into fields, handling quoting.
fn split_record_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    // Escaped quote.
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else if ch == '"' {
            in_quotes = true;
        } else if ch == ',' {
            result.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    result.push(current);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_leaves_plain_values_alone() {
        assert_eq!(csv_escape("Telephone conversation #1"), "Telephone conversation #1");
    }

    #[test]
    fn escape_quotes_commas_and_quotes() {
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn split_handles_quoted_fields() {
        assert_eq!(
            split_record_line("1,pending,\"a,b\",c"),
            vec!["1", "pending", "a,b", "c"]
        );
        assert_eq!(
            split_record_line("\"say \"\"hi\"\"\",x"),
            vec!["say \"hi\"", "x"]
        );
    }

    #[test]
    fn records_can_span_lines_when_quoted() {
        let records = split_records("h\n1,\"two\nlines\"\n");
        assert_eq!(records, vec!["h".to_string(), "1,\"two\nlines\"".to_string()]);
    }

    #[test]
    fn parse_rejects_bad_field_count() {
        let path = Path::new("jobs_queue.csv");
        let text = format!("{HEADER}\n1,pending,2026-08-07T10:00:00\n");
        assert!(matches!(
            parse_records(path, &text),
            Err(StoreError::Corrupt { line: 2, .. })
        ));
    }

    #[test]
    fn parse_rejects_unknown_status() {
        let path = Path::new("jobs_queue.csv");
        let text = format!(
            "{HEADER}\n1,running,2026-08-07T10:00:00,2026-08-07T10:00:00,x\n"
        );
        assert!(matches!(
            parse_records(path, &text),
            Err(StoreError::Corrupt { line: 2, .. })
        ));
    }

    #[test]
    fn parse_rejects_wrong_header() {
        let path = Path::new("jobs_queue.csv");
        assert!(matches!(
            parse_records(path, "id,status\n"),
            Err(StoreError::Corrupt { line: 1, .. })
        ));
    }
}
