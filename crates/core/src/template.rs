//! Description templating and CLI input validation.
//!
//! Pure functions used by the producer and consumer binaries. Validation
//! runs before any store is touched, so bad input never mutates the queue.

use crate::error::CoreError;
use crate::types::JobId;

/// Placeholder substituted with the assigned job id.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Default description template for newly enqueued jobs.
pub const DEFAULT_DESCRIPTION_TEMPLATE: &str = "Telephone conversation #{id}";

/// Render a job description, substituting every `{id}` occurrence.
pub fn render_description(template: &str, id: JobId) -> String {
    template.replace(ID_PLACEHOLDER, &id.to_string())
}

/// A job count must be a positive integer.
pub fn validate_job_count(count: i64) -> Result<(), CoreError> {
    if count <= 0 {
        return Err(CoreError::Validation(
            "count must be a positive integer".into(),
        ));
    }
    Ok(())
}

/// A duration flag (poll interval, work duration) must be a positive number
/// of seconds. Rejects NaN as well as zero and negatives.
pub fn validate_positive_seconds(name: &str, value: f64) -> Result<(), CoreError> {
    if !(value > 0.0) {
        return Err(CoreError::Validation(format!(
            "{name} must be a positive number of seconds"
        )));
    }
    Ok(())
}
