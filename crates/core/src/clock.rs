//! Second-precision UTC clock helpers.
//!
//! The queue stores timestamps in a sortable text form with whole-second
//! precision, so every stamp is truncated before it is handed to a store.

use chrono::{NaiveDateTime, SubsecRound, Utc};

use crate::types::Timestamp;

/// Text form carried by the record file: `2026-08-07T12:34:56`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Current UTC time truncated to whole seconds.
pub fn utc_now() -> Timestamp {
    Utc::now().trunc_subsecs(0)
}

/// Render a timestamp in the record-file text form.
pub fn format_timestamp(ts: Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a record-file timestamp back into UTC.
pub fn parse_timestamp(text: &str) -> Result<Timestamp, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_now_has_no_subsecond_part() {
        use chrono::Timelike;
        assert_eq!(utc_now().nanosecond(), 0);
    }

    #[test]
    fn format_parse_round_trip() {
        let now = utc_now();
        let text = format_timestamp(now);
        assert_eq!(parse_timestamp(&text).unwrap(), now);
    }

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let earlier = parse_timestamp("2026-08-07T09:59:59").unwrap();
        let later = parse_timestamp("2026-08-07T10:00:00").unwrap();
        assert!(earlier < later);
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("not-a-timestamp").is_err());
        assert!(parse_timestamp("2026-08-07").is_err());
    }
}
