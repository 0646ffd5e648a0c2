//! Time helpers.
//!
//! Steam's API works in unix seconds; everything the core stores or compares is normalized to
//! [`ServerTime`] so offer ages and poll cutoffs are never accidentally compared across units.

use std::time::{SystemTime, UNIX_EPOCH};
use chrono::{DateTime, Utc};

/// The datetime format used for requests and responses.
pub type ServerTime = DateTime<Utc>;

/// Converts a unix timestamp (seconds) into a [`ServerTime`].
pub fn timestamp_to_server_time(timestamp: i64) -> ServerTime {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}

/// The current time as a unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0)
}

/// The current time as a [`ServerTime`].
pub fn now() -> ServerTime {
    Utc::now()
}

/// Seconds elapsed between `date` and now. Negative if `date` is in the future.
pub fn seconds_since(date: ServerTime) -> i64 {
    now_timestamp() - date.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_timestamp() {
        let date = timestamp_to_server_time(1_700_000_000);

        assert_eq!(date.timestamp(), 1_700_000_000);
    }

    #[test]
    fn seconds_since_is_nonnegative_for_past_dates() {
        let date = timestamp_to_server_time(now_timestamp() - 90);

        assert!(seconds_since(date) >= 90);
    }
}
