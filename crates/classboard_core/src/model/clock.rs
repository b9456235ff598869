//! Audit timestamp source.
//!
//! # Invariants
//! - Timestamps are UTC ISO-8601 with microsecond precision and a `Z` suffix,
//!   so lexical order equals chronological order.
//! - Within one process no two calls to `now_timestamp` return the same value.

use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_ISSUED_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Returns the next audit timestamp, strictly after any previously issued one.
pub fn now_timestamp() -> String {
    format_micros(next_micros(Utc::now().timestamp_micros()))
}

/// Parses a stored audit timestamp.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn next_micros(wall_clock: i64) -> i64 {
    let mut last = LAST_ISSUED_MICROS.load(Ordering::Acquire);
    loop {
        let candidate = if wall_clock > last { wall_clock } else { last + 1 };
        match LAST_ISSUED_MICROS.compare_exchange_weak(
            last,
            candidate,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return candidate,
            Err(observed) => last = observed,
        }
    }
}

fn format_micros(micros: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::{now_timestamp, parse_timestamp};

    #[test]
    fn successive_stamps_strictly_increase() {
        let mut previous = now_timestamp();
        for _ in 0..1_000 {
            let next = now_timestamp();
            assert!(next > previous, "{next} should sort after {previous}");
            previous = next;
        }
    }

    #[test]
    fn stamps_round_trip_through_parser() {
        let stamp = now_timestamp();
        assert!(stamp.ends_with('Z'));
        assert!(parse_timestamp(&stamp).is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
