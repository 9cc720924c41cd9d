// Lease countdown computation
pub mod clock;
pub mod engine;

pub use clock::{Clock, SystemClock};
pub use engine::{CountdownEngine, CountdownObserver};

use crate::models::{AnnotatedLease, CountdownBreakdown, LeaseRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

/// Parse a lease timestamp.
///
/// Accepts RFC 3339 and the shorter ISO 8601 forms around it: minute
/// precision, `+HHMM` offsets, a date-time without offset (taken as UTC), a
/// bare `YYYY-MM-DD` date and `YYYY-MM` (both at midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Offsets on minute-precision or colon-less forms, with `Z` as +00:00
    let zoned = raw.strip_suffix(['Z', 'z']).map(|s| format!("{}+00:00", s));
    let zoned = zoned.as_deref().unwrap_or(raw);
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(zoned, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    // Bare dates, or a year and month meaning the first of that month
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"))
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Break the time between `now_ms` and `end_ms` into display fields
pub fn breakdown_at(end_ms: i64, now_ms: i64) -> CountdownBreakdown {
    let diff = end_ms.saturating_sub(now_ms);
    if diff <= 0 {
        return CountdownBreakdown::zero();
    }

    CountdownBreakdown {
        days: format!("{:02}", diff / MS_PER_DAY),
        hours: format!("{:02}", (diff % MS_PER_DAY) / MS_PER_HOUR),
        minutes: format!("{:02}", (diff % MS_PER_HOUR) / MS_PER_MINUTE),
        seconds: format!("{:02}", (diff % MS_PER_MINUTE) / MS_PER_SECOND),
    }
}

/// Countdown for a raw `endDate` string. Unparseable dates count as expired.
pub fn countdown(end_date: &str, now: DateTime<Utc>) -> CountdownBreakdown {
    match parse_timestamp(end_date) {
        Some(end) => breakdown_at(end.timestamp_millis(), now.timestamp_millis()),
        None => {
            tracing::trace!("Unparseable endDate {:?}, treating as expired", end_date);
            CountdownBreakdown::zero()
        }
    }
}

fn countdown_for(lease: &LeaseRecord, now: DateTime<Utc>) -> CountdownBreakdown {
    match lease.end_date() {
        Some(end_date) => countdown(end_date, now),
        None => CountdownBreakdown::zero(),
    }
}

/// Annotate every lease with its countdown at `now`, keeping input order
pub fn annotate(leases: &[LeaseRecord], now: DateTime<Utc>) -> Vec<AnnotatedLease> {
    leases
        .iter()
        .map(|lease| AnnotatedLease {
            lease: lease.clone(),
            countdown: countdown_for(lease, now),
        })
        .collect()
}
