// Lease status and term helpers
use crate::models::{LeaseRecord, LeaseStatus};
use chrono::{DateTime, Utc};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Classify a lease at `now`.
///
/// A server-side `terminated` status wins; otherwise the dates decide. A
/// lease whose end date cannot be read is treated as expired.
pub fn lease_status(
    lease: &LeaseRecord,
    now: DateTime<Utc>,
    threshold_minutes: i64,
) -> LeaseStatus {
    if lease
        .server_status()
        .is_some_and(|s| s.eq_ignore_ascii_case("terminated"))
    {
        return LeaseStatus::Terminated;
    }

    let Some(end) = lease.end_at() else {
        return LeaseStatus::Expired;
    };

    if end <= now {
        return LeaseStatus::Expired;
    }

    if lease.start_at().is_some_and(|start| start > now) {
        return LeaseStatus::Upcoming;
    }

    if is_expiring_soon(&end, now, threshold_minutes) {
        LeaseStatus::Expiring
    } else {
        LeaseStatus::Active
    }
}

pub fn is_expiring_soon(
    expires_at: &DateTime<Utc>,
    now: DateTime<Utc>,
    threshold_minutes: i64,
) -> bool {
    let remaining = *expires_at - now;
    remaining > chrono::Duration::zero()
        && remaining < chrono::Duration::minutes(threshold_minutes)
}

/// Lease length in whole days, rounded to the nearest day
pub fn term_days(lease: &LeaseRecord) -> Option<i64> {
    let start = lease.start_at()?;
    let end = lease.end_at()?;
    let diff = (end - start).num_milliseconds() as f64;
    Some((diff / MS_PER_DAY).round() as i64)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StatusCounts {
    pub upcoming: usize,
    pub active: usize,
    pub expiring: usize,
    pub expired: usize,
    pub terminated: usize,
}

impl StatusCounts {
    pub fn tally<'a>(
        leases: impl IntoIterator<Item = &'a LeaseRecord>,
        now: DateTime<Utc>,
        threshold_minutes: i64,
    ) -> Self {
        let mut counts = Self::default();
        for lease in leases {
            match lease_status(lease, now, threshold_minutes) {
                LeaseStatus::Upcoming => counts.upcoming += 1,
                LeaseStatus::Active => counts.active += 1,
                LeaseStatus::Expiring => counts.expiring += 1,
                LeaseStatus::Expired => counts.expired += 1,
                LeaseStatus::Terminated => counts.terminated += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.upcoming + self.active + self.expiring + self.expired + self.terminated
    }
}
