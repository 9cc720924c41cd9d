use crate::cli::load_leases;
use crate::config::Config;
use crate::countdown::{Clock, SystemClock};
use crate::error::Result;
use crate::expiry::StatusCounts;
use std::path::PathBuf;

pub fn execute(config: &Config, file: Option<PathBuf>, json: bool) -> Result<()> {
    let leases = load_leases(file, config)?;
    let counts = StatusCounts::tally(
        &leases,
        SystemClock.now(),
        config.countdown.expiring_threshold_minutes,
    );

    if json {
        println!("{}", serde_json::to_string(&counts)?);
    } else {
        println!("{}", summary(&counts));
    }

    Ok(())
}

fn summary(counts: &StatusCounts) -> String {
    if counts.total() == 0 {
        return "No leases found".to_string();
    }

    let mut parts = vec![format!("{} active", counts.active)];
    for (count, label) in [
        (counts.expiring, "expiring soon"),
        (counts.upcoming, "upcoming"),
        (counts.expired, "expired"),
        (counts.terminated, "terminated"),
    ] {
        if count > 0 {
            parts.push(format!("{} {}", count, label));
        }
    }
    format!("{} leases: {}", counts.total(), parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let counts = StatusCounts {
            active: 2,
            expiring: 1,
            expired: 3,
            ..Default::default()
        };
        assert_eq!(
            summary(&counts),
            "6 leases: 2 active, 1 expiring soon, 3 expired"
        );
        assert_eq!(summary(&StatusCounts::default()), "No leases found");
    }
}
