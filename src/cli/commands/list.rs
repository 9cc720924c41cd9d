use crate::cli::load_leases;
use crate::config::Config;
use crate::countdown::{annotate, Clock, SystemClock};
use crate::error::Result;
use crate::expiry::{lease_status, term_days};
use crate::models::AnnotatedLease;
use crate::search;
use chrono::{DateTime, Utc};
use std::fmt::Write;

pub fn execute(
    config: &Config,
    file: Option<std::path::PathBuf>,
    format: &str,
    query: Option<&str>,
) -> Result<()> {
    let leases = load_leases(file, config)?;
    let now = SystemClock.now();
    let annotated = annotate(&leases, now);
    let shown: Vec<&AnnotatedLease> =
        search::filter_annotated(&annotated, query.unwrap_or("")).collect();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        print!(
            "{}",
            render_text(&shown, now, config.countdown.expiring_threshold_minutes)
        );
    }

    Ok(())
}

fn render_text(
    leases: &[&AnnotatedLease],
    now: DateTime<Utc>,
    threshold_minutes: i64,
) -> String {
    let mut out = String::new();
    if leases.is_empty() {
        out.push_str("No leases found\n");
        return out;
    }

    let _ = writeln!(out, "Leases:\n");
    for annotated in leases {
        let lease = &annotated.lease;
        let term = term_days(lease).map_or_else(|| "-".to_string(), |days| format!("{}d", days));
        let _ = writeln!(
            out,
            "  {:<28} {:<10} {:>5} term, ends {:<26} {}",
            lease.display_name(),
            lease_status(lease, now, threshold_minutes).as_str(),
            term,
            lease.end_date().unwrap_or("-"),
            annotated.countdown
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeaseRecord;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_render_text() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let leases = vec![
            LeaseRecord::new("2025-06-02T13:01:01Z")
                .with_field("carDetails", json!([{ "modelName": "civic", "brand": "honda" }])),
            LeaseRecord::new("2025-05-01T00:00:00Z").with_field("startDate", "2025-04-01"),
        ];
        let annotated = annotate(&leases, now);
        let refs: Vec<_> = annotated.iter().collect();

        let text = render_text(&refs, now, 60);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Leases:");
        assert!(lines[2].contains("Honda Civic"));
        assert!(lines[2].contains("ACTIVE"));
        assert!(lines[2].ends_with("01d 01:01:01"));
        assert!(lines[2].contains(" - term"));
        assert!(lines[3].contains("EXPIRED"));
        assert!(lines[3].contains("30d term"));
        assert!(lines[3].ends_with("00d 00:00:00"));
    }

    #[test]
    fn test_render_text_empty() {
        assert_eq!(render_text(&[], Utc::now(), 60), "No leases found\n");
    }
}
