// Lease source: JSON files as saved from the leasing API
pub mod events;

use crate::error::{LeaseError, Result};
use crate::models::LeaseRecord;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Envelope keys the API wraps lease lists in
const ENVELOPE_KEYS: [&str; 3] = ["lease", "leases", "data"];

/// Load leases from a JSON file
pub fn load_leases(path: &Path) -> Result<Vec<LeaseRecord>> {
    tracing::debug!("Loading leases from: {}", path.display());

    let contents = fs::read_to_string(path).map_err(|e| {
        LeaseError::SourceError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let leases = parse_leases(&contents)?;
    tracing::info!("Loaded {} leases from {}", leases.len(), path.display());
    Ok(leases)
}

/// Parse a lease list from either a bare JSON array or an API envelope
/// such as `{"lease": [...]}`
pub fn parse_leases(contents: &str) -> Result<Vec<LeaseRecord>> {
    let value: Value = serde_json::from_str(contents)?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(entries)) => Some(entries),
                _ => None,
            })
            .ok_or_else(|| {
                LeaseError::SourceError(format!(
                    "Expected a lease array or an object with one of: {}",
                    ENVELOPE_KEYS.join(", ")
                ))
            })?,
        _ => {
            return Err(LeaseError::SourceError(
                "Expected a lease array or object".to_string(),
            ))
        }
    };

    let mut leases = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match LeaseRecord::from_value(entry) {
            Some(lease) => leases.push(lease),
            None => tracing::warn!("Skipping lease entry {}: not a JSON object", index),
        }
    }

    Ok(leases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_bare_array() {
        let leases = parse_leases(
            r#"[{"_id":"a","endDate":"2025-01-01T00:00:00Z"},{"_id":"b","endDate":"x"}]"#,
        )
        .unwrap();
        assert_eq!(leases.len(), 2);
        assert_eq!(leases[0].id(), Some("a"));
        assert_eq!(leases[1].end_date(), Some("x"));
    }

    #[test]
    fn test_parse_envelopes() {
        for key in ["lease", "leases", "data"] {
            let json = format!(r#"{{"success":true,"{key}":[{{"endDate":"2025-01-01"}}]}}"#);
            let leases = parse_leases(&json).unwrap();
            assert_eq!(leases.len(), 1, "envelope key {key}");
        }
    }

    #[test]
    fn test_parse_skips_non_objects() {
        let leases = parse_leases(r#"[{"endDate":"2025-01-01"}, 42, "x", null]"#).unwrap();
        assert_eq!(leases.len(), 1);
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_leases("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_shapes() {
        assert!(matches!(
            parse_leases(r#"{"items":[]}"#),
            Err(LeaseError::SourceError(_))
        ));
        assert!(matches!(parse_leases("42"), Err(LeaseError::SourceError(_))));
        assert!(matches!(parse_leases("{oops"), Err(LeaseError::Json(_))));
    }

    #[test]
    fn test_load_leases_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"lease":[{{"_id":"a","endDate":"2030-01-01T00:00:00Z","carDetails":[{{"modelName":"civic","brand":"honda"}}]}}]}}"#
        )
        .unwrap();

        let leases = load_leases(file.path()).unwrap();
        assert_eq!(leases.len(), 1);
        assert_eq!(leases[0].car_model(), Some("civic"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_leases(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(LeaseError::SourceError(_))));
    }
}
