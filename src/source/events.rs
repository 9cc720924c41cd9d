use crate::error::{LeaseError, Result};
use crate::models::LeaseRecord;
use serde::Deserialize;
use std::path::Path;

/// Push notifications from the lease feed
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "lease")]
pub enum LeaseEvent {
    /// A new lease was signed; it goes to the top of the list
    #[serde(rename = "leaseCreated")]
    Created(LeaseRecord),
    /// A lease was extended; the old entry leaves the active list
    #[serde(rename = "leaseExtended")]
    Extended(LeaseRecord),
}

impl LeaseEvent {
    pub fn apply(&self, leases: &mut Vec<LeaseRecord>) {
        match self {
            LeaseEvent::Created(lease) => {
                tracing::debug!("Lease created: {:?}", lease.id());
                leases.insert(0, lease.clone());
            }
            LeaseEvent::Extended(updated) => {
                let Some(id) = updated.id() else {
                    tracing::warn!("Ignoring leaseExtended event without an id");
                    return;
                };
                let before = leases.len();
                leases.retain(|lease| lease.id() != Some(id));
                tracing::debug!(
                    "Lease {} extended, removed {} entries",
                    id,
                    before - leases.len()
                );
            }
        }
    }
}

/// Parse newline-delimited JSON events. Blank lines are ignored.
pub fn parse_events(contents: &str) -> Result<Vec<LeaseEvent>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map_err(|e| LeaseError::InvalidEvent(format!("line {}: {}", index + 1, e)))
        })
        .collect()
}

pub fn load_events(path: &Path) -> Result<Vec<LeaseEvent>> {
    let contents = std::fs::read_to_string(path)?;
    parse_events(&contents)
}
