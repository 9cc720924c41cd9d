use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// A lease as delivered by the backend.
///
/// Only `endDate` matters to the countdown. Every other field is kept
/// verbatim so it can be handed back to whoever renders the lease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseRecord {
    fields: Map<String, Value>,
}

#[cfg(test)]
impl LeaseRecord {
    /// Create a record holding only an end date
    pub fn new(end_date: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("endDate".to_string(), Value::String(end_date.into()));
        Self { fields }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

impl LeaseRecord {
    /// Wrap a JSON value, returning `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Raw `endDate`, if present and a string
    pub fn end_date(&self) -> Option<&str> {
        self.get("endDate").and_then(Value::as_str)
    }

    pub fn start_date(&self) -> Option<&str> {
        self.get("startDate").and_then(Value::as_str)
    }

    /// Backend identifier (`_id`, falling back to `id`)
    pub fn id(&self) -> Option<&str> {
        self.get("_id")
            .or_else(|| self.get("id"))
            .and_then(Value::as_str)
    }

    /// Status string as reported by the server, if any
    pub fn server_status(&self) -> Option<&str> {
        self.get("status").and_then(Value::as_str)
    }

    fn first_car(&self) -> Option<&Map<String, Value>> {
        self.get("carDetails")
            .and_then(Value::as_array)
            .and_then(|cars| cars.first())
            .and_then(Value::as_object)
    }

    pub fn car_model(&self) -> Option<&str> {
        self.first_car()
            .and_then(|car| car.get("modelName"))
            .and_then(Value::as_str)
    }

    pub fn car_brand(&self) -> Option<&str> {
        self.first_car()
            .and_then(|car| car.get("brand"))
            .and_then(Value::as_str)
    }

    /// Parsed end date; `None` when missing or malformed
    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        self.end_date().and_then(crate::countdown::parse_timestamp)
    }

    pub fn start_at(&self) -> Option<DateTime<Utc>> {
        self.start_date().and_then(crate::countdown::parse_timestamp)
    }

    /// Display name used by the UI and text output
    pub fn display_name(&self) -> String {
        match (self.car_brand(), self.car_model()) {
            (Some(brand), Some(model)) => format!("{} {}", capitalize(brand), capitalize(model)),
            (None, Some(model)) => capitalize(model),
            (Some(brand), None) => capitalize(brand),
            (None, None) => self.id().unwrap_or("lease").to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Time left until a lease ends, split into two-digit display fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownBreakdown {
    pub days: String,
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

impl CountdownBreakdown {
    pub fn zero() -> Self {
        Self {
            days: "00".to_string(),
            hours: "00".to_string(),
            minutes: "00".to_string(),
            seconds: "00".to_string(),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

impl std::fmt::Display for CountdownBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}d {}:{}:{}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// A lease together with its countdown for the current tick
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedLease {
    pub lease: LeaseRecord,
    pub countdown: CountdownBreakdown,
}

// Serialized flat: the lease's own fields, then `countdown`. A `countdown`
// field already on the lease is replaced rather than duplicated.
impl Serialize for AnnotatedLease {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.lease.fields();
        let len = fields.len() + usize::from(!fields.contains_key("countdown"));
        let mut map = serializer.serialize_map(Some(len))?;
        for (key, value) in fields.iter().filter(|(key, _)| *key != "countdown") {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("countdown", &self.countdown)?;
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseStatus {
    Upcoming,
    Active,
    Expiring,
    Expired,
    Terminated,
}

impl LeaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            LeaseStatus::Upcoming => "UPCOMING",
            LeaseStatus::Active => "ACTIVE",
            LeaseStatus::Expiring => "EXPIRING",
            LeaseStatus::Expired => "EXPIRED",
            LeaseStatus::Terminated => "TERMINATED",
        }
    }
}
