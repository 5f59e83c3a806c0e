//! Raw probe payloads
//!
//! A probe source yields an untyped result in one of four shapes. The shape
//! is explicit here instead of being inferred downstream from whatever a
//! dictionary happens to contain; normalization consumes it immediately.

use serde_json::{Map, Value};

/// Untyped result of one probe resolution
///
/// Transient: produced by the source ladder, consumed by normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// No source was able to produce anything
    Empty,
    /// A single record, keyed by source field names
    Record(Map<String, Value>),
    /// A list payload; elements are records for query sources but may be
    /// bare scalars from shell fallbacks
    Rows(Vec<Value>),
    /// Unstructured stdout from a shell source
    Text(String),
}

impl RawValue {
    /// Render the canonical object shape for this payload
    ///
    /// `Empty` renders as `{}`, a record as itself, a list under `"items"`,
    /// and text under `"output"`. `Rows(vec![])` therefore renders as
    /// `{"items": []}`, "queried and found nothing", which stays
    /// distinguishable from `{}`, "no source available at all".
    #[must_use]
    pub fn into_payload(self) -> Map<String, Value> {
        match self {
            RawValue::Empty => Map::new(),
            RawValue::Record(map) => map,
            RawValue::Rows(rows) => {
                let mut map = Map::new();
                map.insert("items".to_string(), Value::Array(rows));
                map
            }
            RawValue::Text(text) => {
                let mut map = Map::new();
                map.insert("output".to_string(), Value::String(text));
                map
            }
        }
    }

    /// Shape name for log lines
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Empty => "empty",
            RawValue::Record(_) => "record",
            RawValue::Rows(_) => "rows",
            RawValue::Text(_) => "text",
        }
    }
}
