//! Result normalization
//!
//! One reusable routine turns whatever shape a source produced into a
//! fully-typed fact bundle: for each declared field, walk the canonical
//! name and its aliases against the payload, coerce the first hit to the
//! target type, and fall back to the type's zero value. Defaulting is
//! total: a bundle always carries every declared field, and a defaulted
//! field is a debug-level event, not an error.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::probe::{FieldKind, FieldSpec, Probe};
use crate::raw::RawValue;

/// Typed value of one canonical field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FactValue {
    /// Boolean fact
    Bool(bool),
    /// Integer fact
    Int(i64),
    /// ISO-8601 UTC timestamp; empty when unresolved
    Timestamp(String),
    /// Text fact
    Text(String),
    /// Passthrough list of raw records
    Rows(Vec<Value>),
}

impl FactValue {
    /// Zero value for a declared kind
    #[must_use]
    pub fn default_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Bool => FactValue::Bool(false),
            FieldKind::Int => FactValue::Int(0),
            FieldKind::Timestamp => FactValue::Timestamp(String::new()),
            FieldKind::Text => FactValue::Text(String::new()),
            FieldKind::Rows => FactValue::Rows(Vec::new()),
        }
    }

    /// Boolean content, if this is a boolean fact
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FactValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer content, if this is an integer fact
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FactValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Check if this value is its kind's zero-ish "nothing here" form
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            FactValue::Bool(_) | FactValue::Int(_) => false,
            FactValue::Timestamp(s) | FactValue::Text(s) => s.is_empty(),
            FactValue::Rows(rows) => rows.is_empty(),
        }
    }
}

/// Canonical, fully-typed field map for one probe
///
/// Every field the probe declared is present; unresolved fields hold their
/// kind's zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FactBundle {
    fields: BTreeMap<String, FactValue>,
}

impl FactBundle {
    /// Create an empty bundle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle holding every declared field at its zero value
    #[must_use]
    pub fn defaults_for(probe: &Probe) -> Self {
        let mut bundle = Self::new();
        for spec in &probe.fields {
            bundle.insert(spec.name.clone(), FactValue::default_for(spec.kind));
        }
        bundle
    }

    /// Set a field
    pub fn insert(&mut self, name: impl Into<String>, value: FactValue) {
        self.fields.insert(name.into(), value);
    }

    /// Look up a field
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FactValue> {
        self.fields.get(name)
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the bundle carries no fields at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FactValue)> {
        self.fields.iter()
    }
}

/// Normalize a raw payload into the probe's declared fields
pub fn normalize(probe: &Probe, raw: RawValue) -> FactBundle {
    let payload = raw.into_payload();
    let mut bundle = FactBundle::new();

    for spec in &probe.fields {
        match resolve_field(&payload, spec) {
            Some(value) => bundle.insert(spec.name.clone(), value),
            None => {
                debug!(
                    probe = %probe.id,
                    field = %spec.name,
                    "field unresolved, using default"
                );
                bundle.insert(spec.name.clone(), FactValue::default_for(spec.kind));
            }
        }
    }

    bundle
}

/// Walk canonical name then aliases; coerce the first present value
fn resolve_field(payload: &Map<String, Value>, spec: &FieldSpec) -> Option<FactValue> {
    std::iter::once(spec.name.as_str())
        .chain(spec.aliases.iter().map(String::as_str))
        .filter_map(|key| payload.get(key))
        .find(|value| !value.is_null())
        .and_then(|value| coerce(spec.kind, value))
}

/// Coerce one present value to a target kind
///
/// Booleans never fail: any present value is either truthy or falsy. The
/// other kinds return `None` for shapes they cannot carry, which the
/// caller turns into the kind's zero value.
fn coerce(kind: FieldKind, value: &Value) -> Option<FactValue> {
    match kind {
        FieldKind::Bool => Some(FactValue::Bool(is_truthy(value))),
        FieldKind::Int => coerce_int(value).map(FactValue::Int),
        FieldKind::Timestamp => coerce_timestamp(value).map(FactValue::Timestamp),
        FieldKind::Text => coerce_text(value).map(FactValue::Text),
        FieldKind::Rows => value.as_array().map(|rows| FactValue::Rows(rows.clone())),
    }
}

/// Truthy inputs: `"1"`, `"true"`, native `true`; everything else is false
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "1" || s == "true",
        _ => false,
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse an epoch (integer or fractional, number or numeric string) or an
/// ISO-8601 string; render as RFC 3339 UTC at second precision
fn coerce_timestamp(value: &Value) -> Option<String> {
    let parsed = match value {
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                DateTime::from_timestamp(secs, 0)
            } else {
                n.as_f64().and_then(datetime_from_fractional_epoch)
            }
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    };
    parsed.map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    if let Ok(frac) = s.parse::<f64>() {
        return datetime_from_fractional_epoch(frac);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // osquery's datetime() renders without zone; treat as UTC
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn datetime_from_fractional_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    let secs = epoch.trunc() as i64;
    let nanos = (epoch.fract().abs() * 1_000_000_000.0) as u32;
    DateTime::from_timestamp(secs, nanos)
}
