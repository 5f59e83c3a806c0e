//! Probe descriptors
//!
//! A probe declares up to two alternative sources (query text, shell
//! script) and the canonical fields its payload normalizes into. Catalogs
//! build descriptors once per collection pass; the engine never mutates
//! them.

use serde::{Deserialize, Serialize};

/// Target type of a declared canonical field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Boolean; truthy inputs are `"1"`, `"true"` and native `true`
    Bool,
    /// Signed integer; numeric strings are parsed
    Int,
    /// Point in time; rendered as an ISO-8601 UTC string
    Timestamp,
    /// Free-form text
    Text,
    /// Passthrough list of raw records (the `items` payload)
    Rows,
}

/// Coercion spec for one canonical field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Canonical field name in the fact bundle
    pub name: String,
    /// Source field names to try, in order, after the canonical name
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Target type
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Declare a field
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            kind,
        }
    }

    /// Add a source-name alias
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// Immutable descriptor for one fact-gathering probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    /// Probe id, unique within its module; keys the report section
    pub id: String,
    /// Structured-query text (preferred source)
    pub query: Option<String>,
    /// Shell script (fallback source)
    pub script: Option<String>,
    /// Declared canonical fields
    pub fields: Vec<FieldSpec>,
}

impl Probe {
    /// Start a descriptor with neither source declared
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: None,
            script: None,
            fields: Vec::new(),
        }
    }

    /// Declare the structured-query source
    #[must_use]
    pub fn with_query(mut self, sql: impl Into<String>) -> Self {
        self.query = Some(sql.into());
        self
    }

    /// Declare the shell fallback source
    #[must_use]
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Declare a canonical field
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }
}
