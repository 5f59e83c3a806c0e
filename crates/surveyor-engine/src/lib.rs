//! surveyor-engine: fact collection engine
//!
//! Runs declarative probes against a structured query source with shell
//! fallback, normalizes whatever comes back into typed fact bundles, and
//! aggregates probe groups into ordered report sections.

pub mod aggregator;
pub mod error;
pub mod module;
pub mod normalize;
pub mod orchestrator;
pub mod osquery;
pub mod probe;
pub mod raw;
pub mod source;

pub use aggregator::{CancelFlag, SectionData};
pub use error::SourceError;
pub use module::{FieldOverlay, FieldTest, Module, StatusRule, SummarySpec};
pub use normalize::{FactBundle, FactValue, normalize};
pub use orchestrator::{DEFAULT_TIMEOUT, ProbeRunner};
pub use osquery::OsqueryEngine;
pub use probe::{FieldKind, FieldSpec, Probe};
pub use raw::RawValue;
pub use source::QueryEngine;
