//! Topic modules
//!
//! A module is a declarative bundle: the probes one report section needs,
//! plus an optional summary derived from the collected data. Modules hold
//! no execution logic of their own; a `ProbeRunner` does the work.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregator::{CancelFlag, SectionData};
use crate::normalize::{FactBundle, FactValue};
use crate::orchestrator::ProbeRunner;
use crate::probe::Probe;

/// Named group of probes forming one report section
#[derive(Debug, Clone)]
pub struct Module {
    /// Section key in the report
    pub id: String,
    /// Probes in declared (output) order
    pub probes: Vec<Probe>,
    /// Optional derived summary entry
    pub summary: Option<SummarySpec>,
}

impl Module {
    /// Create an empty module
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            probes: Vec::new(),
            summary: None,
        }
    }

    /// Append a probe
    #[must_use]
    pub fn probe(mut self, probe: Probe) -> Self {
        self.probes.push(probe);
        self
    }

    /// Attach a summary derivation
    #[must_use]
    pub fn with_summary(mut self, summary: SummarySpec) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Run all probes and derive the summary
    pub async fn collect(&self, runner: &ProbeRunner) -> SectionData {
        self.collect_with_cancel(runner, &CancelFlag::new()).await
    }

    /// Run all probes with an externally controlled cancellation flag
    pub async fn collect_with_cancel(
        &self,
        runner: &ProbeRunner,
        cancel: &CancelFlag,
    ) -> SectionData {
        let mut data = runner.collect_all(&self.probes, cancel).await;
        if let Some(summary) = &self.summary {
            let derived = summary.evaluate(&data);
            data.insert(summary.key.clone(), derived);
        }
        data
    }
}

/// Declarative summary derivation
///
/// Rules are checked in order against the collected data; the first match
/// supplies the status, and the fallback applies when none match. Overlays
/// copy individual collected fields into the summary entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarySpec {
    /// Key the derived entry lands under in the section
    pub key: String,
    /// Ordered status rules; first match wins
    pub rules: Vec<StatusRule>,
    /// Status when no rule matches
    pub fallback: String,
    /// Fields copied from collected bundles into the summary
    #[serde(default)]
    pub overlays: Vec<FieldOverlay>,
}

impl SummarySpec {
    /// Create a summary with no rules yet
    pub fn new(key: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            rules: Vec::new(),
            fallback: fallback.into(),
            overlays: Vec::new(),
        }
    }

    /// Append a status rule
    #[must_use]
    pub fn rule(
        mut self,
        probe: impl Into<String>,
        field: impl Into<String>,
        test: FieldTest,
        status: impl Into<String>,
    ) -> Self {
        self.rules.push(StatusRule {
            probe: probe.into(),
            field: field.into(),
            test,
            status: status.into(),
        });
        self
    }

    /// Append a field overlay
    #[must_use]
    pub fn overlay(
        mut self,
        probe: impl Into<String>,
        field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        self.overlays.push(FieldOverlay {
            probe: probe.into(),
            field: field.into(),
            as_field: as_field.into(),
        });
        self
    }

    /// Derive the summary bundle from collected section data
    #[must_use]
    pub fn evaluate(&self, data: &SectionData) -> FactBundle {
        let status = self
            .rules
            .iter()
            .find(|rule| rule.matches(data))
            .map_or_else(|| self.fallback.clone(), |rule| rule.status.clone());

        let mut bundle = FactBundle::new();
        bundle.insert("status", FactValue::Text(status));

        for overlay in &self.overlays {
            match data.get(&overlay.probe).and_then(|b| b.get(&overlay.field)) {
                Some(value) => bundle.insert(overlay.as_field.clone(), value.clone()),
                None => {
                    warn!(
                        probe = %overlay.probe,
                        field = %overlay.field,
                        "overlay source missing, skipping"
                    );
                }
            }
        }

        bundle
    }
}

/// One ordered status predicate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRule {
    /// Probe id the rule reads from
    pub probe: String,
    /// Field within that probe's bundle
    pub field: String,
    /// Predicate applied to the field's value
    pub test: FieldTest,
    /// Status the rule yields when it matches
    pub status: String,
}

impl StatusRule {
    fn matches(&self, data: &SectionData) -> bool {
        data.get(&self.probe)
            .and_then(|bundle| bundle.get(&self.field))
            .is_some_and(|value| self.test.passes(value))
    }
}

/// Predicates a status rule can apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTest {
    /// Boolean field is true
    IsTrue,
    /// Integer field is nonzero
    NonZero,
    /// Field holds something beyond its zero value
    NonEmpty,
}

impl FieldTest {
    fn passes(self, value: &FactValue) -> bool {
        match self {
            FieldTest::IsTrue => value.as_bool() == Some(true),
            FieldTest::NonZero => value.as_int().is_some_and(|n| n != 0),
            FieldTest::NonEmpty => !value.is_empty(),
        }
    }
}

/// Copies one collected field into the summary entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOverlay {
    /// Probe id to copy from
    pub probe: String,
    /// Field within that probe's bundle
    pub field: String,
    /// Field name inside the summary entry
    pub as_field: String,
}
