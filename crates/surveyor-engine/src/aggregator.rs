//! Aggregation support types
//!
//! Probes inside a module run concurrently, but their results must land in
//! the order the module declared them. `SectionData` keeps that order, and
//! `CancelFlag` lets a caller stop probes that have not launched yet.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::normalize::FactBundle;

/// Shared cancellation flag checked before each probe launches
///
/// Cancellation is cooperative and coarse: probes already in flight run to
/// completion, probes not yet launched are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a fresh, uncancelled flag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Probe results keyed by probe id, in declared order
///
/// Serializes as a JSON object whose keys appear exactly in insertion
/// order, so report sections read the way their modules declare them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionData {
    entries: Vec<(String, FactBundle)>,
}

impl SectionData {
    /// Create an empty section
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a probe's bundle, replacing any earlier entry with the same id
    pub fn insert(&mut self, id: impl Into<String>, bundle: FactBundle) {
        let id = id.into();
        if let Some(existing) = self.entries.iter_mut().find(|(key, _)| *key == id) {
            existing.1 = bundle;
        } else {
            self.entries.push((id, bundle));
        }
    }

    /// Look up a probe's bundle by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FactBundle> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, bundle)| bundle)
    }

    /// Number of probe entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the section holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in declared order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FactBundle)> {
        self.entries.iter().map(|(id, bundle)| (id, bundle))
    }
}

impl Serialize for SectionData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, bundle) in &self.entries {
            map.serialize_entry(id, bundle)?;
        }
        map.end()
    }
}
