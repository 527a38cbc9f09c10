// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Identity continuity between consecutive pulls.
//!
//! The source assigns numeric ids that are stable within one of its sessions
//! but may be reshuffled when it reorganises itself. The [`IdentityIndex`]
//! remembers the previous pull by id and by name. When a fresh record's id is
//! missing, or now points at a differently named tag, the
//! [`IdentityReconciler`] looks the fresh name up and takes the first
//! previous record with the same structure.

use std::collections::BTreeMap;

use crate::naming::NameTransformer;
use crate::types::TagRecord;

// =============================================================================
// Structural Equality
// =============================================================================

/// Returns `true` if two tag records describe the same logical tag.
///
/// Compares the descriptive fields (`name` and `data_type`). The identifier and
/// the observation fields (`value`, `quality`, `updated_at`) are ignored.
pub fn same_structure(a: &TagRecord, b: &TagRecord) -> bool {
    a.name == b.name && a.data_type == b.data_type
}

// =============================================================================
// IdentityIndex
// =============================================================================

/// The previous pull, keyed by source id.
///
/// Secondary keys: the tag name (ids ascending) and, once
/// [`IdentityIndex::with_metric_names`] ran, the namespaced metric name.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    by_id: BTreeMap<i64, TagRecord>,
    by_name: BTreeMap<String, Vec<i64>>,
    by_metric: BTreeMap<String, i64>,
}

impl IdentityIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from a full pull. A repeated id keeps its last record.
    pub fn from_records(records: impl IntoIterator<Item = TagRecord>) -> Self {
        let by_id: BTreeMap<i64, TagRecord> = records.into_iter().map(|r| (r.id, r)).collect();

        let mut by_name: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        for (id, record) in &by_id {
            by_name.entry(record.name.clone()).or_default().push(*id);
        }

        Self {
            by_id,
            by_name,
            by_metric: BTreeMap::new(),
        }
    }

    /// Keys every record by its namespaced metric name as well.
    ///
    /// Names that do not transform are left out. When two tags map onto the
    /// same metric name the lower id keeps it.
    pub fn with_metric_names(mut self, names: &NameTransformer) -> Self {
        let metric_names = names.to_namespaced_names(self.by_id.values().map(|r| r.name.as_str()));
        for (id, metric_name) in self.by_id.keys().zip(metric_names) {
            if let Ok(metric_name) = metric_name {
                self.by_metric.entry(metric_name).or_insert(*id);
            }
        }
        self
    }

    /// Returns the record indexed under `id`.
    pub fn get(&self, id: i64) -> Option<&TagRecord> {
        self.by_id.get(&id)
    }

    /// Returns a previous record by tag name. The lowest id wins.
    pub fn find_by_name(&self, name: &str) -> Option<&TagRecord> {
        self.named(name).next()
    }

    /// Returns the record whose namespaced name is `metric_name`.
    pub fn find_by_metric(&self, metric_name: &str) -> Option<&TagRecord> {
        self.by_metric.get(metric_name).and_then(|id| self.by_id.get(id))
    }

    /// Records carrying `name`, in ascending id order.
    pub fn named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a TagRecord> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
    }

    /// Iterates records in ascending id order.
    pub fn records(&self) -> impl Iterator<Item = &TagRecord> {
        self.by_id.values()
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// =============================================================================
// IdentityReconciler
// =============================================================================

/// How a fresh record relates to the previous pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    /// Same logical tag, same value.
    Unchanged {
        /// Id of the matching previous record.
        previous_id: i64,
    },
    /// Same logical tag, different value.
    Changed {
        /// Id of the matching previous record.
        previous_id: i64,
    },
    /// No previous record matches.
    New,
}

impl Continuity {
    /// Returns `true` for [`Continuity::Changed`].
    pub fn is_changed(&self) -> bool {
        matches!(self, Continuity::Changed { .. })
    }
}

/// Classifies fresh records against an [`IdentityIndex`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityReconciler;

impl IdentityReconciler {
    /// Creates a reconciler.
    pub fn new() -> Self {
        Self
    }

    /// Classifies `fresh` against the previous pull.
    ///
    /// A direct id hit is trusted only while it still names the same tag;
    /// otherwise the structural search decides.
    pub fn classify(&self, fresh: &TagRecord, previous: &IdentityIndex) -> Continuity {
        match previous.get(fresh.id) {
            Some(prev) if same_structure(prev, fresh) => compare(prev, fresh),
            _ => self.recover(fresh, previous),
        }
    }

    /// Looks for a previous record with the same structure as `fresh`.
    ///
    /// Only records sharing the fresh name are considered. The lowest matching
    /// id wins, so the outcome is deterministic.
    pub fn recover(&self, fresh: &TagRecord, previous: &IdentityIndex) -> Continuity {
        previous
            .named(&fresh.name)
            .find(|prev| same_structure(prev, fresh))
            .map(|prev| compare(prev, fresh))
            .unwrap_or(Continuity::New)
    }
}

fn compare(prev: &TagRecord, fresh: &TagRecord) -> Continuity {
    if prev.value == fresh.value {
        Continuity::Unchanged { previous_id: prev.id }
    } else {
        Continuity::Changed { previous_id: prev.id }
    }
}
