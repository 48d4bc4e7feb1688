//! # Registry Store
//!
//! The append-only store of committed entries.
//!
//! [`RegistryStore`] is the storage abstraction shared by the in-memory
//! [`Registry`] and the redb-backed [`crate::storage::RedbRegistry`]. Every
//! lookup set is computed from the current entries on demand; nothing is
//! cached between calls.
//!
//! ## Store Invariants
//!
//! 1. `codepoint` is unique.
//! 2. `canonical_name` is unique.
//! 3. Every non-empty `uri` is unique.
//! 4. Entries are held in ascending `codepoint` order.
//! 5. Nothing committed is ever reassigned.

use crate::assignment::Assignment;
use crate::{Codepoint, KvError, RegistryEntry, RegistrySource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Storage abstraction for a registry.
pub trait RegistryStore {
    /// Document-level metadata of this registry.
    fn source(&self) -> &RegistrySource;

    /// All entries in ascending codepoint order.
    fn entries(&self) -> Result<Vec<RegistryEntry>, KvError>;

    /// Append entries. Order is restored afterwards; duplicates are not
    /// filtered. All-or-nothing semantics are the caller's job.
    fn append(&mut self, entries: Vec<RegistryEntry>) -> Result<(), KvError>;

    fn lookup_codepoint(&self, codepoint: Codepoint) -> Result<Option<RegistryEntry>, KvError>;

    fn lookup_name(&self, name: &str) -> Result<Option<RegistryEntry>, KvError>;

    fn lookup_uri(&self, uri: &str) -> Result<Option<RegistryEntry>, KvError>;

    fn entry_count(&self) -> Result<usize, KvError>;

    /// The configured minimum codepoint of this registry.
    fn minimum_codepoint(&self) -> Codepoint {
        self.source().start_code_point
    }

    fn assigned_codepoints(&self) -> Result<BTreeSet<Codepoint>, KvError> {
        Ok(self.entries()?.iter().map(|e| e.codepoint).collect())
    }

    fn assigned_names(&self) -> Result<BTreeSet<String>, KvError> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|e| e.canonical_name)
            .collect())
    }

    fn assigned_uris(&self) -> Result<BTreeSet<String>, KvError> {
        Ok(self
            .entries()?
            .iter()
            .filter_map(|e| e.uri_key().map(str::to_string))
            .collect())
    }

    /// All three lookup sets in one pass.
    fn snapshot(&self) -> Result<RegistrySnapshot, KvError> {
        Ok(RegistrySnapshot::from_entries(&self.entries()?))
    }

    fn statistics(&self) -> Result<RegistryStatistics, KvError> {
        Ok(RegistryStatistics::compute(
            &self.entries()?,
            self.minimum_codepoint(),
        ))
    }

    /// Merge ontology assignments. Nothing is appended unless every
    /// assignment is either new and conflict-free or already present verbatim.
    fn merge_assignments(&mut self, assignments: &[Assignment]) -> Result<MergePlan, KvError> {
        let plan = plan_merge(&self.entries()?, assignments)?;
        if !plan.new_entries.is_empty() {
            self.append(plan.new_entries.clone())?;
        }
        Ok(plan)
    }
}

// =============================================================================
// SNAPSHOT & STATISTICS
// =============================================================================

/// Point-in-time lookup sets of a registry, handed to the validation engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistrySnapshot {
    pub codepoints: BTreeSet<Codepoint>,
    pub names: BTreeSet<String>,
    pub uris: BTreeSet<String>,
}

impl RegistrySnapshot {
    #[must_use]
    pub fn from_entries(entries: &[RegistryEntry]) -> Self {
        let mut snapshot = Self::default();
        for entry in entries {
            snapshot.codepoints.insert(entry.codepoint);
            snapshot.names.insert(entry.canonical_name.clone());
            if let Some(uri) = entry.uri_key() {
                snapshot.uris.insert(uri.to_string());
            }
        }
        snapshot
    }
}

/// `{start, end}` codepoint range of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePointRange {
    pub start: u64,
    /// `None` (serialized as `null`) for an empty registry.
    pub end: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStatistics {
    pub total_entries: usize,
    pub code_point_range: CodePointRange,
}

impl RegistryStatistics {
    /// Min/max present codepoint, or `{minimum, null}` when empty.
    #[must_use]
    pub fn compute(entries: &[RegistryEntry], minimum: Codepoint) -> Self {
        let start = entries.iter().map(|e| e.codepoint).min();
        let end = entries.iter().map(|e| e.codepoint).max();
        Self {
            total_entries: entries.len(),
            code_point_range: CodePointRange {
                start: start.unwrap_or(minimum).value(),
                end: end.map(Codepoint::value),
            },
        }
    }
}

// =============================================================================
// INVARIANTS
// =============================================================================

/// Verify store invariants 1-4 over an entry list.
///
/// A failure here is a programming-level error, never a user violation.
pub fn check_invariants(entries: &[RegistryEntry]) -> Result<(), KvError> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    let mut uris: BTreeSet<&str> = BTreeSet::new();
    let mut previous: Option<Codepoint> = None;

    for entry in entries {
        if let Some(prev) = previous {
            if entry.codepoint == prev {
                return Err(KvError::InvariantViolation(format!(
                    "codepoint {} appears more than once",
                    entry.codepoint
                )));
            }
            if entry.codepoint < prev {
                return Err(KvError::InvariantViolation(format!(
                    "codepoint {} follows {}: entries are not in ascending order",
                    entry.codepoint, prev
                )));
            }
        }
        previous = Some(entry.codepoint);

        if !names.insert(&entry.canonical_name) {
            return Err(KvError::InvariantViolation(format!(
                "canonical name '{}' appears more than once",
                entry.canonical_name
            )));
        }
        if let Some(uri) = entry.uri_key() {
            if !uris.insert(uri) {
                return Err(KvError::InvariantViolation(format!(
                    "URI '{}' appears more than once",
                    uri
                )));
            }
        }
    }
    Ok(())
}

// =============================================================================
// MERGE PLANNING (ontology path)
// =============================================================================

/// Result of planning an ontology merge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergePlan {
    /// Entries to append, in assignment order.
    pub new_entries: Vec<RegistryEntry>,
    /// Assignments already present with the same codepoint and name.
    pub unchanged: usize,
}

fn describe(entry: &RegistryEntry) -> String {
    match entry.uri_key() {
        Some(uri) => format!("{} ({}, {})", entry.canonical_name, entry.codepoint, uri),
        None => format!("{} ({})", entry.canonical_name, entry.codepoint),
    }
}

/// Decide which assignments become new entries, without touching any store.
///
/// Fails on the first assignment that would reassign a committed URI or reuse
/// a codepoint or name held by a different entry, including one planned
/// earlier in the same call.
pub fn plan_merge(
    existing: &[RegistryEntry],
    assignments: &[Assignment],
) -> Result<MergePlan, KvError> {
    let mut by_uri: BTreeMap<String, RegistryEntry> = BTreeMap::new();
    let mut by_codepoint: BTreeMap<Codepoint, RegistryEntry> = BTreeMap::new();
    let mut by_name: BTreeMap<String, RegistryEntry> = BTreeMap::new();

    for entry in existing {
        if let Some(uri) = entry.uri_key() {
            by_uri.insert(uri.to_string(), entry.clone());
        }
        by_codepoint.insert(entry.codepoint, entry.clone());
        by_name.insert(entry.canonical_name.clone(), entry.clone());
    }

    let mut plan = MergePlan::default();

    for assignment in assignments {
        if let Some(held) = by_uri.get(&assignment.uri) {
            if held.codepoint == assignment.codepoint
                && held.canonical_name == assignment.canonical_name
            {
                plan.unchanged += 1;
                continue;
            }
            return Err(KvError::Reassignment {
                uri: assignment.uri.clone(),
                existing_codepoint: held.codepoint,
                existing_name: held.canonical_name.clone(),
                proposed_codepoint: assignment.codepoint,
                proposed_name: assignment.canonical_name.clone(),
            });
        }
        if let Some(held) = by_codepoint.get(&assignment.codepoint) {
            return Err(KvError::MergeConflict {
                field: "codepoint",
                value: assignment.codepoint.to_string(),
                held_by: describe(held),
            });
        }
        if let Some(held) = by_name.get(&assignment.canonical_name) {
            return Err(KvError::MergeConflict {
                field: "canonical name",
                value: assignment.canonical_name.clone(),
                held_by: describe(held),
            });
        }

        let entry = assignment.to_entry();
        if !assignment.uri.is_empty() {
            by_uri.insert(assignment.uri.clone(), entry.clone());
        }
        by_codepoint.insert(entry.codepoint, entry.clone());
        by_name.insert(entry.canonical_name.clone(), entry.clone());
        plan.new_entries.push(entry);
    }

    Ok(plan)
}

// =============================================================================
// IN-MEMORY REGISTRY
// =============================================================================

/// In-memory registry. Entries are kept sorted by codepoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    source: RegistrySource,
    entries: Vec<RegistryEntry>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(source: RegistrySource) -> Self {
        Self {
            source,
            entries: Vec::new(),
        }
    }

    /// Empty community registry (minimum codepoint 100000).
    #[must_use]
    pub fn community() -> Self {
        Self::new(RegistrySource::community())
    }

    /// Build from persisted entries. Entries are re-sorted, then checked
    /// against the store invariants.
    pub fn from_entries(
        source: RegistrySource,
        mut entries: Vec<RegistryEntry>,
    ) -> Result<Self, KvError> {
        entries.sort_by_key(|e| e.codepoint);
        check_invariants(&entries)?;
        Ok(Self { source, entries })
    }

    /// Borrow the sorted entries without cloning.
    #[must_use]
    pub fn as_slice(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn set_source(&mut self, source: RegistrySource) {
        self.source = source;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::community()
    }
}

impl RegistryStore for Registry {
    fn source(&self) -> &RegistrySource {
        &self.source
    }

    fn entries(&self) -> Result<Vec<RegistryEntry>, KvError> {
        Ok(self.entries.clone())
    }

    fn append(&mut self, entries: Vec<RegistryEntry>) -> Result<(), KvError> {
        self.entries.extend(entries);
        // Stable sort: equal codepoints keep their insertion order.
        self.entries.sort_by_key(|e| e.codepoint);
        Ok(())
    }

    fn lookup_codepoint(&self, codepoint: Codepoint) -> Result<Option<RegistryEntry>, KvError> {
        Ok(self
            .entries
            .binary_search_by_key(&codepoint, |e| e.codepoint)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .cloned())
    }

    fn lookup_name(&self, name: &str) -> Result<Option<RegistryEntry>, KvError> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.canonical_name == name)
            .cloned())
    }

    fn lookup_uri(&self, uri: &str) -> Result<Option<RegistryEntry>, KvError> {
        if uri.is_empty() {
            return Ok(None);
        }
        Ok(self
            .entries
            .iter()
            .find(|e| e.uri_key() == Some(uri))
            .cloned())
    }

    fn entry_count(&self) -> Result<usize, KvError> {
        Ok(self.entries.len())
    }

    fn assigned_codepoints(&self) -> Result<BTreeSet<Codepoint>, KvError> {
        Ok(self.entries.iter().map(|e| e.codepoint).collect())
    }

    fn snapshot(&self) -> Result<RegistrySnapshot, KvError> {
        Ok(RegistrySnapshot::from_entries(&self.entries))
    }

    fn statistics(&self) -> Result<RegistryStatistics, KvError> {
        Ok(RegistryStatistics::compute(
            &self.entries,
            self.minimum_codepoint(),
        ))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::assignment::AssignmentOrigin;
    use crate::EntryType;

    fn entry(cp: u64, name: &str, uri: Option<&str>) -> RegistryEntry {
        let e = RegistryEntry::new(Codepoint(cp), name, EntryType::Class, "test entry");
        match uri {
            Some(u) => e.with_uri(u),
            None => e,
        }
    }

    fn assignment(cp: u64, name: &str, uri: &str) -> Assignment {
        Assignment {
            codepoint: Codepoint(cp),
            canonical_name: name.to_string(),
            entry_type: EntryType::Property,
            uri: uri.to_string(),
            description: String::new(),
            origin: AssignmentOrigin::Allocated,
        }
    }

    #[test]
    fn empty_registry_statistics() {
        let registry = Registry::community();
        let stats = registry.statistics().unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.code_point_range.start, 100_000);
        assert_eq!(stats.code_point_range.end, None);
    }

    #[test]
    fn empty_statistics_serialize_end_as_null() {
        let stats = Registry::community().statistics().unwrap();
        let json = serde_json::to_value(stats).unwrap();
        assert!(json["code_point_range"]["end"].is_null());
    }

    #[test]
    fn append_restores_ascending_order() {
        let mut registry = Registry::community();
        registry
            .append(vec![entry(100_005, "b", None), entry(100_001, "a", None)])
            .unwrap();
        registry.append(vec![entry(100_003, "c", None)]).unwrap();

        let cps: Vec<u64> = registry.entries().unwrap().iter().map(|e| e.codepoint.0).collect();
        assert_eq!(cps, vec![100_001, 100_003, 100_005]);

        let stats = registry.statistics().unwrap();
        assert_eq!(stats.code_point_range.start, 100_001);
        assert_eq!(stats.code_point_range.end, Some(100_005));
    }

    #[test]
    fn lookup_sets_follow_appends() {
        let mut registry = Registry::community();
        assert!(registry.assigned_names().unwrap().is_empty());

        registry
            .append(vec![entry(100_000, "foo", Some("http://x/foo"))])
            .unwrap();

        assert!(registry.assigned_codepoints().unwrap().contains(&Codepoint(100_000)));
        assert!(registry.assigned_names().unwrap().contains("foo"));
        assert!(registry.assigned_uris().unwrap().contains("http://x/foo"));
    }

    #[test]
    fn empty_uri_is_not_assigned() {
        let mut registry = Registry::community();
        registry.append(vec![entry(100_000, "foo", Some(""))]).unwrap();
        assert!(registry.assigned_uris().unwrap().is_empty());
        assert!(registry.lookup_uri("").unwrap().is_none());
    }

    #[test]
    fn lookups_find_entries() {
        let registry = Registry::from_entries(
            RegistrySource::community(),
            vec![entry(100_002, "two", Some("http://x/2")), entry(100_001, "one", None)],
        )
        .unwrap();

        assert_eq!(
            registry.lookup_codepoint(Codepoint(100_002)).unwrap().unwrap().canonical_name,
            "two"
        );
        assert!(registry.lookup_codepoint(Codepoint(7)).unwrap().is_none());
        assert_eq!(registry.lookup_name("one").unwrap().unwrap().codepoint, Codepoint(100_001));
        assert_eq!(registry.lookup_uri("http://x/2").unwrap().unwrap().canonical_name, "two");
    }

    #[test]
    fn from_entries_rejects_duplicates() {
        let result = Registry::from_entries(
            RegistrySource::community(),
            vec![entry(100_001, "a", None), entry(100_001, "b", None)],
        );
        assert!(matches!(result, Err(KvError::InvariantViolation(_))));

        let result = Registry::from_entries(
            RegistrySource::community(),
            vec![entry(100_001, "a", None), entry(100_002, "a", None)],
        );
        assert!(matches!(result, Err(KvError::InvariantViolation(_))));

        let result = Registry::from_entries(
            RegistrySource::community(),
            vec![entry(100_001, "a", Some("u")), entry(100_002, "b", Some("u"))],
        );
        assert!(matches!(result, Err(KvError::InvariantViolation(_))));
    }

    #[test]
    fn check_invariants_rejects_unsorted() {
        let entries = vec![entry(2, "b", None), entry(1, "a", None)];
        assert!(check_invariants(&entries).is_err());
    }

    #[test]
    fn plan_merge_skips_identical_and_appends_new() {
        let existing = vec![entry(2000, "rdf:type", Some("http://r#type"))];
        let plan = plan_merge(
            &existing,
            &[
                assignment(2000, "rdf:type", "http://r#type"),
                assignment(2001, "rdf:value", "http://r#value"),
            ],
        )
        .unwrap();

        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.new_entries.len(), 1);
        assert_eq!(plan.new_entries[0].canonical_name, "rdf:value");
    }

    #[test]
    fn plan_merge_refuses_reassignment() {
        let existing = vec![entry(2000, "rdf:type", Some("http://r#type"))];
        let err = plan_merge(&existing, &[assignment(2005, "rdf:type", "http://r#type")])
            .unwrap_err();
        assert!(matches!(err, KvError::Reassignment { .. }));
    }

    #[test]
    fn plan_merge_refuses_held_codepoint_or_name() {
        let existing = vec![entry(2000, "rdf:type", Some("http://r#type"))];

        let err = plan_merge(&existing, &[assignment(2000, "other", "http://r#other")])
            .unwrap_err();
        assert!(matches!(err, KvError::MergeConflict { field: "codepoint", .. }));

        let err = plan_merge(&existing, &[assignment(2001, "rdf:type", "http://r#other")])
            .unwrap_err();
        assert!(matches!(err, KvError::MergeConflict { field: "canonical name", .. }));
    }

    #[test]
    fn merge_is_all_or_nothing() {
        let mut registry = Registry::new(RegistrySource::new("rdf", Codepoint(2000)));
        registry
            .append(vec![entry(2000, "rdf:type", Some("http://r#type"))])
            .unwrap();

        let result = registry.merge_assignments(&[
            assignment(2001, "rdf:value", "http://r#value"),
            assignment(2002, "rdf:type", "http://r#dup"),
        ]);

        assert!(result.is_err());
        assert_eq!(registry.entry_count().unwrap(), 1);
    }
}
