//! # Assignment Engine
//!
//! Deterministic codepoint and canonical-name allocation for ontology concepts.
//!
//! The engine is a pure function of `(concepts, policy)`: the same inputs
//! always produce byte-identical assignment lists, whatever order the
//! concepts arrive in.
//!
//! ## Algorithm
//!
//! 1. Drop concepts outside `policy.uri_filter`; collapse identical URIs.
//! 2. Sort by URI (byte order).
//! 3. Pinned URIs reuse their `(codepoint, name)` without consuming a slot.
//! 4. Every other concept derives a local name and takes the next slot not
//!    held by any pin.
//! 5. Duplicate names or codepoints abort the whole run.
//! 6. URIs resembling reserved core values raise advisories.

use crate::primitives::{FALLBACK_LOCAL_NAME, NO_LABEL_SENTINEL, RESERVED_KNOWN_VALUES};
use crate::{Codepoint, Concept, EntryType, KvError, RegistryEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// OVERRIDE TABLE
// =============================================================================

/// A previously issued identity for a URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedAssignment {
    pub codepoint: Codepoint,
    pub canonical_name: String,
}

/// URI -> previously issued `(codepoint, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverrideTable {
    pins: BTreeMap<String, PinnedAssignment>,
}

impl OverrideTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin every entry that carries a non-empty URI.
    #[must_use]
    pub fn from_entries(entries: &[RegistryEntry]) -> Self {
        let mut table = Self::new();
        table.extend_from_entries(entries);
        table
    }

    /// Add pins from entries; later pins replace earlier ones for the same URI.
    pub fn extend_from_entries(&mut self, entries: &[RegistryEntry]) {
        for entry in entries {
            if let Some(uri) = entry.uri_key() {
                self.insert(uri, entry.codepoint, entry.canonical_name.clone());
            }
        }
    }

    pub fn insert(
        &mut self,
        uri: impl Into<String>,
        codepoint: Codepoint,
        canonical_name: impl Into<String>,
    ) {
        self.pins.insert(
            uri.into(),
            PinnedAssignment {
                codepoint,
                canonical_name: canonical_name.into(),
            },
        );
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&PinnedAssignment> {
        self.pins.get(uri)
    }

    /// Every pinned codepoint, whether or not its URI is in the current run.
    #[must_use]
    pub fn codepoints(&self) -> BTreeSet<Codepoint> {
        self.pins.values().map(|p| p.codepoint).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

// =============================================================================
// ALLOCATION POLICY
// =============================================================================

/// Inputs to one allocation run besides the concepts themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPolicy {
    pub start_codepoint: Codepoint,
    pub overrides: OverrideTable,
    /// Only concepts whose URI starts with this prefix are assigned.
    pub uri_filter: Option<String>,
    /// Prefix applied as `namespace:local` to derived names.
    pub namespace: Option<String>,
}

impl AllocationPolicy {
    #[must_use]
    pub fn new(start_codepoint: Codepoint) -> Self {
        Self {
            start_codepoint,
            overrides: OverrideTable::new(),
            uri_filter: None,
            namespace: None,
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn with_uri_filter(mut self, prefix: impl Into<String>) -> Self {
        self.uri_filter = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn namespaced(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Continue a registry produced by earlier runs: its URIs are pinned to
    /// their committed identities and fresh slots start after its highest
    /// codepoint at or above `start_codepoint`.
    pub fn continuing(mut self, existing: &[RegistryEntry]) -> Result<Self, KvError> {
        self.overrides.extend_from_entries(existing);
        let highest = existing
            .iter()
            .map(|e| e.codepoint)
            .filter(|cp| *cp >= self.start_codepoint)
            .max();
        if let Some(highest) = highest {
            self.start_codepoint = highest.checked_next().ok_or_else(|| {
                KvError::CodepointSpaceExhausted(format!(
                    "registry already holds codepoint {}",
                    highest
                ))
            })?;
        }
        Ok(self)
    }
}

// =============================================================================
// OUTCOME TYPES
// =============================================================================

/// Where an assignment's identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentOrigin {
    /// Took the next sequential slot.
    Allocated,
    /// Reused from the override table.
    Pinned,
}

/// One concept's assigned identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub codepoint: Codepoint,
    pub canonical_name: String,
    pub entry_type: EntryType,
    pub uri: String,
    pub description: String,
    pub origin: AssignmentOrigin,
}

impl Assignment {
    /// The registry entry this assignment commits as. Ontology entries carry
    /// no provenance.
    #[must_use]
    pub fn to_entry(&self) -> RegistryEntry {
        let entry = RegistryEntry::new(
            self.codepoint,
            self.canonical_name.clone(),
            self.entry_type,
            self.description.clone(),
        );
        if self.uri.is_empty() {
            entry
        } else {
            entry.with_uri(self.uri.clone())
        }
    }
}

/// A non-fatal notice that an assignment may duplicate a reserved core value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionAdvisory {
    pub codepoint: Codepoint,
    pub canonical_name: String,
    pub uri: String,
    pub reserved_name: String,
    pub reserved_codepoint: Codepoint,
}

impl fmt::Display for CollisionAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Semantically equivalent to Core '{}' ({}): {} ({}) -> {}",
            self.reserved_name, self.reserved_codepoint, self.canonical_name, self.codepoint, self.uri
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    /// In processing (URI) order.
    pub assignments: Vec<Assignment>,
    pub advisories: Vec<CollisionAdvisory>,
    pub pinned: usize,
    pub allocated: usize,
}

// =============================================================================
// ENGINE
// =============================================================================

/// The Assignment Engine. Stateless; all inputs are explicit.
pub struct AssignmentEngine;

impl AssignmentEngine {
    /// Assign codepoints and names to `concepts` under `policy`.
    ///
    /// `unit` names the run in error messages (usually the ontology name).
    ///
    /// # Errors
    ///
    /// - `DuplicateCanonicalNames` if two URIs end up with the same name
    /// - `DuplicateCodepoints` if two pinned URIs of the run share a codepoint
    /// - `CodepointSpaceExhausted` if allocation runs past `u64::MAX`
    pub fn assign(
        concepts: &[Concept],
        policy: &AllocationPolicy,
        unit: &str,
    ) -> Result<AssignmentOutcome, KvError> {
        let ordered = Self::prepare(concepts, policy.uri_filter.as_deref());

        let mut outcome = AssignmentOutcome::default();
        let reserved = policy.overrides.codepoints();
        let mut next = Some(policy.start_codepoint);

        for concept in ordered {
            let entry_type = concept.concept_type.entry_type();
            let assignment = match policy.overrides.get(&concept.uri) {
                Some(pin) => {
                    outcome.pinned += 1;
                    Assignment {
                        codepoint: pin.codepoint,
                        canonical_name: pin.canonical_name.clone(),
                        entry_type,
                        uri: concept.uri.clone(),
                        description: concept.description.clone(),
                        origin: AssignmentOrigin::Pinned,
                    }
                }
                None => {
                    let codepoint = Self::next_free(&mut next, &reserved).ok_or_else(|| {
                        KvError::CodepointSpaceExhausted(unit.to_string())
                    })?;
                    outcome.allocated += 1;

                    let local = Self::derive_local_name(&concept.label, &concept.uri);
                    let canonical_name = match &policy.namespace {
                        Some(ns) => format!("{}:{}", ns, local),
                        None => local,
                    };
                    Assignment {
                        codepoint,
                        canonical_name,
                        entry_type,
                        uri: concept.uri.clone(),
                        description: concept.description.clone(),
                        origin: AssignmentOrigin::Allocated,
                    }
                }
            };
            outcome.assignments.push(assignment);
        }

        Self::check_duplicate_names(&outcome.assignments, unit)?;
        Self::check_duplicate_codepoints(&outcome.assignments, unit)?;
        outcome.advisories = Self::collision_advisories(&outcome.assignments);

        Ok(outcome)
    }

    /// Take the next sequential codepoint that no pin holds.
    fn next_free(next: &mut Option<Codepoint>, reserved: &BTreeSet<Codepoint>) -> Option<Codepoint> {
        while let Some(candidate) = *next {
            *next = candidate.checked_next();
            if !reserved.contains(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Filter, collapse identical URIs and sort by URI.
    ///
    /// Of several concepts sharing a URI the smallest by
    /// `(type, label, description)` is kept, so input order never matters.
    fn prepare<'a>(concepts: &'a [Concept], uri_filter: Option<&str>) -> Vec<&'a Concept> {
        let mut by_uri: BTreeMap<&str, &Concept> = BTreeMap::new();
        for concept in concepts {
            if let Some(prefix) = uri_filter {
                if !concept.uri.starts_with(prefix) {
                    continue;
                }
            }
            by_uri
                .entry(concept.uri.as_str())
                .and_modify(|kept| {
                    if Self::tie_key(concept) < Self::tie_key(kept) {
                        *kept = concept;
                    }
                })
                .or_insert(concept);
        }
        by_uri.into_values().collect()
    }

    fn tie_key(concept: &Concept) -> (crate::ConceptType, &str, &str) {
        (
            concept.concept_type,
            concept.label.as_str(),
            concept.description.as_str(),
        )
    }

    /// Local name of a concept: URI fragment, else last path segment, else
    /// normalized label, else `unknown`.
    #[must_use]
    pub fn derive_local_name(label: &str, uri: &str) -> String {
        if let Some((_, fragment)) = uri.rsplit_once('#') {
            if !fragment.is_empty() {
                return fragment.to_string();
            }
        }

        let trimmed = uri.trim_end_matches('/');
        let path_part = trimmed.rsplit('/').next().unwrap_or(trimmed);
        if !path_part.is_empty() && path_part != uri {
            return path_part.to_string();
        }

        if !label.is_empty() && label != NO_LABEL_SENTINEL {
            let normalized = Self::normalize_label(label);
            if !normalized.is_empty() {
                return normalized;
            }
        }

        FALLBACK_LOCAL_NAME.to_string()
    }

    /// Strip everything but word characters and whitespace, then camel-case
    /// labels that contain a space.
    #[must_use]
    pub fn normalize_label(label: &str) -> String {
        let cleaned: String = label
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
            .collect();

        if !cleaned.contains(' ') {
            return cleaned;
        }

        let mut parts = cleaned.split_whitespace();
        let mut name = parts.next().map(str::to_lowercase).unwrap_or_default();
        for part in parts {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                name.extend(first.to_uppercase());
                name.push_str(&chars.as_str().to_lowercase());
            }
        }
        name
    }

    /// Fatal if two assignments carry the same name.
    pub fn check_duplicate_names(assignments: &[Assignment], unit: &str) -> Result<(), KvError> {
        let mut name_to_uris: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for a in assignments {
            name_to_uris
                .entry(a.canonical_name.as_str())
                .or_default()
                .push(a.uri.clone());
        }
        let duplicates: BTreeMap<String, Vec<String>> = name_to_uris
            .into_iter()
            .filter(|(_, uris)| uris.len() > 1)
            .map(|(name, uris)| (name.to_string(), uris))
            .collect();

        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(KvError::DuplicateCanonicalNames {
                unit: unit.to_string(),
                duplicates,
            })
        }
    }

    /// Fatal if two assignments carry the same codepoint.
    pub fn check_duplicate_codepoints(
        assignments: &[Assignment],
        unit: &str,
    ) -> Result<(), KvError> {
        let mut cp_to_uris: BTreeMap<Codepoint, Vec<String>> = BTreeMap::new();
        for a in assignments {
            cp_to_uris.entry(a.codepoint).or_default().push(a.uri.clone());
        }
        cp_to_uris.retain(|_, uris| uris.len() > 1);

        if cp_to_uris.is_empty() {
            Ok(())
        } else {
            Err(KvError::DuplicateCodepoints {
                unit: unit.to_string(),
                duplicates: cp_to_uris,
            })
        }
    }

    /// Advisories for URIs that look like reserved core values.
    #[must_use]
    pub fn collision_advisories(assignments: &[Assignment]) -> Vec<CollisionAdvisory> {
        let mut advisories = Vec::new();
        for a in assignments {
            for (reserved_cp, reserved_name, suffixes) in RESERVED_KNOWN_VALUES {
                if suffixes.iter().any(|s| a.uri.ends_with(s)) {
                    advisories.push(CollisionAdvisory {
                        codepoint: a.codepoint,
                        canonical_name: a.canonical_name.clone(),
                        uri: a.uri.clone(),
                        reserved_name: (*reserved_name).to_string(),
                        reserved_codepoint: Codepoint(*reserved_cp),
                    });
                }
            }
        }
        advisories
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ConceptType;

    fn concept(uri: &str) -> Concept {
        Concept::new(uri, "", "", ConceptType::Class)
    }

    fn pairs(outcome: &AssignmentOutcome) -> Vec<(String, u64)> {
        outcome
            .assignments
            .iter()
            .map(|a| (a.canonical_name.clone(), a.codepoint.0))
            .collect()
    }

    #[test]
    fn sorted_sequential_allocation() {
        let concepts = vec![
            concept("http://x/Zebra"),
            concept("http://x/Apple"),
            concept("http://x/Mango"),
        ];
        let outcome =
            AssignmentEngine::assign(&concepts, &AllocationPolicy::new(Codepoint(1000)), "x")
                .unwrap();
        assert_eq!(
            pairs(&outcome),
            vec![
                ("Apple".to_string(), 1000),
                ("Mango".to_string(), 1001),
                ("Zebra".to_string(), 1002),
            ]
        );
        assert_eq!(outcome.allocated, 3);
        assert_eq!(outcome.pinned, 0);
    }

    #[test]
    fn pinned_uri_consumes_no_slot() {
        let concepts = vec![
            concept("http://x/Zebra"),
            concept("http://x/Apple"),
            concept("http://x/Mango"),
        ];
        let mut overrides = OverrideTable::new();
        overrides.insert("http://x/Mango", Codepoint(500), "legacyMango");
        let policy = AllocationPolicy::new(Codepoint(1000)).with_overrides(overrides);

        let outcome = AssignmentEngine::assign(&concepts, &policy, "x").unwrap();
        assert_eq!(
            pairs(&outcome),
            vec![
                ("Apple".to_string(), 1000),
                ("legacyMango".to_string(), 500),
                ("Zebra".to_string(), 1001),
            ]
        );
        assert_eq!(outcome.assignments[1].origin, AssignmentOrigin::Pinned);
        assert_eq!(outcome.pinned, 1);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let outcome =
            AssignmentEngine::assign(&[], &AllocationPolicy::new(Codepoint(1)), "x").unwrap();
        assert!(outcome.assignments.is_empty());
    }

    #[test]
    fn unused_overrides_are_fine() {
        let mut overrides = OverrideTable::new();
        overrides.insert("http://elsewhere/thing", Codepoint(3), "thing");
        let policy = AllocationPolicy::new(Codepoint(10)).with_overrides(overrides);
        let outcome =
            AssignmentEngine::assign(&[concept("http://x/A")], &policy, "x").unwrap();
        assert_eq!(pairs(&outcome), vec![("A".to_string(), 10)]);
    }

    #[test]
    fn namespaced_names() {
        let policy = AllocationPolicy::new(Codepoint(2000)).namespaced("rdf");
        let outcome = AssignmentEngine::assign(
            &[concept("http://www.w3.org/1999/02/22-rdf-syntax-ns#type")],
            &policy,
            "rdf",
        )
        .unwrap();
        assert_eq!(outcome.assignments[0].canonical_name, "rdf:type");
    }

    #[test]
    fn uri_filter_drops_foreign_concepts() {
        let policy = AllocationPolicy::new(Codepoint(1)).with_uri_filter("http://keep/");
        let outcome = AssignmentEngine::assign(
            &[concept("http://drop/B"), concept("http://keep/A")],
            &policy,
            "x",
        )
        .unwrap();
        assert_eq!(pairs(&outcome), vec![("A".to_string(), 1)]);
    }

    #[test]
    fn duplicate_uris_collapse_independent_of_order() {
        let a = Concept::new("http://x/A", "Zed", "", ConceptType::Property);
        let b = Concept::new("http://x/A", "Alpha", "", ConceptType::Class);
        let policy = AllocationPolicy::new(Codepoint(1));

        let one = AssignmentEngine::assign(&[a.clone(), b.clone()], &policy, "x").unwrap();
        let two = AssignmentEngine::assign(&[b, a], &policy, "x").unwrap();
        assert_eq!(one, two);
        assert_eq!(one.assignments.len(), 1);
        assert_eq!(one.assignments[0].entry_type, EntryType::Class);
    }

    #[test]
    fn duplicate_derived_names_are_fatal() {
        let concepts = vec![concept("http://a/Thing"), concept("http://b/Thing")];
        let err = AssignmentEngine::assign(&concepts, &AllocationPolicy::new(Codepoint(1)), "dup")
            .unwrap_err();
        match err {
            KvError::DuplicateCanonicalNames { unit, duplicates } => {
                assert_eq!(unit, "dup");
                assert_eq!(
                    duplicates.get("Thing").unwrap(),
                    &vec!["http://a/Thing".to_string(), "http://b/Thing".to_string()]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn allocation_skips_pinned_codepoints() {
        let mut overrides = OverrideTable::new();
        overrides.insert("http://x/B", Codepoint(1), "legacyB");
        // Pinned for a URI outside this run; still never handed out.
        overrides.insert("http://elsewhere/Q", Codepoint(3), "q");
        let policy = AllocationPolicy::new(Codepoint(1)).with_overrides(overrides);
        let outcome = AssignmentEngine::assign(
            &[concept("http://x/A"), concept("http://x/B"), concept("http://x/C")],
            &policy,
            "x",
        )
        .unwrap();
        assert_eq!(
            pairs(&outcome),
            vec![
                ("A".to_string(), 2),
                ("legacyB".to_string(), 1),
                ("C".to_string(), 4),
            ]
        );
        assert_eq!((outcome.pinned, outcome.allocated), (1, 2));
    }

    #[test]
    fn two_pins_on_one_codepoint_are_fatal() {
        let mut overrides = OverrideTable::new();
        overrides.insert("http://x/A", Codepoint(7), "legacyA");
        overrides.insert("http://x/B", Codepoint(7), "legacyB");
        let policy = AllocationPolicy::new(Codepoint(100)).with_overrides(overrides);
        let err = AssignmentEngine::assign(
            &[concept("http://x/A"), concept("http://x/B")],
            &policy,
            "x",
        )
        .unwrap_err();
        assert!(matches!(err, KvError::DuplicateCodepoints { .. }));
    }

    #[test]
    fn allocation_past_max_is_fatal() {
        let policy = AllocationPolicy::new(Codepoint(u64::MAX));
        let ok = AssignmentEngine::assign(&[concept("http://x/A")], &policy, "x").unwrap();
        assert_eq!(ok.assignments[0].codepoint, Codepoint(u64::MAX));

        let err = AssignmentEngine::assign(
            &[concept("http://x/A"), concept("http://x/B")],
            &policy,
            "x",
        )
        .unwrap_err();
        assert!(matches!(err, KvError::CodepointSpaceExhausted(_)));
    }

    #[test]
    fn advisories_name_reserved_values() {
        let concepts = vec![
            concept("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
            concept("http://purl.org/dc/terms/identifier"),
            concept("http://x/plain"),
        ];
        let outcome =
            AssignmentEngine::assign(&concepts, &AllocationPolicy::new(Codepoint(5)), "x")
                .unwrap();
        let reserved: Vec<&str> = outcome
            .advisories
            .iter()
            .map(|a| a.reserved_name.as_str())
            .collect();
        assert_eq!(reserved, vec!["id", "isA"]);
        assert_eq!(
            outcome.advisories[1].to_string(),
            "Semantically equivalent to Core 'isA' (1): type (6) -> http://www.w3.org/1999/02/22-rdf-syntax-ns#type"
        );
    }

    #[test]
    fn local_name_prefers_fragment_then_path() {
        assert_eq!(AssignmentEngine::derive_local_name("x", "http://a/b#Frag"), "Frag");
        assert_eq!(AssignmentEngine::derive_local_name("x", "http://a/b/Seg/"), "Seg");
        assert_eq!(AssignmentEngine::derive_local_name("x", "http://a/ns#"), "ns#");
    }

    #[test]
    fn local_name_falls_back_to_label() {
        assert_eq!(
            AssignmentEngine::derive_local_name("Has Part (Of)", "urn-no-slash"),
            "hasPartOf"
        );
        assert_eq!(AssignmentEngine::derive_local_name("Single", "urn"), "Single");
        assert_eq!(AssignmentEngine::derive_local_name(NO_LABEL_SENTINEL, "urn"), "unknown");
        assert_eq!(AssignmentEngine::derive_local_name("", "urn"), "unknown");
        assert_eq!(AssignmentEngine::derive_local_name("!!!", "urn"), "unknown");
    }

    #[test]
    fn normalize_label_camel_cases() {
        assert_eq!(AssignmentEngine::normalize_label("  date of BIRTH "), "dateOfBirth");
        assert_eq!(AssignmentEngine::normalize_label("e-mail"), "email");
        assert_eq!(AssignmentEngine::normalize_label("already_ok"), "already_ok");
    }

    #[test]
    fn continuing_pins_and_advances() {
        let existing = vec![
            RegistryEntry::new(Codepoint(2000), "rdf:type", EntryType::Property, "")
                .with_uri("http://r#type"),
            RegistryEntry::new(Codepoint(2001), "rdf:value", EntryType::Property, "")
                .with_uri("http://r#value"),
        ];
        let policy = AllocationPolicy::new(Codepoint(2000))
            .namespaced("rdf")
            .continuing(&existing)
            .unwrap();
        assert_eq!(policy.start_codepoint, Codepoint(2002));

        let concepts = vec![
            Concept::new("http://r#type", "", "", ConceptType::Property),
            Concept::new("http://r#first", "", "", ConceptType::Property),
            Concept::new("http://r#value", "", "", ConceptType::Property),
        ];
        let outcome = AssignmentEngine::assign(&concepts, &policy, "rdf").unwrap();
        assert_eq!(
            pairs(&outcome),
            vec![
                ("rdf:first".to_string(), 2002),
                ("rdf:type".to_string(), 2000),
                ("rdf:value".to_string(), 2001),
            ]
        );
    }

    #[test]
    fn assignment_to_entry_keeps_uri() {
        let a = Assignment {
            codepoint: Codepoint(9),
            canonical_name: "n".to_string(),
            entry_type: EntryType::Datatype,
            uri: "http://x/n".to_string(),
            description: "d".to_string(),
            origin: AssignmentOrigin::Allocated,
        };
        let entry = a.to_entry();
        assert_eq!(entry.uri.as_deref(), Some("http://x/n"));
        assert!(entry.source.is_none());
    }
}
