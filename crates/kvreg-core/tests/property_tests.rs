//! # Property-Based Tests
//!
//! Determinism, uniqueness and append-only invariants checked with proptest.

use kvreg_core::{
    AllocationPolicy, AssignmentEngine, AssignmentOrigin, Codepoint, Concept, ConceptType,
    OverrideTable, Registry, RegistrySource, RegistryStore, Session, SubmissionContext,
    SubmitOutcome, ValidationEngine, check_invariants, export_canonical, import_canonical,
    submit_to,
};
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::collections::BTreeSet;

fn concepts_from(locals: &BTreeSet<String>) -> Vec<Concept> {
    locals
        .iter()
        .map(|local| {
            Concept::new(
                format!("https://ontology.example/{}", local),
                "",
                "",
                ConceptType::Class,
            )
        })
        .collect()
}

fn local_names() -> impl Strategy<Value = BTreeSet<String>> {
    btree_set("[A-Z][a-z]{2,8}", 1..30)
}

/// `(codepoint offset, name, uri)` drawn from small pools so batches collide
/// with each other and with themselves.
type RawEntry = (u64, String, Option<String>);

fn raw_entry() -> impl Strategy<Value = RawEntry> {
    let uri = prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "[a-e]".prop_map(|s| Some(format!("https://u.example/{}", s))),
    ];
    (0u64..12, "[a-f]", uri)
}

fn request_document(entries: &[RawEntry]) -> String {
    let entries: Vec<Value> = entries
        .iter()
        .map(|(offset, name, uri)| {
            let mut entry = json!({
                "codepoint": 100_000 + offset,
                "canonical_name": name,
                "type": "class",
                "description": "long enough text",
            });
            if let Some(uri) = uri {
                entry["uri"] = json!(uri);
            }
            entry
        })
        .collect();
    json!({
        "request": {"submitter": "a", "description": "b", "contact": "c"},
        "entries": entries,
    })
    .to_string()
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Any permutation of the same concepts yields the same assignments.
    #[test]
    fn assignment_is_permutation_invariant(
        locals in local_names(),
        seed in any::<u64>(),
    ) {
        let concepts = concepts_from(&locals);
        let mut shuffled = concepts.clone();
        // deterministic rotation instead of an rng
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();

        let policy = AllocationPolicy::new(Codepoint(1000));
        let a = AssignmentEngine::assign(&concepts, &policy, "p").expect("assign");
        let b = AssignmentEngine::assign(&shuffled, &policy, "p").expect("assign");
        prop_assert_eq!(a, b);
    }

    /// Sequential allocation fills a dense range starting at the policy start.
    #[test]
    fn allocation_is_dense(locals in local_names(), start in 0u64..1_000_000) {
        let concepts = concepts_from(&locals);
        let outcome = AssignmentEngine::assign(&concepts, &AllocationPolicy::new(Codepoint(start)), "p")
            .expect("assign");

        let codepoints: Vec<u64> = outcome.assignments.iter().map(|a| a.codepoint.value()).collect();
        let expected: Vec<u64> = (start..start + locals.len() as u64).collect();
        prop_assert_eq!(codepoints, expected);
    }

    /// Merging a growing concept set never moves an existing entry.
    #[test]
    fn merges_are_append_only(
        first in local_names(),
        second in local_names(),
    ) {
        let mut registry = Registry::new(RegistrySource::new("p", Codepoint(1000)));
        let outcome = AssignmentEngine::assign(&concepts_from(&first), &AllocationPolicy::new(Codepoint(1000)), "p")
            .expect("assign");
        registry.merge_assignments(&outcome.assignments).expect("merge");
        let before = registry.entries().expect("entries");

        let union: BTreeSet<String> = first.union(&second).cloned().collect();
        let policy = AllocationPolicy::new(Codepoint(1000)).continuing(&before).expect("continue");
        let outcome = AssignmentEngine::assign(&concepts_from(&union), &policy, "p").expect("assign");
        registry.merge_assignments(&outcome.assignments).expect("merge");

        for entry in &before {
            let now = registry.lookup_codepoint(entry.codepoint).expect("lookup");
            prop_assert_eq!(now.as_ref(), Some(entry));
        }
        prop_assert_eq!(registry.entry_count().expect("count"), union.len());
    }

    /// Canonical export is stable and survives import.
    #[test]
    fn canonical_export_roundtrip_is_stable(locals in local_names()) {
        let mut registry = Registry::new(RegistrySource::new("p", Codepoint(1000)));
        let outcome = AssignmentEngine::assign(&concepts_from(&locals), &AllocationPolicy::new(Codepoint(1000)), "p")
            .expect("assign");
        registry.merge_assignments(&outcome.assignments).expect("merge");

        let bytes = export_canonical(&registry).expect("export");
        let imported = import_canonical(&bytes).expect("import");
        prop_assert_eq!(export_canonical(&imported).expect("export"), bytes);
    }

    /// Codepoints below the engine minimum are always flagged.
    #[test]
    fn floor_is_enforced(min in 1u64..1_000_000, below in 0u64..1_000_000) {
        prop_assume!(below < min);
        let session = Session::new().with_engine(ValidationEngine::new(Codepoint(min)));
        let raw = format!(
            r#"{{"request": {{"submitter": "a", "description": "b", "contact": "c"}},
                "entries": [{{"codepoint": {}, "canonical_name": "x", "type": "class", "description": "long enough text"}}]}}"#,
            below
        );
        let report = session.validate("p.json", raw.as_bytes()).expect("validate");
        prop_assert_eq!(report.violations.len(), 1);
        prop_assert_eq!(report.violations[0].rule.code(), "V-101");
    }

    /// Whatever mix of batches is submitted, committed entries stay pairwise
    /// distinct in codepoint, name and non-empty URI.
    #[test]
    fn submissions_preserve_uniqueness(batches in vec(vec(raw_entry(), 1..5), 1..10)) {
        let engine = ValidationEngine::default();
        let ctx = SubmissionContext::new("2026-01-01");
        let mut registry = Registry::community();

        for (i, batch) in batches.iter().enumerate() {
            let before = registry.entry_count().expect("count");
            let raw = request_document(batch);
            let outcome = submit_to(&mut registry, &engine, &format!("batch-{}", i), raw.as_bytes(), &ctx)
                .expect("submit");
            let after = registry.entry_count().expect("count");
            match outcome {
                SubmitOutcome::Committed(n) => prop_assert_eq!(after, before + n),
                SubmitOutcome::Rejected(_) => prop_assert_eq!(after, before),
            }
            let checked = check_invariants(registry.as_slice());
            prop_assert!(checked.is_ok(), "{:?}", checked);
        }

        let entries = registry.as_slice();
        let codepoints: BTreeSet<Codepoint> = entries.iter().map(|e| e.codepoint).collect();
        let names: BTreeSet<&str> = entries.iter().map(|e| e.canonical_name.as_str()).collect();
        let uris: Vec<&str> = entries.iter().filter_map(|e| e.uri_key()).collect();
        let distinct_uris: BTreeSet<&str> = uris.iter().copied().collect();
        prop_assert_eq!(codepoints.len(), entries.len());
        prop_assert_eq!(names.len(), entries.len());
        prop_assert_eq!(distinct_uris.len(), uris.len());
    }

    /// Pinned URIs always get their pinned identity, and no freshly
    /// allocated concept lands on any pinned codepoint.
    #[test]
    fn overrides_are_stable(
        locals in local_names(),
        pin_mask in vec(any::<bool>(), 30),
        pin_codepoints in btree_set(900u64..1_100, 31),
        start in 950u64..1_050,
    ) {
        let concepts = concepts_from(&locals);
        let pin_codepoints: Vec<u64> = pin_codepoints.into_iter().collect();

        let mut overrides = OverrideTable::new();
        for (i, concept) in concepts.iter().enumerate() {
            if pin_mask[i] {
                let local = concept.uri.rsplit('/').next().unwrap_or_default();
                overrides.insert(concept.uri.clone(), Codepoint(pin_codepoints[i]), format!("pinned_{}", local));
            }
        }
        // A pin for a URI outside this run.
        overrides.insert("https://elsewhere.example/Other", Codepoint(pin_codepoints[30]), "other");
        let reserved = overrides.codepoints();

        let policy = AllocationPolicy::new(Codepoint(start)).with_overrides(overrides.clone());
        let outcome = AssignmentEngine::assign(&concepts, &policy, "p").expect("assign");
        prop_assert_eq!(outcome.assignments.len(), concepts.len());

        for assignment in &outcome.assignments {
            match overrides.get(&assignment.uri) {
                Some(pin) => {
                    prop_assert_eq!(assignment.origin, AssignmentOrigin::Pinned);
                    prop_assert_eq!(assignment.codepoint, pin.codepoint);
                    prop_assert_eq!(&assignment.canonical_name, &pin.canonical_name);
                }
                None => {
                    prop_assert_eq!(assignment.origin, AssignmentOrigin::Allocated);
                    prop_assert!(!reserved.contains(&assignment.codepoint));
                    prop_assert!(assignment.codepoint.value() >= start);
                }
            }
        }
    }
}
