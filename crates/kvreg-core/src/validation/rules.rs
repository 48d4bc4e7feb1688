//! Entry rules V-003 through V-203.
//!
//! Each rule is a pure function over the whole batch. [`ENTRY_RULES`] fixes
//! the order in which they run and therefore the order of violations.

use super::{RuleId, Violation};
use crate::primitives::MIN_DESCRIPTION_LENGTH;
use crate::registry::RegistrySnapshot;
use crate::{CandidateEntry, Codepoint, EntryType};
use std::collections::BTreeMap;

pub(super) struct RuleContext<'a> {
    pub batch: &'a str,
    pub entries: &'a [CandidateEntry],
    pub snapshot: &'a RegistrySnapshot,
    pub min_codepoint: Codepoint,
}

type Rule = fn(&RuleContext<'_>) -> Vec<Violation>;

pub(super) const ENTRY_RULES: [(RuleId, Rule); 11] = [
    (RuleId::NameFormat, name_format),
    (RuleId::TypeEnum, type_enum),
    (RuleId::DescriptionLength, description_length),
    (RuleId::CodepointPresence, codepoint_presence),
    (RuleId::CodepointFloor, codepoint_floor),
    (RuleId::CodepointAvailability, codepoint_availability),
    (RuleId::CodepointUniqueInBatch, codepoint_unique_in_batch),
    (RuleId::NameAvailability, name_availability),
    (RuleId::UriAvailability, uri_availability),
    (RuleId::NameUniqueInBatch, name_unique_in_batch),
    (RuleId::UriUniqueInBatch, uri_unique_in_batch),
];

/// `^[A-Za-z][A-Za-z0-9_]*$`, ASCII only.
#[must_use]
pub fn is_valid_canonical_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn violation(ctx: &RuleContext<'_>, rule: RuleId, index: usize, field: &str, message: String) -> Violation {
    Violation::new(rule, ctx.batch, message).at(index).on(field)
}

// =============================================================================
// FORMAT RULES
// =============================================================================

fn name_format(ctx: &RuleContext<'_>) -> Vec<Violation> {
    ctx.entries
        .iter()
        .enumerate()
        .filter(|(_, e)| !is_valid_canonical_name(&e.canonical_name))
        .map(|(i, e)| {
            violation(
                ctx,
                RuleId::NameFormat,
                i,
                "canonical_name",
                format!(
                    "Invalid canonical_name '{}': must match ^[a-zA-Z][a-zA-Z0-9_]*$",
                    e.canonical_name
                ),
            )
        })
        .collect()
}

fn type_enum(ctx: &RuleContext<'_>) -> Vec<Violation> {
    let mut allowed: Vec<&str> = EntryType::ALL.iter().map(|t| t.as_str()).collect();
    allowed.sort_unstable();
    let allowed = format!(
        "[{}]",
        allowed
            .iter()
            .map(|t| format!("'{}'", t))
            .collect::<Vec<_>>()
            .join(", ")
    );

    ctx.entries
        .iter()
        .enumerate()
        .filter(|(_, e)| EntryType::parse(&e.entry_type).is_none())
        .map(|(i, e)| {
            violation(
                ctx,
                RuleId::TypeEnum,
                i,
                "type",
                format!("Invalid type '{}': must be one of {}", e.entry_type, allowed),
            )
        })
        .collect()
}

fn description_length(ctx: &RuleContext<'_>) -> Vec<Violation> {
    ctx.entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| {
            let len = e.description.chars().count();
            (len < MIN_DESCRIPTION_LENGTH).then(|| {
                violation(
                    ctx,
                    RuleId::DescriptionLength,
                    i,
                    "description",
                    format!(
                        "Description too short ({} chars): must be at least {} characters",
                        len, MIN_DESCRIPTION_LENGTH
                    ),
                )
            })
        })
        .collect()
}

// =============================================================================
// CODEPOINT RULES
// =============================================================================

fn codepoint_presence(ctx: &RuleContext<'_>) -> Vec<Violation> {
    ctx.entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.codepoint.is_none())
        .map(|(i, _)| {
            violation(
                ctx,
                RuleId::CodepointPresence,
                i,
                "codepoint",
                "Missing required field: 'codepoint'".to_string(),
            )
        })
        .collect()
}

fn codepoint_floor(ctx: &RuleContext<'_>) -> Vec<Violation> {
    let min = ctx.min_codepoint.value();
    ctx.entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.codepoint.map(|cp| (i, cp)))
        .filter(|(_, cp)| *cp < min)
        .map(|(i, cp)| {
            violation(
                ctx,
                RuleId::CodepointFloor,
                i,
                "codepoint",
                format!("Codepoint {} is less than minimum ({})", cp, min),
            )
        })
        .collect()
}

fn codepoint_availability(ctx: &RuleContext<'_>) -> Vec<Violation> {
    ctx.entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.codepoint.map(|cp| (i, cp)))
        .filter(|(_, cp)| ctx.snapshot.codepoints.contains(&Codepoint(*cp)))
        .map(|(i, cp)| {
            violation(
                ctx,
                RuleId::CodepointAvailability,
                i,
                "codepoint",
                format!("Codepoint {} is already assigned in the registry", cp),
            )
        })
        .collect()
}

fn codepoint_unique_in_batch(ctx: &RuleContext<'_>) -> Vec<Violation> {
    let mut first_seen: BTreeMap<u64, usize> = BTreeMap::new();
    let mut violations = Vec::new();
    for (i, entry) in ctx.entries.iter().enumerate() {
        let Some(cp) = entry.codepoint else {
            continue;
        };
        match first_seen.get(&cp) {
            Some(&first) => violations.push(
                violation(
                    ctx,
                    RuleId::CodepointUniqueInBatch,
                    i,
                    "codepoint",
                    format!("Codepoint {} is duplicated (also in entry {})", cp, first),
                )
                .related_to(first),
            ),
            None => {
                first_seen.insert(cp, i);
            }
        }
    }
    violations
}

// =============================================================================
// NAME & URI RULES
// =============================================================================

fn name_availability(ctx: &RuleContext<'_>) -> Vec<Violation> {
    ctx.entries
        .iter()
        .enumerate()
        .filter(|(_, e)| ctx.snapshot.names.contains(&e.canonical_name))
        .map(|(i, e)| {
            violation(
                ctx,
                RuleId::NameAvailability,
                i,
                "canonical_name",
                format!(
                    "Canonical name '{}' is already assigned in the registry",
                    e.canonical_name
                ),
            )
        })
        .collect()
}

fn uri_availability(ctx: &RuleContext<'_>) -> Vec<Violation> {
    ctx.entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| {
            e.uri
                .as_deref()
                .filter(|u| !u.is_empty())
                .map(|u| (i, u))
        })
        .filter(|(_, uri)| ctx.snapshot.uris.contains(*uri))
        .map(|(i, uri)| {
            violation(
                ctx,
                RuleId::UriAvailability,
                i,
                "uri",
                format!("URI '{}' is already assigned in the registry", uri),
            )
        })
        .collect()
}

fn name_unique_in_batch(ctx: &RuleContext<'_>) -> Vec<Violation> {
    let mut first_seen: BTreeMap<&str, usize> = BTreeMap::new();
    let mut violations = Vec::new();
    for (i, entry) in ctx.entries.iter().enumerate() {
        let name = entry.canonical_name.as_str();
        match first_seen.get(name) {
            Some(&first) => violations.push(
                violation(
                    ctx,
                    RuleId::NameUniqueInBatch,
                    i,
                    "canonical_name",
                    format!(
                        "Canonical name '{}' is duplicated (also in entry {})",
                        name, first
                    ),
                )
                .related_to(first),
            ),
            None => {
                first_seen.insert(name, i);
            }
        }
    }
    violations
}

fn uri_unique_in_batch(ctx: &RuleContext<'_>) -> Vec<Violation> {
    let mut first_seen: BTreeMap<&str, usize> = BTreeMap::new();
    let mut violations = Vec::new();
    for (i, entry) in ctx.entries.iter().enumerate() {
        let Some(uri) = entry.uri.as_deref().filter(|u| !u.is_empty()) else {
            continue;
        };
        match first_seen.get(uri) {
            Some(&first) => violations.push(
                violation(
                    ctx,
                    RuleId::UriUniqueInBatch,
                    i,
                    "uri",
                    format!("URI '{}' is duplicated (also in entry {})", uri, first),
                )
                .related_to(first),
            ),
            None => {
                first_seen.insert(uri, i);
            }
        }
    }
    violations
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn run(entries: &[CandidateEntry], snapshot: &RegistrySnapshot) -> Vec<Violation> {
        let ctx = RuleContext {
            batch: "req.json",
            entries,
            snapshot,
            min_codepoint: Codepoint(100_000),
        };
        ENTRY_RULES.iter().flat_map(|(_, rule)| rule(&ctx)).collect()
    }

    fn ok_entry(cp: u64, name: &str) -> CandidateEntry {
        CandidateEntry::new(cp, name, "class", "A perfectly fine description")
    }

    #[test]
    fn rule_order_is_fixed() {
        let ids: Vec<&str> = ENTRY_RULES.iter().map(|(id, _)| id.code()).collect();
        assert_eq!(
            ids,
            vec![
                "V-003", "V-004", "V-005", "V-100", "V-101", "V-102", "V-103", "V-200", "V-201",
                "V-202", "V-203"
            ]
        );
    }

    #[test]
    fn canonical_name_pattern() {
        assert!(is_valid_canonical_name("foo"));
        assert!(is_valid_canonical_name("Foo_Bar9"));
        assert!(!is_valid_canonical_name(""));
        assert!(!is_valid_canonical_name("9lives"));
        assert!(!is_valid_canonical_name("_private"));
        assert!(!is_valid_canonical_name("has space"));
        assert!(!is_valid_canonical_name("dash-ed"));
        assert!(!is_valid_canonical_name("rdf:type"));
        assert!(!is_valid_canonical_name("trailing\n"));
        assert!(!is_valid_canonical_name("caf\u{e9}"));
    }

    #[test]
    fn format_rules_report_each_entry() {
        let entries = vec![
            CandidateEntry::new(100_000, "1bad", "class", "A perfectly fine description"),
            CandidateEntry::new(100_001, "good", "thing", "short"),
        ];
        let violations = run(&entries, &RegistrySnapshot::default());
        let got: Vec<(RuleId, Option<usize>)> =
            violations.iter().map(|v| (v.rule, v.entry_index)).collect();
        assert_eq!(
            got,
            vec![
                (RuleId::NameFormat, Some(0)),
                (RuleId::TypeEnum, Some(1)),
                (RuleId::DescriptionLength, Some(1)),
            ]
        );
        assert_eq!(
            violations[1].message,
            "Invalid type 'thing': must be one of ['class', 'constant', 'datatype', 'property']"
        );
        assert_eq!(
            violations[2].message,
            "Description too short (5 chars): must be at least 10 characters"
        );
    }

    #[test]
    fn description_length_counts_characters() {
        // ten characters, more than ten bytes
        let entries = vec![CandidateEntry::new(100_000, "x", "class", "\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}")];
        assert!(run(&entries, &RegistrySnapshot::default()).is_empty());
    }

    #[test]
    fn floor_and_availability() {
        let mut snapshot = RegistrySnapshot::default();
        snapshot.codepoints.insert(Codepoint(100_005));
        let entries = vec![ok_entry(99_999, "low"), ok_entry(100_005, "taken")];
        let violations = run(&entries, &snapshot);

        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].rule, RuleId::CodepointFloor);
        assert_eq!(
            violations[0].message,
            "Codepoint 99999 is less than minimum (100000)"
        );
        assert_eq!(violations[1].rule, RuleId::CodepointAvailability);
        assert_eq!(violations[1].entry_index, Some(1));
    }

    #[test]
    fn in_batch_duplicates_point_back() {
        let entries = vec![
            ok_entry(100_000, "a"),
            ok_entry(100_001, "b"),
            ok_entry(100_000, "a"),
        ];
        let violations = run(&entries, &RegistrySnapshot::default());

        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].rule, RuleId::CodepointUniqueInBatch);
        assert_eq!(violations[0].entry_index, Some(2));
        assert_eq!(violations[0].related_index, Some(0));
        assert_eq!(
            violations[0].message,
            "Codepoint 100000 is duplicated (also in entry 0)"
        );
        assert_eq!(violations[1].rule, RuleId::NameUniqueInBatch);
        assert_eq!(violations[1].related_index, Some(0));
    }

    #[test]
    fn registry_held_name_and_uri() {
        let mut snapshot = RegistrySnapshot::default();
        snapshot.names.insert("foo".to_string());
        snapshot.uris.insert("http://x/foo".to_string());

        let entries = vec![
            ok_entry(100_000, "foo").with_uri("http://x/foo"),
            ok_entry(100_001, "bar").with_uri(""),
        ];
        let violations = run(&entries, &snapshot);
        let rules: Vec<RuleId> = violations.iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec![RuleId::NameAvailability, RuleId::UriAvailability]);
        assert_eq!(violations[1].field.as_deref(), Some("uri"));
    }

    #[test]
    fn shared_uri_within_batch() {
        let entries = vec![
            ok_entry(100_000, "a").with_uri("http://x/shared"),
            ok_entry(100_001, "b").with_uri(""),
            ok_entry(100_002, "c").with_uri(""),
            ok_entry(100_003, "d").with_uri("http://x/shared"),
        ];
        let violations = run(&entries, &RegistrySnapshot::default());

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, RuleId::UriUniqueInBatch);
        assert_eq!(violations[0].entry_index, Some(3));
        assert_eq!(violations[0].related_index, Some(0));
        assert_eq!(violations[0].field.as_deref(), Some("uri"));
    }
}
