//! # Innate Primitives
//!
//! Hardcoded constants of the kvreg core.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Changing any of them changes which submissions are accepted or which
//! codepoints an ontology run produces, so they are versioned with the crate.

// =============================================================================
// CODEPOINT RANGES
// =============================================================================

/// Lowest codepoint a community submission may claim.
///
/// Everything below is reserved for the core registry and ontology ranges.
pub const MIN_COMMUNITY_CODEPOINT: u64 = 100_000;

/// Name of the community registry document.
pub const COMMUNITY_REGISTRY_NAME: &str = "community_registry";

/// Reserved core known values that ontology URIs are checked against.
///
/// `(codepoint, name, uri suffixes)`: an assigned URI ending in one of the
/// suffixes raises a collision advisory naming the reserved value.
pub const RESERVED_KNOWN_VALUES: &[(u64, &str, &[&str])] = &[
    (1, "isA", &["#type", "/type"]),
    (2, "id", &["#identifier", "/identifier"]),
];

// =============================================================================
// NAMING
// =============================================================================

/// Minimum description length (in characters) enforced on submissions.
pub const MIN_DESCRIPTION_LENGTH: usize = 10;

/// Local name used when neither URI nor label yields one.
pub const FALLBACK_LOCAL_NAME: &str = "unknown";

/// Label placeholder emitted by RDF extractors; treated as no label.
pub const NO_LABEL_SENTINEL: &str = "[No Label]";

/// Maximum length for canonical names (including any namespace prefix).
pub const MAX_NAME_LENGTH: usize = 256;

// =============================================================================
// DOCUMENT STAMP
// =============================================================================

/// Tool name recorded in the `generated` section of registry documents.
pub const TOOL_NAME: &str = "kvreg";

/// Registry document format version recorded in the `generated` section.
pub const REGISTRY_FORMAT_VERSION: &str = "1.0";

// =============================================================================
// INPUT LIMITS
// =============================================================================

/// Maximum size of a registry or request document accepted for parsing (16 MiB).
pub const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

/// Maximum number of entries in a single submission batch.
///
/// Larger batches are rejected at schema level.
pub const MAX_BATCH_ENTRIES: usize = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn community_floor_is_one_hundred_thousand() {
        assert_eq!(MIN_COMMUNITY_CODEPOINT, 100_000);
    }

    #[test]
    fn reserved_values_are_is_a_and_id() {
        let names: Vec<&str> = RESERVED_KNOWN_VALUES.iter().map(|(_, n, _)| *n).collect();
        assert_eq!(names, vec!["isA", "id"]);
    }
}
