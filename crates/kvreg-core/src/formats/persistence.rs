//! # Persistence Format
//!
//! JSON registry documents.
//!
//! ```text
//! {
//!   "ontology":   { name, start_code_point, source_url?, processing_strategy },
//!   "generated":  { tool, version, last_updated? },
//!   "entries":    [ ... ascending by codepoint ... ],
//!   "statistics": { total_entries, code_point_range: { start, end } }
//! }
//! ```
//!
//! `statistics` is recomputed on every write and ignored on read. Entries are
//! re-sorted on read and checked against the store invariants, so a
//! hand-edited file with duplicates is refused instead of silently loaded.
//!
//! ## Security
//!
//! Document size is checked BEFORE parsing.

use crate::registry::{Registry, RegistryStatistics, RegistryStore};
use crate::{Generated, KvError, RegistryEntry, RegistrySource};
use serde::{Deserialize, Serialize};

/// Maximum accepted registry document size (64 MiB).
pub const MAX_REGISTRY_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

// =============================================================================
// DOCUMENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(rename = "ontology", alias = "source-metadata", default)]
    pub source: RegistrySource,
    #[serde(default)]
    pub generated: Generated,
    #[serde(default)]
    pub entries: Vec<RegistryEntry>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<RegistryStatistics>,
}

impl RegistryDocument {
    /// Snapshot a store into a document, stamping `last_updated` when given.
    pub fn from_store<S: RegistryStore + ?Sized>(
        store: &S,
        last_updated: Option<&str>,
    ) -> Result<Self, KvError> {
        let entries = store.entries()?;
        let statistics = RegistryStatistics::compute(&entries, store.minimum_codepoint());
        Ok(Self {
            source: store.source().clone(),
            generated: Generated {
                last_updated: last_updated.map(str::to_string),
                ..Generated::default()
            },
            entries,
            statistics: Some(statistics),
        })
    }

    /// Rebuild an in-memory registry, re-sorting and checking invariants.
    pub fn into_registry(self) -> Result<Registry, KvError> {
        Registry::from_entries(self.source, self.entries)
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Parse a registry document.
pub fn registry_from_slice(raw: &[u8]) -> Result<Registry, KvError> {
    if raw.len() > MAX_REGISTRY_DOCUMENT_SIZE {
        return Err(KvError::DeserializationError(format!(
            "Registry document is {} bytes, exceeds maximum {}",
            raw.len(),
            MAX_REGISTRY_DOCUMENT_SIZE
        )));
    }
    let document: RegistryDocument = serde_json::from_slice(raw)
        .map_err(|e| KvError::DeserializationError(format!("Registry document: {}", e)))?;
    document.into_registry()
}

/// Serialize a store as a pretty-printed document with a trailing newline.
pub fn registry_to_vec<S: RegistryStore + ?Sized>(
    store: &S,
    last_updated: Option<&str>,
) -> Result<Vec<u8>, KvError> {
    let document = RegistryDocument::from_store(store, last_updated)?;
    let mut bytes = serde_json::to_vec_pretty(&document)
        .map_err(|e| KvError::SerializationError(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Load from persisted bytes; an absent store is an empty registry.
pub fn load_registry(raw: Option<&[u8]>, fallback: RegistrySource) -> Result<Registry, KvError> {
    match raw {
        Some(bytes) => registry_from_slice(bytes),
        None => Ok(Registry::new(fallback)),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Codepoint, EntryType, Provenance};

    fn sample() -> Registry {
        let mut registry = Registry::community();
        registry
            .append(vec![
                RegistryEntry::new(Codepoint(100_002), "beta", EntryType::Property, "Second entry")
                    .with_uri("https://example.com/beta"),
                RegistryEntry::new(Codepoint(100_001), "alpha", EntryType::Class, "First entry")
                    .with_source(Provenance {
                        submitter: "Alice".to_string(),
                        assigned_date: "2026-03-04".to_string(),
                        pr_number: Some(7),
                        contact: None,
                        url: None,
                    }),
            ])
            .unwrap();
        registry
    }

    #[test]
    fn write_then_read_preserves_entries() {
        let registry = sample();
        let bytes = registry_to_vec(&registry, Some("2026-03-04T00:00:00+00:00")).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));

        let loaded = registry_from_slice(&bytes).unwrap();
        assert_eq!(loaded, registry);
    }

    #[test]
    fn written_document_layout() {
        let bytes = registry_to_vec(&sample(), None).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["ontology"]["name"], "community_registry");
        assert_eq!(json["ontology"]["start_code_point"], 100_000);
        assert_eq!(json["ontology"]["processing_strategy"], "Custom");
        assert_eq!(json["generated"]["tool"], "kvreg");
        assert!(json["generated"].get("last_updated").is_none());
        assert_eq!(json["entries"][0]["name"], "alpha");
        assert_eq!(json["entries"][0]["source"]["pr_number"], 7);
        assert_eq!(json["statistics"]["total_entries"], 2);
        assert_eq!(json["statistics"]["code_point_range"]["start"], 100_001);
        assert_eq!(json["statistics"]["code_point_range"]["end"], 100_002);
    }

    #[test]
    fn read_sorts_and_ignores_statistics() {
        let raw = br#"{
            "source-metadata": {"name": "x", "start_code_point": 10},
            "entries": [
                {"codepoint": 12, "name": "b", "type": "class", "description": ""},
                {"codepoint": 11, "canonical_name": "a", "type": "class", "description": ""}
            ],
            "statistics": {"total_entries": 99, "code_point_range": {"start": 0, "end": 0}}
        }"#;
        let registry = registry_from_slice(raw).unwrap();
        let names: Vec<String> = registry
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.canonical_name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.statistics().unwrap().total_entries, 2);
        assert_eq!(registry.minimum_codepoint(), Codepoint(10));
    }

    #[test]
    fn read_rejects_duplicate_codepoints() {
        let raw = br#"{"entries": [
            {"codepoint": 100001, "name": "a", "type": "class"},
            {"codepoint": 100001, "name": "b", "type": "class"}
        ]}"#;
        assert!(matches!(
            registry_from_slice(raw),
            Err(KvError::InvariantViolation(_))
        ));
    }

    #[test]
    fn absent_store_is_empty() {
        let registry = load_registry(None, RegistrySource::community()).unwrap();
        assert!(registry.is_empty());
        let stats = registry.statistics().unwrap();
        assert_eq!(stats.code_point_range.start, 100_000);
        assert_eq!(stats.code_point_range.end, None);
    }

    #[test]
    fn garbage_is_a_deserialization_error() {
        assert!(matches!(
            registry_from_slice(b"[]"),
            Err(KvError::DeserializationError(_))
        ));
    }
}
