//! # Canonical Export Module
//!
//! Bit-exact serialization of a registry, independent of the backend.
//!
//! A `redb` file is not byte-identical across runs, and the JSON document
//! carries a `last_updated` stamp. The canonical export drops both: it is the
//! sorted entry list plus source metadata in `postcard`, preceded by a header
//! with a deterministic checksum. Two registries with the same content always
//! export to the same bytes.
//!
//! Format:
//! ```text
//! [header_len: u32 LE] [CanonicalHeader (postcard)] [CanonicalRegistry (postcard)]
//! ```

use crate::registry::{Registry, RegistryStore};
use crate::{
    Codepoint, EntryType, KvError, ProcessingStrategy, Provenance, RegistryEntry, RegistrySource,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// CANONICAL FORMAT
// =============================================================================

/// Magic bytes for canonical export format.
pub const CANONICAL_MAGIC: [u8; 4] = *b"KVRX";

/// Current canonical format version.
pub const CANONICAL_VERSION: u8 = 1;

/// Maximum entry count accepted on import.
///
/// Checked against the header before the body is decoded.
pub const MAX_IMPORT_ENTRY_COUNT: u64 = 10_000_000;

/// Header for canonical export files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub entry_count: u64,
    /// Checksum of the data section.
    pub checksum: u64,
}

impl CanonicalHeader {
    #[must_use]
    pub fn new(entry_count: u64, checksum: u64) -> Self {
        Self {
            magic: CANONICAL_MAGIC,
            version: CANONICAL_VERSION,
            entry_count,
            checksum,
        }
    }

    /// Validate the header.
    ///
    /// Error messages stay generic so they do not describe the format.
    pub fn validate(&self) -> Result<(), KvError> {
        if self.magic != CANONICAL_MAGIC {
            return Err(KvError::SerializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != CANONICAL_VERSION {
            return Err(KvError::SerializationError(
                "Unsupported file version".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// CANONICAL RECORDS
// =============================================================================
//
// postcard is not self-describing, so these mirror the document types without
// any `skip_serializing_if` attributes.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalProvenance {
    pub submitter: String,
    pub assigned_date: String,
    pub pr_number: Option<u64>,
    pub contact: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalEntry {
    pub codepoint: u64,
    pub name: String,
    pub entry_type: EntryType,
    pub uri: Option<String>,
    pub description: String,
    pub source: Option<CanonicalProvenance>,
}

impl From<&RegistryEntry> for CanonicalEntry {
    fn from(entry: &RegistryEntry) -> Self {
        Self {
            codepoint: entry.codepoint.value(),
            name: entry.canonical_name.clone(),
            entry_type: entry.entry_type,
            uri: entry.uri.clone(),
            description: entry.description.clone(),
            source: entry.source.as_ref().map(|p| CanonicalProvenance {
                submitter: p.submitter.clone(),
                assigned_date: p.assigned_date.clone(),
                pr_number: p.pr_number,
                contact: p.contact.clone(),
                url: p.url.clone(),
            }),
        }
    }
}

impl From<CanonicalEntry> for RegistryEntry {
    fn from(entry: CanonicalEntry) -> Self {
        Self {
            codepoint: Codepoint(entry.codepoint),
            canonical_name: entry.name,
            entry_type: entry.entry_type,
            uri: entry.uri,
            description: entry.description,
            source: entry.source.map(|p| Provenance {
                submitter: p.submitter,
                assigned_date: p.assigned_date,
                pr_number: p.pr_number,
                contact: p.contact,
                url: p.url,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalSource {
    pub name: String,
    pub source_url: Option<String>,
    pub start_code_point: u64,
    pub processing_strategy: ProcessingStrategy,
}

impl From<&RegistrySource> for CanonicalSource {
    fn from(source: &RegistrySource) -> Self {
        Self {
            name: source.name.clone(),
            source_url: source.source_url.clone(),
            start_code_point: source.start_code_point.value(),
            processing_strategy: source.processing_strategy,
        }
    }
}

impl From<CanonicalSource> for RegistrySource {
    fn from(source: CanonicalSource) -> Self {
        Self {
            name: source.name,
            source_url: source.source_url,
            start_code_point: Codepoint(source.start_code_point),
            processing_strategy: source.processing_strategy,
        }
    }
}

/// A registry in canonical form: metadata plus entries sorted by codepoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalRegistry {
    pub source: CanonicalSource,
    pub entries: Vec<CanonicalEntry>,
}

// FNV-1a, 64-bit.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn mix(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn mix_str(hash: u64, s: &str) -> u64 {
    // length prefix keeps ("ab","c") and ("a","bc") apart
    mix(mix(hash, &(s.len() as u64).to_le_bytes()), s.as_bytes())
}

fn mix_opt(hash: u64, s: Option<&str>) -> u64 {
    match s {
        Some(s) => mix_str(mix(hash, &[1]), s),
        None => mix(hash, &[0]),
    }
}

impl CanonicalRegistry {
    /// Build from any store. Entries come out of the store already sorted.
    pub fn from_store<S: RegistryStore + ?Sized>(store: &S) -> Result<Self, KvError> {
        let mut entries: Vec<CanonicalEntry> =
            store.entries()?.iter().map(CanonicalEntry::from).collect();
        entries.sort_by_key(|e| e.codepoint);
        Ok(Self {
            source: CanonicalSource::from(store.source()),
            entries,
        })
    }

    /// Rebuild an in-memory registry; invariants are re-checked.
    pub fn to_registry(&self) -> Result<Registry, KvError> {
        Registry::from_entries(
            RegistrySource::from(self.source.clone()),
            self.entries.iter().cloned().map(RegistryEntry::from).collect(),
        )
    }

    /// Deterministic checksum of the data section.
    ///
    /// Not a cryptographic hash: it detects accidental corruption only. Use
    /// `canonical_crypto_hash` (feature `crypto-hash`) for tamper evidence.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hash = mix_str(FNV_OFFSET, &self.source.name);
        hash = mix_opt(hash, self.source.source_url.as_deref());
        hash = mix(hash, &self.source.start_code_point.to_le_bytes());

        for entry in &self.entries {
            hash = mix(hash, &entry.codepoint.to_le_bytes());
            hash = mix_str(hash, &entry.name);
            hash = mix_str(hash, entry.entry_type.as_str());
            hash = mix_opt(hash, entry.uri.as_deref());
            hash = mix_str(hash, &entry.description);
            match &entry.source {
                Some(p) => {
                    hash = mix(hash, &[1]);
                    hash = mix_str(hash, &p.submitter);
                    hash = mix_str(hash, &p.assigned_date);
                    hash = mix(hash, &p.pr_number.unwrap_or(0).to_le_bytes());
                    hash = mix_opt(hash, p.contact.as_deref());
                    hash = mix_opt(hash, p.url.as_deref());
                }
                None => hash = mix(hash, &[0]),
            }
        }
        hash
    }
}

// =============================================================================
// EXPORT FUNCTIONS
// =============================================================================

/// Export a registry to canonical postcard format.
pub fn export_canonical<S: RegistryStore + ?Sized>(store: &S) -> Result<Vec<u8>, KvError> {
    let canonical = CanonicalRegistry::from_store(store)?;
    let header = CanonicalHeader::new(canonical.entries.len() as u64, canonical.checksum());

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| KvError::SerializationError(format!("Header: {}", e)))?;
    let data_bytes = postcard::to_allocvec(&canonical)
        .map_err(|e| KvError::SerializationError(format!("Data: {}", e)))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);
    Ok(result)
}

/// Import a registry from canonical postcard format.
///
/// Checks header, entry-count limit, checksum, counts and store invariants.
pub fn import_canonical(data: &[u8]) -> Result<Registry, KvError> {
    let len_bytes: [u8; 4] = data
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| KvError::SerializationError("Data too short".to_string()))?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    let header_end = 4usize
        .checked_add(header_len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| KvError::SerializationError("Data too short for header".to_string()))?;

    let header: CanonicalHeader = postcard::from_bytes(&data[4..header_end])
        .map_err(|e| KvError::SerializationError(format!("Header: {}", e)))?;
    header.validate()?;

    if header.entry_count > MAX_IMPORT_ENTRY_COUNT {
        return Err(KvError::SerializationError(format!(
            "Entry count {} exceeds maximum allowed {}",
            header.entry_count, MAX_IMPORT_ENTRY_COUNT
        )));
    }

    let canonical: CanonicalRegistry = postcard::from_bytes(&data[header_end..])
        .map_err(|e| KvError::SerializationError(format!("Data: {}", e)))?;

    let computed = canonical.checksum();
    if computed != header.checksum {
        return Err(KvError::SerializationError(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }
    if canonical.entries.len() as u64 != header.entry_count {
        return Err(KvError::SerializationError(
            "Entry count mismatch".to_string(),
        ));
    }

    canonical.to_registry()
}

/// Compute the canonical checksum of a registry.
pub fn canonical_checksum<S: RegistryStore + ?Sized>(store: &S) -> Result<u64, KvError> {
    Ok(CanonicalRegistry::from_store(store)?.checksum())
}

/// Whether `store` has exactly the content of `canonical_data`.
pub fn verify_canonical<S: RegistryStore + ?Sized>(
    store: &S,
    canonical_data: &[u8],
) -> Result<bool, KvError> {
    let imported = import_canonical(canonical_data)?;
    Ok(CanonicalRegistry::from_store(store)? == CanonicalRegistry::from_store(&imported)?)
}

// =============================================================================
// CRYPTOGRAPHIC HASH SUPPORT
// =============================================================================

/// BLAKE3 hex digest (64 characters) of the canonical export.
#[cfg(feature = "crypto-hash")]
pub fn canonical_crypto_hash<S: RegistryStore + ?Sized>(store: &S) -> Result<String, KvError> {
    let data = export_canonical(store)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Registry {
        let mut registry = Registry::new(RegistrySource::new("rdf", Codepoint(2000)));
        registry
            .append(vec![
                RegistryEntry::new(Codepoint(2001), "rdf:value", EntryType::Property, "")
                    .with_uri("http://r#value"),
                RegistryEntry::new(Codepoint(2000), "rdf:type", EntryType::Property, "The type")
                    .with_uri("http://r#type"),
            ])
            .unwrap();
        registry
    }

    #[test]
    fn export_import_preserves_registry() {
        let registry = sample();
        let bytes = export_canonical(&registry).unwrap();
        let imported = import_canonical(&bytes).unwrap();
        assert_eq!(imported, registry);
        assert!(verify_canonical(&registry, &bytes).unwrap());
    }

    #[test]
    fn export_is_deterministic_across_insertion_order() {
        let a = sample();
        let mut b = Registry::new(RegistrySource::new("rdf", Codepoint(2000)));
        let mut entries = a.entries().unwrap();
        entries.reverse();
        for e in entries {
            b.append(vec![e]).unwrap();
        }
        assert_eq!(export_canonical(&a).unwrap(), export_canonical(&b).unwrap());
        assert_eq!(canonical_checksum(&a).unwrap(), canonical_checksum(&b).unwrap());
    }

    #[test]
    fn checksum_sees_field_boundaries() {
        let mut a = Registry::community();
        a.append(vec![RegistryEntry::new(Codepoint(100_000), "ab", EntryType::Class, "c")])
            .unwrap();
        let mut b = Registry::community();
        b.append(vec![RegistryEntry::new(Codepoint(100_000), "a", EntryType::Class, "bc")])
            .unwrap();
        assert_ne!(canonical_checksum(&a).unwrap(), canonical_checksum(&b).unwrap());
    }

    #[test]
    fn corrupted_body_is_rejected() {
        let mut bytes = export_canonical(&sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(import_canonical(&bytes).is_err());
    }

    #[test]
    fn short_input_is_rejected() {
        assert!(import_canonical(&[1, 2]).is_err());
        assert!(import_canonical(&[200, 0, 0, 0, 1]).is_err());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let header = CanonicalHeader {
            magic: *b"NOPE",
            ..CanonicalHeader::new(0, 0)
        };
        assert!(header.validate().is_err());
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn blake3_digest_is_stable() {
        let a = canonical_crypto_hash(&sample()).unwrap();
        let b = canonical_crypto_hash(&sample()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
