//! # Core Type Definitions
//!
//! This module contains all core types for the kvreg registry:
//! - Identifiers (`Codepoint`)
//! - Committed entries (`RegistryEntry`, `Provenance`, `EntryType`)
//! - Document metadata (`RegistrySource`, `Generated`, `ProcessingStrategy`)
//! - Ephemeral inputs (`CandidateEntry`, `CandidateBatch`, `Concept`)
//! - Error types (`KvError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they act as keys, for `BTreeMap`/`BTreeSet` ordering
//! - Carry no timestamps of their own; dates are supplied by the caller

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::primitives::{COMMUNITY_REGISTRY_NAME, MIN_COMMUNITY_CODEPOINT, REGISTRY_FORMAT_VERSION, TOOL_NAME};

// =============================================================================
// CODEPOINT
// =============================================================================

/// A Known Value codepoint: the durable 64-bit identifier of a concept.
///
/// Serializes as a bare integer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Codepoint(pub u64);

impl Codepoint {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The next codepoint, or `None` when the 64-bit space is exhausted.
    #[must_use]
    pub const fn checked_next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Display for Codepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Codepoint {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// =============================================================================
// ENTRY TYPE
// =============================================================================

/// The closed set of registry entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Class,
    Property,
    Datatype,
    Constant,
}

impl EntryType {
    /// All variants, in their canonical listing order.
    pub const ALL: [EntryType; 4] = [
        EntryType::Class,
        EntryType::Property,
        EntryType::Datatype,
        EntryType::Constant,
    ];

    /// Parse the exact lowercase wire form. Anything else is rejected.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "class" => Some(Self::Class),
            "property" => Some(Self::Property),
            "datatype" => Some(Self::Datatype),
            "constant" => Some(Self::Constant),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Property => "property",
            Self::Datatype => "datatype",
            Self::Constant => "constant",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PROVENANCE
// =============================================================================

/// Who asked for an entry and when it was granted.
///
/// Only community submissions carry provenance; ontology-derived entries do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub submitter: String,
    /// `YYYY-MM-DD`, supplied by the committing caller.
    pub assigned_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// =============================================================================
// REGISTRY ENTRY
// =============================================================================

/// A committed registry entry. Immutable once written.
///
/// The persisted key for `canonical_name` is `name`; `canonical_name` is
/// accepted on read so request-shaped entries load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub codepoint: Codepoint,
    #[serde(rename = "name", alias = "canonical_name")]
    pub canonical_name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Provenance>,
}

impl RegistryEntry {
    #[must_use]
    pub fn new(
        codepoint: Codepoint,
        canonical_name: impl Into<String>,
        entry_type: EntryType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            codepoint,
            canonical_name: canonical_name.into(),
            entry_type,
            uri: None,
            description: description.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Provenance) -> Self {
        self.source = Some(source);
        self
    }

    /// The URI if present and non-empty. Empty URIs never take part in uniqueness.
    #[must_use]
    pub fn uri_key(&self) -> Option<&str> {
        self.uri.as_deref().filter(|u| !u.is_empty())
    }
}

// =============================================================================
// DOCUMENT METADATA
// =============================================================================

/// How the concepts of a registry were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProcessingStrategy {
    /// Hand-curated or community-submitted entries.
    #[default]
    Custom,
    #[serde(rename = "StandardRDF")]
    StandardRdf,
    #[serde(rename = "SchemaOrgLD")]
    SchemaOrgLd,
    ContextMap,
}

/// Source metadata of a registry document (`ontology` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// First codepoint of the range; also the configured minimum of the store.
    pub start_code_point: Codepoint,
    #[serde(default)]
    pub processing_strategy: ProcessingStrategy,
}

impl RegistrySource {
    #[must_use]
    pub fn new(name: impl Into<String>, start_code_point: Codepoint) -> Self {
        Self {
            name: name.into(),
            source_url: None,
            start_code_point,
            processing_strategy: ProcessingStrategy::Custom,
        }
    }

    /// The community registry: custom entries from `100000` upward.
    #[must_use]
    pub fn community() -> Self {
        Self::new(COMMUNITY_REGISTRY_NAME, Codepoint(MIN_COMMUNITY_CODEPOINT))
    }
}

impl Default for RegistrySource {
    fn default() -> Self {
        Self::community()
    }
}

/// Tool stamp of a registry document (`generated` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generated {
    pub tool: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Default for Generated {
    fn default() -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            version: REGISTRY_FORMAT_VERSION.to_string(),
            last_updated: None,
        }
    }
}

// =============================================================================
// CANDIDATES (submission path)
// =============================================================================

/// Request metadata of a submission document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestInfo {
    pub submitter: String,
    pub description: String,
    pub contact: String,
    pub url: Option<String>,
}

/// A proposed entry, not yet committed.
///
/// Fields are held loosely so every rule can report on the raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    pub codepoint: Option<u64>,
    pub canonical_name: String,
    /// Raw type string, checked against `EntryType` by the type rule.
    pub entry_type: String,
    pub uri: Option<String>,
    pub description: String,
}

impl CandidateEntry {
    #[must_use]
    pub fn new(
        codepoint: u64,
        canonical_name: impl Into<String>,
        entry_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            codepoint: Some(codepoint),
            canonical_name: canonical_name.into(),
            entry_type: entry_type.into(),
            uri: None,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}

/// A whole submission: request metadata plus its entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateBatch {
    pub request: RequestInfo,
    pub entries: Vec<CandidateEntry>,
}

// =============================================================================
// CONCEPTS (ontology path)
// =============================================================================

/// Kind of an extracted ontology concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConceptType {
    Class,
    Property,
    Datatype,
}

impl ConceptType {
    /// Case-insensitive parse of `Class`, `Property` or `Datatype`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "class" => Some(Self::Class),
            "property" => Some(Self::Property),
            "datatype" => Some(Self::Datatype),
            _ => None,
        }
    }

    #[must_use]
    pub const fn entry_type(self) -> EntryType {
        match self {
            Self::Class => EntryType::Class,
            Self::Property => EntryType::Property,
            Self::Datatype => EntryType::Datatype,
        }
    }
}

/// A normalized semantic unit extracted from an ontology source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Concept {
    pub uri: String,
    pub label: String,
    pub description: String,
    #[serde(rename = "type")]
    pub concept_type: ConceptType,
}

impl Concept {
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        concept_type: ConceptType,
    ) -> Self {
        Self {
            uri: uri.into(),
            label: label.into(),
            description: description.into(),
            concept_type,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the kvreg core.
///
/// Expected-shape problems in submissions are NOT errors: they are reported
/// as violations. These variants cover fatal unit failures, store conflicts
/// and I/O.
#[derive(Debug, Error)]
pub enum KvError {
    /// A concept record could not be interpreted.
    #[error("Invalid concept: {0}")]
    InvalidConcept(String),

    /// Two distinct URIs derived the same canonical name in one allocation run.
    #[error("Found {} duplicate canonical name(s) in {unit}", duplicates.len())]
    DuplicateCanonicalNames {
        unit: String,
        /// name -> every URI that produced it, in processing order
        duplicates: BTreeMap<String, Vec<String>>,
    },

    /// Two assignments of one allocation run share a codepoint.
    #[error("Found {} duplicate codepoint(s) in {unit}", duplicates.len())]
    DuplicateCodepoints {
        unit: String,
        duplicates: BTreeMap<Codepoint, Vec<String>>,
    },

    /// Sequential allocation ran past `u64::MAX`.
    #[error("Codepoint space exhausted in {0}")]
    CodepointSpaceExhausted(String),

    /// A merge tried to give an already-registered URI a different identity.
    #[error(
        "URI {uri} is registered as {existing_name} ({existing_codepoint}), refusing reassignment to {proposed_name} ({proposed_codepoint})"
    )]
    Reassignment {
        uri: String,
        existing_codepoint: Codepoint,
        existing_name: String,
        proposed_codepoint: Codepoint,
        proposed_name: String,
    },

    /// A merge tried to reuse a codepoint or name held by a different entry.
    #[error("{field} {value} is already held by {held_by}")]
    MergeConflict {
        field: &'static str,
        value: String,
        held_by: String,
    },

    /// A merge conflict, tagged with the registry file it was merging into.
    #[error("{target}: {source}")]
    MergeRefused {
        target: String,
        source: Box<KvError>,
    },

    /// A store invariant is broken. Programming-level; never a user violation.
    #[error("Registry invariant violated: {0}")]
    InvariantViolation(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl KvError {
    /// Multi-line listing of the offending names/codepoints for fatal
    /// assignment failures. Empty for other variants.
    #[must_use]
    pub fn details(&self) -> Vec<String> {
        match self {
            Self::DuplicateCanonicalNames { duplicates, .. } => duplicates
                .iter()
                .map(|(name, uris)| format!("{}: {}", name, uris.join(", ")))
                .collect(),
            Self::DuplicateCodepoints { duplicates, .. } => duplicates
                .iter()
                .map(|(cp, uris)| format!("{}: {}", cp, uris.join(", ")))
                .collect(),
            Self::MergeRefused { source, .. } => source.details(),
            _ => Vec::new(),
        }
    }

    /// Attach the registry file a merge was writing to.
    #[must_use]
    pub fn merging_into(self, target: &std::path::Path) -> Self {
        Self::MergeRefused {
            target: target.display().to_string(),
            source: Box::new(self),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
