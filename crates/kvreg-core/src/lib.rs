//! # kvreg-core
//!
//! The Registry Consistency Engine for kvreg - THE LOGIC.
//!
//! This crate keeps a registry of Known Value codepoints consistent. It owns
//! the two paths by which entries enter a registry:
//!
//! - **Submission path**: a candidate batch is checked by the
//!   [`ValidationEngine`] against a read-only snapshot of the store and, only
//!   when clean, appended as one unit.
//! - **Ontology path**: concepts from a [`Normalizer`] are turned into
//!   codepoint/name assignments by the [`AssignmentEngine`] and merged into the
//!   store without ever reassigning a committed identity.
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network, NO logging dependencies (pure Rust)
//! - Deterministic: `BTreeMap`/`BTreeSet` only, no floats, no clock reads
//! - Violations and advisories are returned as data, never printed
//! - Append-only: a committed codepoint, name or URI is never reassigned

// =============================================================================
// MODULES
// =============================================================================

pub mod assignment;
pub mod export;
pub mod formats;
pub mod normalize;
pub mod primitives;
pub mod registry;
pub mod session;
pub mod storage;
pub mod submission;
pub mod types;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CandidateBatch, CandidateEntry, Codepoint, Concept, ConceptType, EntryType, Generated,
    KvError, ProcessingStrategy, Provenance, RegistryEntry, RegistrySource, RequestInfo,
};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use assignment::{
    AllocationPolicy, Assignment, AssignmentEngine, AssignmentOrigin, AssignmentOutcome,
    CollisionAdvisory, OverrideTable, PinnedAssignment,
};
pub use export::{
    CanonicalHeader, CanonicalRegistry, canonical_checksum, export_canonical, import_canonical,
};
pub use normalize::{ConceptListNormalizer, ContextMapNormalizer, Normalizer};
pub use registry::{
    MergePlan, Registry, RegistrySnapshot, RegistryStatistics, RegistryStore, check_invariants,
    plan_merge,
};
pub use session::{Session, StorageBackend};
pub use storage::RedbRegistry;
pub use submission::{SubmissionContext, SubmitOutcome, submit_to};
pub use validation::{RuleId, ValidationEngine, ValidationReport, Violation};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{RegistryDocument, load_registry, registry_from_slice, registry_to_vec};
