//! # Session Module
//!
//! A registry bound to a validation engine for one run.
//!
//! ## Storage Backends
//!
//! - `InMemory`: a [`Registry`] loaded from a JSON document; the app layer
//!   writes it back after a successful commit
//! - `Persistent`: a [`RedbRegistry`], where every commit is its own ACID
//!   transaction

use crate::assignment::Assignment;
use crate::export;
use crate::registry::{MergePlan, Registry, RegistrySnapshot, RegistryStatistics, RegistryStore};
use crate::storage::RedbRegistry;
use crate::submission::{SubmissionContext, SubmitOutcome, submit_to};
use crate::validation::{ValidationEngine, ValidationReport};
use crate::{Codepoint, KvError, RegistryEntry, RegistrySource};
use std::path::Path;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory registry (fast, volatile unless written back).
    InMemory(Registry),
    /// Disk-backed registry using redb (ACID, persistent).
    Persistent(RedbRegistry),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(Registry::community())
    }
}

/// A registry plus the engine that guards it.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
    engine: ValidationEngine,
}

impl Session {
    /// Empty in-memory community registry with the default engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            backend: StorageBackend::InMemory(registry),
            engine: ValidationEngine::default(),
        }
    }

    /// Open or create a redb registry. `source` applies only to a new database.
    pub fn with_redb(path: impl AsRef<Path>, source: RegistrySource) -> Result<Self, KvError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbRegistry::open(path, source)?),
            engine: ValidationEngine::default(),
        })
    }

    /// Replace the validation engine (e.g. a different minimum codepoint).
    #[must_use]
    pub fn with_engine(mut self, engine: ValidationEngine) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// The backend as a store trait object.
    #[must_use]
    pub fn store(&self) -> &dyn RegistryStore {
        match &self.backend {
            StorageBackend::InMemory(registry) => registry,
            StorageBackend::Persistent(redb) => redb,
        }
    }

    fn store_mut(&mut self) -> &mut dyn RegistryStore {
        match &mut self.backend {
            StorageBackend::InMemory(registry) => registry,
            StorageBackend::Persistent(redb) => redb,
        }
    }

    // =========================================================================
    // SUBMISSION PATH
    // =========================================================================

    /// Run the full validation pipeline. Never mutates the store.
    pub fn validate(&self, batch_ref: &str, raw: &[u8]) -> Result<ValidationReport, KvError> {
        let snapshot = self.store().snapshot()?;
        Ok(self.engine.validate_document(batch_ref, raw, &snapshot))
    }

    /// Validate and, only when clean, append the whole batch.
    pub fn submit(
        &mut self,
        batch_ref: &str,
        raw: &[u8],
        ctx: &SubmissionContext,
    ) -> Result<SubmitOutcome, KvError> {
        let engine = self.engine;
        match &mut self.backend {
            StorageBackend::InMemory(registry) => submit_to(registry, &engine, batch_ref, raw, ctx),
            StorageBackend::Persistent(redb) => redb.commit_batch(&engine, batch_ref, raw, ctx),
        }
    }

    /// Copy of the in-memory registry, taken before a commit whose write-back
    /// may still fail. `None` for redb, where the commit is already durable.
    #[must_use]
    pub fn checkpoint(&self) -> Option<Registry> {
        match &self.backend {
            StorageBackend::InMemory(registry) => Some(registry.clone()),
            StorageBackend::Persistent(_) => None,
        }
    }

    /// Put back a registry taken by [`Session::checkpoint`].
    pub fn rollback(&mut self, checkpoint: Registry) {
        if let StorageBackend::InMemory(registry) = &mut self.backend {
            *registry = checkpoint;
        }
    }

    // =========================================================================
    // ONTOLOGY PATH
    // =========================================================================

    pub fn merge_assignments(&mut self, assignments: &[Assignment]) -> Result<MergePlan, KvError> {
        self.store_mut().merge_assignments(assignments)
    }

    /// Append entries verbatim (import between backends).
    pub fn append(&mut self, entries: Vec<RegistryEntry>) -> Result<(), KvError> {
        self.store_mut().append(entries)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn source(&self) -> &RegistrySource {
        self.store().source()
    }

    pub fn entries(&self) -> Result<Vec<RegistryEntry>, KvError> {
        self.store().entries()
    }

    pub fn statistics(&self) -> Result<RegistryStatistics, KvError> {
        self.store().statistics()
    }

    pub fn snapshot(&self) -> Result<RegistrySnapshot, KvError> {
        self.store().snapshot()
    }

    pub fn lookup_codepoint(&self, codepoint: Codepoint) -> Result<Option<RegistryEntry>, KvError> {
        self.store().lookup_codepoint(codepoint)
    }

    pub fn lookup_name(&self, name: &str) -> Result<Option<RegistryEntry>, KvError> {
        self.store().lookup_name(name)
    }

    pub fn lookup_uri(&self, uri: &str) -> Result<Option<RegistryEntry>, KvError> {
        self.store().lookup_uri(uri)
    }

    // =========================================================================
    // EXPORT
    // =========================================================================

    /// Canonical postcard export of the current content.
    pub fn export_canonical(&self) -> Result<Vec<u8>, KvError> {
        export::export_canonical(self.store())
    }

    pub fn canonical_checksum(&self) -> Result<u64, KvError> {
        export::canonical_checksum(self.store())
    }

    #[cfg(feature = "crypto-hash")]
    pub fn canonical_crypto_hash(&self) -> Result<String, KvError> {
        export::canonical_crypto_hash(self.store())
    }
}

// =============================================================================
// TESTS
// =============================================================================
