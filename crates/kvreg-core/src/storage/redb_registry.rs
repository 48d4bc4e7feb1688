//! # redb-backed Registry Storage
//!
//! A disk-backed registry store using the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! The single-writer model is what makes validate -> commit safe here:
//! [`RedbRegistry::commit_batch`] reads the snapshot, runs the validation
//! engine and appends, all inside one write transaction. A rejected batch
//! aborts the transaction and leaves nothing behind.

use crate::export::{CanonicalEntry, CanonicalSource};
use crate::registry::{MergePlan, RegistrySnapshot, RegistryStore, plan_merge};
use crate::submission::{SubmissionContext, SubmitOutcome, promote};
use crate::validation::ValidationEngine;
use crate::{Assignment, Codepoint, KvError, RegistryEntry, RegistrySource};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::collections::BTreeSet;
use std::path::Path;

/// Entries: codepoint -> postcard `CanonicalEntry`.
const ENTRIES: TableDefinition<u64, &[u8]> = TableDefinition::new("entries");

/// Name index: canonical name -> codepoint.
const NAME_INDEX: TableDefinition<&str, u64> = TableDefinition::new("name_index");

/// URI index: non-empty uri -> codepoint.
const URI_INDEX: TableDefinition<&str, u64> = TableDefinition::new("uri_index");

/// Metadata: key -> postcard bytes.
const METADATA: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

const SOURCE_KEY: &str = "source";

fn io_err(e: impl std::fmt::Display) -> KvError {
    KvError::IoError(e.to_string())
}

fn encode(entry: &RegistryEntry) -> Result<Vec<u8>, KvError> {
    postcard::to_allocvec(&CanonicalEntry::from(entry))
        .map_err(|e| KvError::SerializationError(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<RegistryEntry, KvError> {
    postcard::from_bytes::<CanonicalEntry>(bytes)
        .map(RegistryEntry::from)
        .map_err(|e| KvError::DeserializationError(e.to_string()))
}

fn collect_entries(
    table: &impl ReadableTable<u64, &'static [u8]>,
) -> Result<Vec<RegistryEntry>, KvError> {
    let mut entries = Vec::new();
    for row in table.iter().map_err(io_err)? {
        let (_, value) = row.map_err(io_err)?;
        entries.push(decode(value.value())?);
    }
    Ok(entries)
}

/// Insert entries inside an open write transaction, refusing any key that is
/// already present. The caller commits or drops the transaction.
fn insert_entries(txn: &WriteTransaction, entries: &[RegistryEntry]) -> Result<(), KvError> {
    let mut entries_table = txn.open_table(ENTRIES).map_err(io_err)?;
    let mut names = txn.open_table(NAME_INDEX).map_err(io_err)?;
    let mut uris = txn.open_table(URI_INDEX).map_err(io_err)?;

    for entry in entries {
        let cp = entry.codepoint.value();
        if entries_table.get(cp).map_err(io_err)?.is_some() {
            return Err(KvError::InvariantViolation(format!(
                "codepoint {} is already stored",
                cp
            )));
        }
        if names
            .get(entry.canonical_name.as_str())
            .map_err(io_err)?
            .is_some()
        {
            return Err(KvError::InvariantViolation(format!(
                "canonical name '{}' is already stored",
                entry.canonical_name
            )));
        }
        if let Some(uri) = entry.uri_key() {
            if uris.get(uri).map_err(io_err)?.is_some() {
                return Err(KvError::InvariantViolation(format!(
                    "URI '{}' is already stored",
                    uri
                )));
            }
            uris.insert(uri, cp).map_err(io_err)?;
        }

        let bytes = encode(entry)?;
        entries_table.insert(cp, bytes.as_slice()).map_err(io_err)?;
        names
            .insert(entry.canonical_name.as_str(), cp)
            .map_err(io_err)?;
    }
    Ok(())
}

fn write_source(txn: &WriteTransaction, source: &RegistrySource) -> Result<(), KvError> {
    let bytes = postcard::to_allocvec(&CanonicalSource::from(source))
        .map_err(|e| KvError::SerializationError(e.to_string()))?;
    let mut meta = txn.open_table(METADATA).map_err(io_err)?;
    meta.insert(SOURCE_KEY, bytes.as_slice()).map_err(io_err)?;
    Ok(())
}

/// A disk-backed registry store using redb.
pub struct RedbRegistry {
    db: Database,
    source: RegistrySource,
}

impl std::fmt::Debug for RedbRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRegistry")
            .field("source", &self.source.name)
            .finish_non_exhaustive()
    }
}

impl RedbRegistry {
    /// Open or create a registry database.
    ///
    /// `source` is recorded only when the database is new; an existing
    /// database keeps its stored metadata.
    pub fn open(path: impl AsRef<Path>, source: RegistrySource) -> Result<Self, KvError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        let stored = {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(ENTRIES).map_err(io_err)?;
            let _ = write_txn.open_table(NAME_INDEX).map_err(io_err)?;
            let _ = write_txn.open_table(URI_INDEX).map_err(io_err)?;
            let stored = {
                let meta = write_txn.open_table(METADATA).map_err(io_err)?;
                let raw = meta.get(SOURCE_KEY).map_err(io_err)?;
                match raw {
                    Some(bytes) => Some(
                        postcard::from_bytes::<CanonicalSource>(bytes.value())
                            .map(RegistrySource::from)
                            .map_err(|e| KvError::DeserializationError(e.to_string()))?,
                    ),
                    None => None,
                }
            };
            if stored.is_none() {
                write_source(&write_txn, &source)?;
            }
            write_txn.commit().map_err(io_err)?;
            stored
        };

        Ok(Self {
            db,
            source: stored.unwrap_or(source),
        })
    }

    /// Replace the stored metadata (used when importing into a fresh database).
    pub fn set_source(&mut self, source: RegistrySource) -> Result<(), KvError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        write_source(&write_txn, &source)?;
        write_txn.commit().map_err(io_err)?;
        self.source = source;
        Ok(())
    }

    /// Validate and commit a raw request document in one write transaction.
    ///
    /// A rejected batch aborts the transaction; nothing is written.
    pub fn commit_batch(
        &mut self,
        engine: &ValidationEngine,
        batch_ref: &str,
        raw: &[u8],
        ctx: &SubmissionContext,
    ) -> Result<SubmitOutcome, KvError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;

        let snapshot = {
            let table = write_txn.open_table(ENTRIES).map_err(io_err)?;
            RegistrySnapshot::from_entries(&collect_entries(&table)?)
        };

        let batch = match engine.check_document(batch_ref, raw, &snapshot) {
            Ok(batch) => batch,
            Err(report) => {
                write_txn.abort().map_err(io_err)?;
                return Ok(SubmitOutcome::Rejected(report));
            }
        };

        let entries = promote(&batch, ctx)?;
        let count = entries.len();
        insert_entries(&write_txn, &entries)?;
        write_txn.commit().map_err(io_err)?;
        Ok(SubmitOutcome::Committed(count))
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), KvError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }

    fn lookup_indexed(
        &self,
        index: TableDefinition<&str, u64>,
        key: &str,
    ) -> Result<Option<RegistryEntry>, KvError> {
        let cp = {
            let read_txn = self.db.begin_read().map_err(io_err)?;
            let table = read_txn.open_table(index).map_err(io_err)?;
            table.get(key).map_err(io_err)?.map(|v| v.value())
        };
        match cp {
            Some(cp) => self.lookup_codepoint(Codepoint(cp)),
            None => Ok(None),
        }
    }

    fn index_keys(&self, index: TableDefinition<&str, u64>) -> Result<BTreeSet<String>, KvError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(index).map_err(io_err)?;
        let mut keys = BTreeSet::new();
        for row in table.iter().map_err(io_err)? {
            let (key, _) = row.map_err(io_err)?;
            keys.insert(key.value().to_string());
        }
        Ok(keys)
    }
}

impl RegistryStore for RedbRegistry {
    fn source(&self) -> &RegistrySource {
        &self.source
    }

    fn entries(&self) -> Result<Vec<RegistryEntry>, KvError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ENTRIES).map_err(io_err)?;
        collect_entries(&table)
    }

    /// All-or-nothing: one write transaction, aborted if any codepoint, name
    /// or URI is already stored.
    fn append(&mut self, entries: Vec<RegistryEntry>) -> Result<(), KvError> {
        if entries.is_empty() {
            return Ok(());
        }
        let write_txn = self.db.begin_write().map_err(io_err)?;
        insert_entries(&write_txn, &entries)?;
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn lookup_codepoint(&self, codepoint: Codepoint) -> Result<Option<RegistryEntry>, KvError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ENTRIES).map_err(io_err)?;
        match table.get(codepoint.value()).map_err(io_err)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn lookup_name(&self, name: &str) -> Result<Option<RegistryEntry>, KvError> {
        self.lookup_indexed(NAME_INDEX, name)
    }

    fn lookup_uri(&self, uri: &str) -> Result<Option<RegistryEntry>, KvError> {
        if uri.is_empty() {
            return Ok(None);
        }
        self.lookup_indexed(URI_INDEX, uri)
    }

    fn entry_count(&self) -> Result<usize, KvError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ENTRIES).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    fn assigned_codepoints(&self) -> Result<BTreeSet<Codepoint>, KvError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ENTRIES).map_err(io_err)?;
        let mut cps = BTreeSet::new();
        for row in table.iter().map_err(io_err)? {
            let (key, _) = row.map_err(io_err)?;
            cps.insert(Codepoint(key.value()));
        }
        Ok(cps)
    }

    fn assigned_names(&self) -> Result<BTreeSet<String>, KvError> {
        self.index_keys(NAME_INDEX)
    }

    fn assigned_uris(&self) -> Result<BTreeSet<String>, KvError> {
        self.index_keys(URI_INDEX)
    }

    /// Plan and append inside one write transaction.
    fn merge_assignments(&mut self, assignments: &[Assignment]) -> Result<MergePlan, KvError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let existing = {
            let table = write_txn.open_table(ENTRIES).map_err(io_err)?;
            collect_entries(&table)?
        };
        let plan = plan_merge(&existing, assignments)?;
        insert_entries(&write_txn, &plan.new_entries)?;
        write_txn.commit().map_err(io_err)?;
        Ok(plan)
    }
}

// =============================================================================
// TESTS
// =============================================================================
