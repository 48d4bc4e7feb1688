//! # Submission Path
//!
//! Validate-then-commit for community request batches.
//!
//! A batch is committed as a whole or not at all. The caller must hold
//! exclusive access to the store between the snapshot and the append;
//! [`crate::storage::RedbRegistry::commit_batch`] does both inside one write
//! transaction.

use crate::registry::RegistryStore;
use crate::validation::{ValidationEngine, ValidationReport};
use crate::{CandidateBatch, Codepoint, EntryType, KvError, Provenance, RegistryEntry};
use serde::{Deserialize, Serialize};

/// Caller-supplied facts stamped into every committed entry's provenance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubmissionContext {
    /// `YYYY-MM-DD`.
    pub assigned_date: String,
    pub pr_number: Option<u64>,
}

impl SubmissionContext {
    #[must_use]
    pub fn new(assigned_date: impl Into<String>) -> Self {
        Self {
            assigned_date: assigned_date.into(),
            pr_number: None,
        }
    }

    #[must_use]
    pub fn with_pr(mut self, pr_number: u64) -> Self {
        self.pr_number = Some(pr_number);
        self
    }
}

/// What happened to a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// All entries appended; holds the count.
    Committed(usize),
    /// Nothing appended.
    Rejected(ValidationReport),
}

impl SubmitOutcome {
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Turn a validated batch into registry entries with provenance.
///
/// Fails with `InvariantViolation` if the batch was not actually clean.
pub fn promote(
    batch: &CandidateBatch,
    ctx: &SubmissionContext,
) -> Result<Vec<RegistryEntry>, KvError> {
    let provenance = Provenance {
        submitter: batch.request.submitter.clone(),
        assigned_date: ctx.assigned_date.clone(),
        pr_number: ctx.pr_number.filter(|n| *n != 0),
        contact: non_empty(&batch.request.contact),
        url: batch.request.url.as_deref().and_then(non_empty),
    };

    batch
        .entries
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let codepoint = candidate.codepoint.ok_or_else(|| {
                KvError::InvariantViolation(format!("entry {} reached commit without a codepoint", i))
            })?;
            let entry_type = EntryType::parse(&candidate.entry_type).ok_or_else(|| {
                KvError::InvariantViolation(format!(
                    "entry {} reached commit with type '{}'",
                    i, candidate.entry_type
                ))
            })?;
            let mut entry = RegistryEntry::new(
                Codepoint(codepoint),
                candidate.canonical_name.clone(),
                entry_type,
                candidate.description.clone(),
            )
            .with_source(provenance.clone());
            entry.uri = candidate.uri.as_deref().and_then(non_empty);
            Ok(entry)
        })
        .collect()
}

/// Validate `raw` against `store` and append it when clean.
///
/// The caller holds the store exclusively for the duration of the call.
pub fn submit_to<S: RegistryStore + ?Sized>(
    store: &mut S,
    engine: &ValidationEngine,
    batch_ref: &str,
    raw: &[u8],
    ctx: &SubmissionContext,
) -> Result<SubmitOutcome, KvError> {
    let snapshot = store.snapshot()?;
    let batch = match engine.check_document(batch_ref, raw, &snapshot) {
        Ok(batch) => batch,
        Err(report) => return Ok(SubmitOutcome::Rejected(report)),
    };
    let entries = promote(&batch, ctx)?;
    let count = entries.len();
    store.append(entries)?;
    Ok(SubmitOutcome::Committed(count))
}
