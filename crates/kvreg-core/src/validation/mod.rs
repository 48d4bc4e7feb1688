//! # Validation Engine
//!
//! Rule-based validation of submission batches against a registry snapshot.
//!
//! - Read-only: the engine never touches a store, it only sees a
//!   [`RegistrySnapshot`]
//! - Rules run in a fixed order; violations come out in that order
//! - A batch is valid iff it yields zero violations
//!
//! Syntax (V-001) and schema (V-002) failures stop the pipeline for their
//! batch. Every later rule runs over all entries and reports independently.

mod rules;
mod schema;

pub use rules::is_valid_canonical_name;

use crate::primitives::MAX_DOCUMENT_BYTES;
use crate::registry::RegistrySnapshot;
use crate::{CandidateBatch, Codepoint};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// RULE IDENTIFIERS
// =============================================================================

/// Stable identifier of a validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleId {
    #[serde(rename = "V-001")]
    Syntax,
    #[serde(rename = "V-002")]
    Schema,
    #[serde(rename = "V-003")]
    NameFormat,
    #[serde(rename = "V-004")]
    TypeEnum,
    #[serde(rename = "V-005")]
    DescriptionLength,
    #[serde(rename = "V-100")]
    CodepointPresence,
    #[serde(rename = "V-101")]
    CodepointFloor,
    #[serde(rename = "V-102")]
    CodepointAvailability,
    #[serde(rename = "V-103")]
    CodepointUniqueInBatch,
    #[serde(rename = "V-200")]
    NameAvailability,
    #[serde(rename = "V-201")]
    UriAvailability,
    #[serde(rename = "V-202")]
    NameUniqueInBatch,
    #[serde(rename = "V-203")]
    UriUniqueInBatch,
}

impl RuleId {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Syntax => "V-001",
            Self::Schema => "V-002",
            Self::NameFormat => "V-003",
            Self::TypeEnum => "V-004",
            Self::DescriptionLength => "V-005",
            Self::CodepointPresence => "V-100",
            Self::CodepointFloor => "V-101",
            Self::CodepointAvailability => "V-102",
            Self::CodepointUniqueInBatch => "V-103",
            Self::NameAvailability => "V-200",
            Self::UriAvailability => "V-201",
            Self::NameUniqueInBatch => "V-202",
            Self::UriUniqueInBatch => "V-203",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// VIOLATIONS
// =============================================================================

/// One rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: RuleId,
    /// Reference of the batch (usually its file path).
    pub batch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    /// Index of the earlier entry an intra-batch duplicate collides with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_index: Option<usize>,
}

impl Violation {
    #[must_use]
    pub fn new(rule: RuleId, batch: &str, message: impl Into<String>) -> Self {
        Self {
            rule,
            batch: batch.to_string(),
            entry_index: None,
            field: None,
            message: message.into(),
            related_index: None,
        }
    }

    #[must_use]
    pub fn at(mut self, entry_index: usize) -> Self {
        self.entry_index = Some(entry_index);
        self
    }

    #[must_use]
    pub fn on(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    #[must_use]
    pub fn related_to(mut self, index: usize) -> Self {
        self.related_index = Some(index);
        self
    }
}

/// All violations found in one batch, in rule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub batch: String,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    #[must_use]
    pub fn new(batch: &str, violations: Vec<Violation>) -> Self {
        Self {
            batch: batch.to_string(),
            violations,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Rule ids in reporting order, duplicates kept.
    #[must_use]
    pub fn rule_ids(&self) -> Vec<RuleId> {
        self.violations.iter().map(|v| v.rule).collect()
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Stateless validator for submission batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationEngine {
    min_codepoint: Codepoint,
}

impl ValidationEngine {
    #[must_use]
    pub const fn new(min_codepoint: Codepoint) -> Self {
        Self { min_codepoint }
    }

    #[must_use]
    pub const fn min_codepoint(&self) -> Codepoint {
        self.min_codepoint
    }

    /// Parse a raw request document (V-001, V-002) into a typed batch.
    pub fn parse_document(
        &self,
        batch: &str,
        raw: &[u8],
    ) -> Result<CandidateBatch, Vec<Violation>> {
        if raw.len() > MAX_DOCUMENT_BYTES {
            return Err(vec![Violation::new(
                RuleId::Syntax,
                batch,
                format!(
                    "Document is {} bytes: at most {} allowed",
                    raw.len(),
                    MAX_DOCUMENT_BYTES
                ),
            )]);
        }
        let value: serde_json::Value = serde_json::from_slice(raw).map_err(|e| {
            vec![Violation::new(
                RuleId::Syntax,
                batch,
                format!("Invalid JSON: {}", e),
            )]
        })?;
        schema::parse_request(batch, &value)
    }

    /// Full pipeline over a raw document. Returns the typed batch only when
    /// the report is clean.
    pub fn check_document(
        &self,
        batch: &str,
        raw: &[u8],
        snapshot: &RegistrySnapshot,
    ) -> Result<CandidateBatch, ValidationReport> {
        let parsed = self
            .parse_document(batch, raw)
            .map_err(|violations| ValidationReport::new(batch, violations))?;
        let report = self.validate_batch(batch, &parsed, snapshot);
        if report.is_valid() {
            Ok(parsed)
        } else {
            Err(report)
        }
    }

    /// Full pipeline over a raw document.
    #[must_use]
    pub fn validate_document(
        &self,
        batch: &str,
        raw: &[u8],
        snapshot: &RegistrySnapshot,
    ) -> ValidationReport {
        match self.check_document(batch, raw, snapshot) {
            Ok(_) => ValidationReport::new(batch, Vec::new()),
            Err(report) => report,
        }
    }

    /// Entry rules (V-003 through V-203) over an already-shaped batch.
    #[must_use]
    pub fn validate_batch(
        &self,
        batch: &str,
        candidates: &CandidateBatch,
        snapshot: &RegistrySnapshot,
    ) -> ValidationReport {
        let ctx = rules::RuleContext {
            batch,
            entries: &candidates.entries,
            snapshot,
            min_codepoint: self.min_codepoint,
        };
        let violations = rules::ENTRY_RULES
            .iter()
            .flat_map(|(_, rule)| rule(&ctx))
            .collect();
        ValidationReport::new(batch, violations)
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(Codepoint(crate::primitives::MIN_COMMUNITY_CODEPOINT))
    }
}

// =============================================================================
// TESTS
// =============================================================================
