//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use kvreg_core::{RegistryEntry, RegistryStatistics, RegistrySource, ValidationReport};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Registry status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub registry: RegistrySource,
    pub statistics: RegistryStatistics,
    pub min_codepoint: u64,
    pub persistent: bool,
}

// =============================================================================
// ENTRY / LOOKUP
// =============================================================================

/// Query string for `GET /lookup`. Exactly one key must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupQuery {
    pub name: Option<String>,
    pub uri: Option<String>,
}

/// Single-entry response used by `/entries/{codepoint}` and `/lookup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryResponse {
    pub found: bool,
    pub entry: Option<RegistryEntry>,
    pub error: Option<String>,
}

impl EntryResponse {
    pub fn from_lookup(entry: Option<RegistryEntry>) -> Self {
        Self {
            found: entry.is_some(),
            entry,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            found: false,
            entry: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// VALIDATE / SUBMIT
// =============================================================================

/// Query string for `POST /validate` and `POST /submit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchQuery {
    /// Reference reported in violations (defaults to `request`).
    pub batch: Option<String>,
    /// Review request number recorded in provenance (submit only).
    pub pr: Option<u64>,
}

impl BatchQuery {
    pub fn batch_ref(&self) -> &str {
        self.batch.as_deref().unwrap_or("request")
    }
}

/// Submission response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub committed: usize,
    pub report: Option<ValidationReport>,
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn committed(count: usize) -> Self {
        Self {
            success: true,
            committed: count,
            report: None,
            error: None,
        }
    }

    pub fn rejected(report: ValidationReport) -> Self {
        Self {
            success: false,
            committed: 0,
            error: Some(format!("Batch rejected with {} violation(s)", report.len())),
            report: Some(report),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            committed: 0,
            report: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// EXPORT / HASH RESPONSES
// =============================================================================

/// Export response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: Option<String>, // Base64 encoded
    pub checksum: Option<u64>,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(data: Vec<u8>, checksum: u64) -> Self {
        Self {
            success: true,
            data: Some(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                &data,
            )),
            checksum: Some(checksum),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            checksum: None,
            error: Some(msg.into()),
        }
    }
}

/// Hash response: canonical checksum plus BLAKE3 digest of the export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashResponse {
    pub checksum: u64,
    pub blake3: String,
    pub entries: usize,
}
