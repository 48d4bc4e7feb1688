//! # Validation Reports
//!
//! Renders one or more [`ValidationReport`]s as the Markdown summary posted
//! on review requests, or as JSON for `--json-mode`.

use kvreg_core::{ValidationReport, Violation};
use serde::Serialize;

/// Reports for a whole run, in file order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub valid: bool,
    pub files: Vec<String>,
    pub error_count: usize,
    pub reports: Vec<ValidationReport>,
}

impl RunReport {
    #[must_use]
    pub fn new(reports: Vec<ValidationReport>) -> Self {
        let error_count = reports.iter().map(ValidationReport::len).sum();
        Self {
            valid: error_count == 0,
            files: reports.iter().map(|r| r.batch.clone()).collect(),
            error_count,
            reports,
        }
    }

    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.reports.iter().flat_map(|r| r.violations.iter())
    }
}

/// One line of location context: `**V-003**: `file`, entry[1], field `canonical_name``.
fn locate(v: &Violation) -> String {
    let entry = v
        .entry_index
        .map(|i| format!(", entry[{}]", i))
        .unwrap_or_default();
    let field = v
        .field
        .as_deref()
        .map(|f| format!(", field `{}`", f))
        .unwrap_or_default();
    format!("- **{}**: `{}`{}{}", v.rule, v.batch, entry, field)
}

/// Markdown summary of a run.
#[must_use]
pub fn render_markdown(run: &RunReport) -> String {
    let mut lines = vec!["## Validation Results\n".to_string()];

    if run.valid {
        lines.push(format!(
            "✅ **All {} file(s) passed validation.**\n",
            run.files.len()
        ));
        lines.push("\n### Files Validated\n".to_string());
        for file in &run.files {
            lines.push(format!("- `{}`", file));
        }
    } else {
        lines.push(format!(
            "❌ **Validation failed with {} error(s).**\n",
            run.error_count
        ));
        lines.push("\n### Errors\n".to_string());
        for v in run.violations() {
            lines.push(locate(v));
            lines.push(format!("  - {}", v.message));
        }
    }

    lines.join("\n")
}
