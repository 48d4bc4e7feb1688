//! Structural checks (V-002) that turn a parsed JSON request into a typed batch.

use super::{RuleId, Violation};
use crate::primitives::MAX_BATCH_ENTRIES;
use crate::{CandidateBatch, CandidateEntry, RequestInfo};
use serde_json::{Map, Value};

const REQUEST_FIELDS: [&str; 3] = ["submitter", "description", "contact"];
const ENTRY_FIELDS: [&str; 4] = ["codepoint", "canonical_name", "type", "description"];

fn schema(batch: &str, message: impl Into<String>) -> Violation {
    Violation::new(RuleId::Schema, batch, message)
}

/// Read `canonical_name`, falling back to the persisted key `name`.
fn name_field(entry: &Map<String, Value>) -> Option<&Value> {
    entry.get("canonical_name").or_else(|| entry.get("name"))
}

fn field_value<'a>(entry: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    if field == "canonical_name" {
        name_field(entry)
    } else {
        entry.get(field)
    }
}

/// Parse the request section. Stops at the first problem.
fn parse_request_info(batch: &str, request: &Value) -> Result<RequestInfo, Violation> {
    let Some(request) = request.as_object() else {
        return Err(schema(batch, "'request' must be an object").on("request"));
    };

    let mut values = Vec::with_capacity(REQUEST_FIELDS.len());
    for field in REQUEST_FIELDS {
        match request.get(field) {
            None => {
                return Err(schema(
                    batch,
                    format!("Missing required field in 'request': '{}'", field),
                ));
            }
            Some(Value::String(s)) => values.push(s.clone()),
            Some(_) => {
                return Err(
                    schema(batch, format!("Field 'request.{}' must be a string", field))
                        .on(field),
                );
            }
        }
    }

    let url = match request.get("url") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(schema(batch, "Field 'request.url' must be a string").on("url"));
        }
    };

    let mut values = values.into_iter();
    Ok(RequestInfo {
        submitter: values.next().unwrap_or_default(),
        description: values.next().unwrap_or_default(),
        contact: values.next().unwrap_or_default(),
        url,
    })
}

/// Check one entry object. Every problem of the entry is reported.
fn check_entry(batch: &str, index: usize, entry: &Map<String, Value>) -> Vec<Violation> {
    let mut violations = Vec::new();

    for field in ENTRY_FIELDS {
        let Some(value) = field_value(entry, field) else {
            violations.push(
                schema(batch, format!("Missing required field: '{}'", field))
                    .at(index)
                    .on(field),
            );
            continue;
        };
        let kind_ok = match field {
            "codepoint" => value.as_u64().is_some(),
            _ => value.is_string(),
        };
        if !kind_ok {
            let expected = if field == "codepoint" {
                "a non-negative integer"
            } else {
                "a string"
            };
            violations.push(
                schema(batch, format!("Field '{}' must be {}", field, expected))
                    .at(index)
                    .on(field),
            );
        }
    }

    match entry.get("uri") {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => violations.push(
            schema(batch, "Field 'uri' must be a string")
                .at(index)
                .on("uri"),
        ),
    }

    violations
}

fn string_of(entry: &Map<String, Value>, field: &str) -> String {
    field_value(entry, field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// V-002 over a syntactically valid document.
pub(super) fn parse_request(batch: &str, document: &Value) -> Result<CandidateBatch, Vec<Violation>> {
    let Some(document) = document.as_object() else {
        return Err(vec![schema(batch, "Request document must be a JSON object")]);
    };

    for key in ["request", "entries"] {
        if !document.contains_key(key) {
            return Err(vec![schema(
                batch,
                format!("Missing required field: '{}'", key),
            )]);
        }
    }

    let request = document
        .get("request")
        .map(|r| parse_request_info(batch, r))
        .transpose()
        .map_err(|v| vec![v])?
        .unwrap_or_default();

    let Some(entries) = document.get("entries").and_then(Value::as_array) else {
        return Err(vec![schema(batch, "'entries' must be an array")]);
    };
    if entries.is_empty() {
        return Err(vec![schema(
            batch,
            "'entries' must contain at least one entry",
        )]);
    }
    if entries.len() > MAX_BATCH_ENTRIES {
        return Err(vec![schema(
            batch,
            format!(
                "'entries' has {} items: at most {} allowed",
                entries.len(),
                MAX_BATCH_ENTRIES
            ),
        )]);
    }

    let mut violations = Vec::new();
    let mut candidates = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let Some(entry) = entry.as_object() else {
            violations.push(schema(batch, format!("Entry {} must be an object", index)).at(index));
            continue;
        };
        let problems = check_entry(batch, index, entry);
        if !problems.is_empty() {
            violations.extend(problems);
            continue;
        }
        candidates.push(CandidateEntry {
            codepoint: entry.get("codepoint").and_then(Value::as_u64),
            canonical_name: string_of(entry, "canonical_name"),
            entry_type: string_of(entry, "type"),
            uri: entry
                .get("uri")
                .and_then(Value::as_str)
                .map(str::to_string),
            description: string_of(entry, "description"),
        });
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(CandidateBatch {
        request,
        entries: candidates,
    })
}
