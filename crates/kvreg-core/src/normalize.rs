//! # Concept Normalizers
//!
//! Turn raw ontology sources into [`Concept`] records for the assignment
//! engine. Only JSON inputs are handled here; fetching and RDF parsing live
//! outside the core.

use crate::{Concept, ConceptType, KvError};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Source of concept records.
pub trait Normalizer {
    fn normalize(&self, raw: &[u8]) -> Result<Vec<Concept>, KvError>;
}

// =============================================================================
// CONCEPT LIST
// =============================================================================

/// A JSON array of `{uri, label, description, type}` records, as produced by
/// an external RDF extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConceptListNormalizer;

#[derive(Deserialize)]
struct ConceptRecord {
    uri: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type")]
    concept_type: String,
}

impl Normalizer for ConceptListNormalizer {
    fn normalize(&self, raw: &[u8]) -> Result<Vec<Concept>, KvError> {
        let records: Vec<ConceptRecord> = serde_json::from_slice(raw)
            .map_err(|e| KvError::DeserializationError(format!("Concept list: {}", e)))?;

        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                if record.uri.is_empty() {
                    return Err(KvError::InvalidConcept(format!("record {} has an empty uri", i)));
                }
                let concept_type = ConceptType::parse(&record.concept_type).ok_or_else(|| {
                    KvError::InvalidConcept(format!(
                        "record {} ({}) has unknown type '{}'",
                        i, record.uri, record.concept_type
                    ))
                })?;
                Ok(Concept {
                    uri: record.uri,
                    label: record.label.unwrap_or_default(),
                    description: record.description.unwrap_or_default(),
                    concept_type,
                })
            })
            .collect()
    }
}

// =============================================================================
// JSON-LD CONTEXT MAP
// =============================================================================

/// A JSON-LD `@context` document. Every resolvable term becomes a property.
#[derive(Debug, Clone)]
pub struct ContextMapNormalizer {
    source_name: String,
}

impl ContextMapNormalizer {
    #[must_use]
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
        }
    }

    /// Resolve a term definition to an absolute IRI.
    fn resolve(key: &str, value: &Value, context: &Map<String, Value>) -> Option<String> {
        match value {
            Value::String(s) => {
                if s.starts_with("http://") || s.starts_with("https://") {
                    return Some(s.clone());
                }
                if s.starts_with('@') {
                    return None;
                }
                let (prefix, local) = s.split_once(':')?;
                match context.get(prefix) {
                    Some(Value::String(base)) => Some(format!("{}{}", base, local)),
                    _ => None,
                }
            }
            Value::Object(def) => match def.get("@id") {
                Some(id) if is_truthy(id) => Self::resolve(key, id, context),
                _ => match context.get("@vocab") {
                    Some(Value::String(vocab)) if !vocab.is_empty() => {
                        Some(format!("{}{}", vocab, key))
                    }
                    _ => None,
                },
            },
            _ => None,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

/// Split camel-case humps: `issuanceDate` -> `issuance Date`.
#[must_use]
pub fn split_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    let mut i = 0;
    while i < chars.len() {
        let current = chars[i];
        match chars.get(i + 1) {
            Some(next) if current.is_ascii_lowercase() && next.is_ascii_uppercase() => {
                out.push(current);
                out.push(' ');
                out.push(*next);
                i += 2;
            }
            _ => {
                out.push(current);
                i += 1;
            }
        }
    }
    out
}

impl Normalizer for ContextMapNormalizer {
    fn normalize(&self, raw: &[u8]) -> Result<Vec<Concept>, KvError> {
        let document: Value = serde_json::from_slice(raw)
            .map_err(|e| KvError::DeserializationError(format!("JSON-LD context: {}", e)))?;

        let Value::Object(root) = &document else {
            return Err(KvError::InvalidConcept(
                "JSON-LD context document must be an object".to_string(),
            ));
        };

        let context: Map<String, Value> = match root.get("@context") {
            None => root.clone(),
            Some(Value::Object(ctx)) => ctx.clone(),
            Some(Value::Array(items)) => {
                let mut merged = Map::new();
                for item in items {
                    if let Value::Object(obj) = item {
                        for (k, v) in obj {
                            merged.insert(k.clone(), v.clone());
                        }
                    }
                }
                merged
            }
            // Remote context references carry no terms of their own.
            Some(_) => return Ok(Vec::new()),
        };

        let description = format!("Defined in {}", self.source_name);
        Ok(context
            .iter()
            .filter(|(key, _)| !key.starts_with('@'))
            .filter_map(|(key, value)| {
                Self::resolve(key, value, &context).map(|uri| Concept {
                    uri,
                    label: split_camel_case(key),
                    description: description.clone(),
                    concept_type: ConceptType::Property,
                })
            })
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
