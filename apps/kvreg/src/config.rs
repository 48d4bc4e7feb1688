//! # Ontology Unit Configuration
//!
//! One TOML file lists every ontology the `assign` command processes:
//!
//! ```toml
//! [[ontology]]
//! name = "rdf"
//! source = "sources/rdf.concepts.json"
//! format = "concepts"            # or "context"
//! start_code_point = 2000
//! processing_strategy = "StandardRDF"
//! source_url = "http://www.w3.org/1999/02/22-rdf-syntax-ns#"
//! uri_filter = "http://www.w3.org/"
//! namespaced = true
//! pins = ["0_blockchain_commons_registry.json"]
//! ```
//!
//! Relative `source` and `pins` paths resolve against the directory holding
//! the configuration file.

use kvreg_core::{
    AllocationPolicy, Codepoint, ConceptListNormalizer, ContextMapNormalizer, KvError, Normalizer,
    OverrideTable, ProcessingStrategy, RegistrySource,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// How a unit's source file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// JSON array of `{uri, label, description, type}` records.
    #[default]
    Concepts,
    /// JSON-LD `@context` document.
    Context,
}

/// One ontology: where its concepts come from and where its range starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OntologyUnit {
    pub name: String,
    pub source: PathBuf,
    #[serde(default)]
    pub format: SourceFormat,
    pub start_code_point: u64,
    #[serde(default)]
    pub processing_strategy: ProcessingStrategy,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub uri_filter: Option<String>,
    /// Prefix allocated names with `<name>:`.
    #[serde(default)]
    pub namespaced: bool,
    /// Registry files whose URI-bearing entries become pinned assignments.
    #[serde(default)]
    pub pins: Vec<PathBuf>,
}

impl OntologyUnit {
    /// `<start>_<name>_registry.json`
    #[must_use]
    pub fn output_file_name(&self) -> String {
        format!("{}_{}_registry.json", self.start_code_point, self.name)
    }

    /// Files starting with `0_` are maintained by hand and never written.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.output_file_name().starts_with("0_")
    }

    #[must_use]
    pub fn registry_source(&self) -> RegistrySource {
        RegistrySource {
            name: self.name.clone(),
            source_url: self.source_url.clone(),
            start_code_point: Codepoint(self.start_code_point),
            processing_strategy: self.processing_strategy,
        }
    }

    #[must_use]
    pub fn normalizer(&self) -> Box<dyn Normalizer> {
        match self.format {
            SourceFormat::Concepts => Box::new(ConceptListNormalizer),
            SourceFormat::Context => Box::new(ContextMapNormalizer::new(self.name.clone())),
        }
    }

    /// Allocation policy for a fresh run; the caller continues it from the
    /// existing target registry.
    #[must_use]
    pub fn policy(&self, overrides: OverrideTable) -> AllocationPolicy {
        let mut policy =
            AllocationPolicy::new(Codepoint(self.start_code_point)).with_overrides(overrides);
        if let Some(filter) = &self.uri_filter {
            policy = policy.with_uri_filter(filter.clone());
        }
        if self.namespaced {
            policy = policy.namespaced(self.name.clone());
        }
        policy
    }
}

/// The full configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OntologyConfig {
    #[serde(rename = "ontology", default)]
    pub units: Vec<OntologyUnit>,
}

impl OntologyConfig {
    /// Parse and check a configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self, KvError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| KvError::DeserializationError(format!("Ontology config: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    /// Load from disk, resolving relative paths against the file's directory.
    pub fn load(path: &Path) -> Result<Self, KvError> {
        let raw = crate::store::read_input(path, MAX_CONFIG_FILE_SIZE)?;
        let text = String::from_utf8(raw)
            .map_err(|e| KvError::DeserializationError(format!("Ontology config: {}", e)))?;
        let mut config = Self::from_toml_str(&text)?;

        let base = path.parent().unwrap_or(Path::new("."));
        for unit in &mut config.units {
            unit.source = resolve(base, &unit.source);
            for pin in &mut unit.pins {
                *pin = resolve(base, pin);
            }
        }
        Ok(config)
    }

    /// Names and start code points must both be unique.
    fn check(&self) -> Result<(), KvError> {
        let mut starts: BTreeMap<u64, &str> = BTreeMap::new();
        let mut names: BTreeMap<String, &str> = BTreeMap::new();
        for unit in &self.units {
            if unit.name.is_empty() {
                return Err(KvError::DeserializationError(
                    "Ontology config: unit name must not be empty".to_string(),
                ));
            }
            if let Some(other) = starts.insert(unit.start_code_point, &unit.name) {
                return Err(KvError::DeserializationError(format!(
                    "Ontology config: start_code_point {} used by both '{}' and '{}'",
                    unit.start_code_point, other, unit.name
                )));
            }
            if let Some(other) = names.insert(unit.name.to_lowercase(), &unit.name) {
                return Err(KvError::DeserializationError(format!(
                    "Ontology config: name '{}' clashes with '{}'",
                    unit.name, other
                )));
            }
        }
        Ok(())
    }

    /// Units named by `ids` (case-insensitive), in configuration order.
    /// An empty selection means every unit.
    pub fn select(&self, ids: &[String]) -> Result<Vec<&OntologyUnit>, KvError> {
        if ids.is_empty() {
            return Ok(self.units.iter().collect());
        }
        let wanted: Vec<String> = ids.iter().map(|id| id.to_lowercase()).collect();
        if let Some(unknown) = wanted
            .iter()
            .find(|id| !self.units.iter().any(|u| u.name.to_lowercase() == **id))
        {
            return Err(KvError::InvalidConcept(format!(
                "Unknown ontology identifier: {}",
                unknown
            )));
        }
        Ok(self
            .units
            .iter()
            .filter(|u| wanted.contains(&u.name.to_lowercase()))
            .collect())
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// =============================================================================
// TESTS
// =============================================================================
