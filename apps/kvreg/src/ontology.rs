//! # Ontology Runs
//!
//! Runs one configured ontology end to end: normalize the source, assign
//! codepoints, merge into `<output-dir>/<start>_<name>_registry.json`.
//!
//! A unit either writes its whole result or nothing. Failures are returned
//! to the caller, which keeps going with the next unit.

use crate::config::OntologyUnit;
use crate::store::{
    MAX_IMPORT_FILE_SIZE, MAX_INPUT_FILE_SIZE, RegistryLock, load_registry_file, read_input,
    write_registry_file,
};
use kvreg_core::{
    AssignmentEngine, CollisionAdvisory, KvError, OverrideTable, RegistryStore,
    registry_from_slice,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What happened to one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    Written {
        path: PathBuf,
        added: usize,
        unchanged: usize,
        pinned: usize,
        advisories: Vec<CollisionAdvisory>,
    },
    /// The source produced no concepts; nothing was written.
    Empty,
    /// The target is a hand-maintained `0_` file.
    Protected,
}

/// Build the override table from every pin file of a unit. Missing files
/// are skipped with a warning.
pub fn load_pins(unit: &OntologyUnit) -> Result<OverrideTable, KvError> {
    let mut table = OverrideTable::new();
    for pin in &unit.pins {
        if !pin.exists() {
            tracing::warn!("Pin registry not found at {}", pin.display());
            continue;
        }
        let registry = registry_from_slice(&read_input(pin, MAX_IMPORT_FILE_SIZE)?)?;
        table.extend_from_entries(registry.as_slice());
    }
    if !table.is_empty() {
        tracing::info!(
            "Loaded {} URI mappings for {} from pin registries",
            table.len(),
            unit.name
        );
    }
    Ok(table)
}

/// Run one ontology unit against `output_dir`.
pub fn run_unit(unit: &OntologyUnit, output_dir: &Path) -> Result<UnitOutcome, KvError> {
    if unit.is_protected() {
        tracing::warn!(
            "Skipping protected file: {} (0_* files are manually maintained)",
            unit.output_file_name()
        );
        return Ok(UnitOutcome::Protected);
    }

    tracing::info!("Processing ontology: {}", unit.name);
    let raw = read_input(&unit.source, MAX_INPUT_FILE_SIZE)?;
    let concepts = unit.normalizer().normalize(&raw)?;
    if concepts.is_empty() {
        tracing::warn!("No concepts extracted from {}", unit.name);
        return Ok(UnitOutcome::Empty);
    }

    let target = output_dir.join(unit.output_file_name());
    let _lock = RegistryLock::acquire(&target)?;

    let mut registry = load_registry_file(&target, unit.registry_source())?;
    registry.set_source(unit.registry_source());

    let policy = unit.policy(load_pins(unit)?).continuing(registry.as_slice())?;
    let outcome = AssignmentEngine::assign(&concepts, &policy, &unit.name)?;
    for advisory in &outcome.advisories {
        tracing::warn!("{}", advisory);
    }

    let plan = registry
        .merge_assignments(&outcome.assignments)
        .map_err(|e| e.merging_into(&target))?;
    write_registry_file(&registry, &target)?;
    tracing::info!(
        "Wrote JSON registry to {} ({} new, {} unchanged, {} total)",
        target.display(),
        plan.new_entries.len(),
        plan.unchanged,
        registry.entry_count()?
    );

    Ok(UnitOutcome::Written {
        path: target,
        added: plan.new_entries.len(),
        unchanged: plan.unchanged,
        pinned: outcome.pinned,
        advisories: outcome.advisories,
    })
}
