//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Results go to stdout (Markdown, tables or JSON with `--json-mode`);
//! progress and failures go through `tracing` to stderr.

use super::{CommandStatus, LookupKey, RegistryArgs};
use crate::api::{self, AppState, ServerConfig};
use crate::config::OntologyConfig;
use crate::ontology::{UnitOutcome, run_unit};
use crate::report::{RunReport, render_markdown};
use crate::store::{
    Backend, MAX_IMPORT_FILE_SIZE, MAX_INPUT_FILE_SIZE, RegistryLock, open_session, read_input,
    save_session, today, validate_output_path, write_registry_file,
};
use kvreg_core::{
    Codepoint, KvError, RedbRegistry, Registry, RegistryEntry, RegistrySource, RegistryStore,
    RuleId, Session, SubmissionContext, SubmitOutcome, ValidationReport, Violation,
    import_canonical,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

// =============================================================================
// HELPERS
// =============================================================================

/// Metadata for a registry that does not exist yet.
fn default_source(args: &RegistryArgs) -> RegistrySource {
    let mut source = RegistrySource::community();
    source.start_code_point = args.engine.min_codepoint();
    source
}

fn open_registry(args: &RegistryArgs) -> Result<Session, KvError> {
    open_session(&args.path, args.backend, default_source(args), args.engine)
}

/// Exclusive writer lock for the JSON backend. redb locks its own file.
fn writer_lock(args: &RegistryArgs) -> Result<Option<RegistryLock>, KvError> {
    match args.backend {
        Backend::Json => RegistryLock::acquire(&args.path).map(Some),
        Backend::Redb => Ok(None),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), KvError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| KvError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Read a request document. Unreadable files become a V-001 violation so
/// the rest of the run carries on.
fn read_request(file: &Path, batch: &str) -> Result<Vec<u8>, Violation> {
    if !file.exists() {
        return Err(Violation::new(
            RuleId::Syntax,
            batch,
            format!("File does not exist: {}", batch),
        ));
    }
    read_input(file, MAX_INPUT_FILE_SIZE)
        .map_err(|e| Violation::new(RuleId::Syntax, batch, e.to_string()))
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Validate request documents against the registry without committing.
pub fn cmd_validate(
    args: &RegistryArgs,
    files: &[PathBuf],
    report_path: Option<&Path>,
) -> Result<CommandStatus, KvError> {
    let session = open_registry(args)?;

    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let batch = file.display().to_string();
        let report = match read_request(file, &batch) {
            Ok(raw) => session.validate(&batch, &raw)?,
            Err(violation) => ValidationReport::new(&batch, vec![violation]),
        };
        tracing::debug!(file = %batch, violations = report.len(), "Validated");
        reports.push(report);
    }

    let run = RunReport::new(reports);
    let text = if args.json_mode {
        serde_json::to_string_pretty(&run).map_err(|e| KvError::SerializationError(e.to_string()))?
    } else {
        render_markdown(&run)
    };
    println!("{}", text);

    if let Some(path) = report_path {
        let validated = validate_output_path(path)?;
        fs::write(&validated, &text)
            .map_err(|e| KvError::IoError(format!("Write report: {}", e)))?;
        tracing::info!("Report written to {}", validated.display());
    }

    if run.valid {
        tracing::info!("All {} file(s) passed validation", run.files.len());
    } else {
        tracing::warn!("Validation failed with {} error(s)", run.error_count);
    }
    Ok(CommandStatus::from_failures(run.error_count))
}

// =============================================================================
// SUBMIT COMMAND
// =============================================================================

#[derive(Debug, Serialize)]
struct CommittedFile {
    file: String,
    entries: usize,
}

#[derive(Debug, Serialize)]
struct SubmitSummary {
    committed: Vec<CommittedFile>,
    rejected: RunReport,
}

/// Validate and commit each file as its own unit.
///
/// A rejected file leaves the registry untouched and does not stop later
/// files, which are validated against everything committed so far.
pub fn cmd_submit(
    args: &RegistryArgs,
    files: &[PathBuf],
    pr: Option<u64>,
) -> Result<CommandStatus, KvError> {
    let _lock = writer_lock(args)?;
    let mut session = open_registry(args)?;

    let mut ctx = SubmissionContext::new(today());
    if let Some(pr) = pr {
        ctx = ctx.with_pr(pr);
    }

    let mut committed = Vec::new();
    let mut rejected = Vec::new();
    for file in files {
        let batch = file.display().to_string();
        let raw = match read_request(file, &batch) {
            Ok(raw) => raw,
            Err(violation) => {
                tracing::warn!("Rejected {}: {}", batch, violation.message);
                rejected.push(ValidationReport::new(&batch, vec![violation]));
                continue;
            }
        };

        match session.submit(&batch, &raw, &ctx)? {
            SubmitOutcome::Committed(count) => {
                save_session(&session, &args.path)?;
                tracing::info!("Committed {} entries from {}", count, batch);
                committed.push(CommittedFile {
                    file: batch,
                    entries: count,
                });
            }
            SubmitOutcome::Rejected(report) => {
                tracing::warn!("Rejected {} with {} violation(s)", batch, report.len());
                rejected.push(report);
            }
        }
    }

    let status = CommandStatus::from_failures(rejected.len());
    let summary = SubmitSummary {
        committed,
        rejected: RunReport::new(rejected),
    };

    if args.json_mode {
        print_json(&summary)?;
    } else {
        for file in &summary.committed {
            println!("✅ `{}`: {} entries committed", file.file, file.entries);
        }
        if !summary.rejected.files.is_empty() {
            println!();
            println!("{}", render_markdown(&summary.rejected));
        }
    }

    Ok(status)
}

// =============================================================================
// ASSIGN COMMAND
// =============================================================================

/// Result of one ontology unit in an `assign` run.
#[derive(Debug, Serialize)]
pub struct UnitReport {
    pub ontology: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<UnitOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Run the selected units. Each unit succeeds or fails on its own.
pub fn run_units(
    config: &OntologyConfig,
    ids: &[String],
    output_dir: &Path,
) -> Result<Vec<UnitReport>, KvError> {
    let units = config.select(ids)?;
    fs::create_dir_all(output_dir).map_err(|e| {
        KvError::IoError(format!("Create {}: {}", output_dir.display(), e))
    })?;

    let mut reports = Vec::with_capacity(units.len());
    for unit in units {
        let report = match run_unit(unit, output_dir) {
            Ok(outcome) => UnitReport {
                ontology: unit.name.clone(),
                outcome: Some(outcome),
                error: None,
                details: Vec::new(),
            },
            Err(e) => {
                tracing::error!("Failed to process {}: {}", unit.name, e);
                let details = e.details();
                for line in &details {
                    tracing::error!("  {}", line);
                }
                UnitReport {
                    ontology: unit.name.clone(),
                    outcome: None,
                    error: Some(e.to_string()),
                    details,
                }
            }
        };
        reports.push(report);
    }
    Ok(reports)
}

/// Assign codepoints to the configured ontologies.
pub fn cmd_assign(
    config_path: &Path,
    ids: &[String],
    output_dir: &Path,
    json_mode: bool,
) -> Result<CommandStatus, KvError> {
    let config = OntologyConfig::load(config_path)?;
    let reports = run_units(&config, ids, output_dir)?;
    let failures = reports.iter().filter(|r| r.error.is_some()).count();

    if json_mode {
        print_json(&reports)?;
    } else {
        for report in &reports {
            let line = match (&report.outcome, &report.error) {
                (
                    Some(UnitOutcome::Written {
                        path,
                        added,
                        unchanged,
                        pinned,
                        advisories,
                    }),
                    _,
                ) => format!(
                    "wrote {} ({} new, {} unchanged, {} pinned, {} advisories)",
                    path.display(),
                    added,
                    unchanged,
                    pinned,
                    advisories.len()
                ),
                (Some(UnitOutcome::Empty), _) => "no concepts, nothing written".to_string(),
                (Some(UnitOutcome::Protected), _) => "protected, skipped".to_string(),
                (None, Some(error)) => format!("FAILED: {}", error),
                (None, None) => "not run".to_string(),
            };
            println!("{:<24} {}", report.ontology, line);
        }
        println!();
        println!(
            "Processed {} ontologies, {} failed",
            reports.len(),
            failures
        );
    }

    Ok(CommandStatus::from_failures(failures))
}

// =============================================================================
// LIST COMMAND
// =============================================================================

#[derive(Debug, Serialize)]
struct ListedUnit<'a> {
    name: &'a str,
    start_code_point: u64,
    source: String,
    output: String,
    protected: bool,
}

/// List configured ontologies.
pub fn cmd_list(config_path: &Path, json_mode: bool) -> Result<CommandStatus, KvError> {
    let config = OntologyConfig::load(config_path)?;
    let listed: Vec<ListedUnit<'_>> = config
        .units
        .iter()
        .map(|u| ListedUnit {
            name: &u.name,
            start_code_point: u.start_code_point,
            source: u.source.display().to_string(),
            output: u.output_file_name(),
            protected: u.is_protected(),
        })
        .collect();

    if json_mode {
        print_json(&listed)?;
        return Ok(CommandStatus::Clean);
    }

    println!("{:<20} {:>10}  {}", "ONTOLOGY", "START", "OUTPUT");
    for unit in &listed {
        let marker = if unit.protected { "  (protected)" } else { "" };
        println!(
            "{:<20} {:>10}  {}{}",
            unit.name, unit.start_code_point, unit.output, marker
        );
    }
    Ok(CommandStatus::Clean)
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show registry status.
pub fn cmd_status(args: &RegistryArgs) -> Result<CommandStatus, KvError> {
    let session = open_registry(args)?;
    let stats = session.statistics()?;
    let source = session.source();

    if args.json_mode {
        let output = serde_json::json!({
            "registry": args.path.to_string_lossy(),
            "backend": args.backend.as_str(),
            "name": source.name,
            "start_code_point": source.start_code_point.value(),
            "min_codepoint": args.engine.min_codepoint().value(),
            "statistics": stats,
        });
        print_json(&output)?;
        return Ok(CommandStatus::Clean);
    }

    let end = stats
        .code_point_range
        .end
        .map_or_else(|| "-".to_string(), |e| e.to_string());

    println!("kvreg Registry Status");
    println!("=====================");
    println!("Registry: {}", args.path.display());
    println!("Backend:  {}", args.backend.as_str());
    println!("Name:     {}", source.name);
    println!();
    println!("Entries:        {}", stats.total_entries);
    println!("Range:          {} - {}", stats.code_point_range.start, end);
    println!("Min codepoint:  {}", args.engine.min_codepoint());

    Ok(CommandStatus::Clean)
}

// =============================================================================
// LOOKUP COMMAND
// =============================================================================

fn print_entry(entry: &RegistryEntry) {
    println!(
        "{}  {}  {}",
        entry.codepoint, entry.canonical_name, entry.entry_type
    );
    if let Some(uri) = entry.uri_key() {
        println!("  uri:         {}", uri);
    }
    println!("  description: {}", entry.description);
    if let Some(source) = &entry.source {
        println!(
            "  submitted:   {} on {}",
            source.submitter, source.assigned_date
        );
    }
}

/// Find one entry. A miss is reported as a failed status.
pub fn cmd_lookup(args: &RegistryArgs, key: &LookupKey) -> Result<CommandStatus, KvError> {
    let session = open_registry(args)?;
    let found = match (key.codepoint, key.name.as_deref(), key.uri.as_deref()) {
        (Some(cp), _, _) => session.lookup_codepoint(Codepoint(cp))?,
        (None, Some(name), _) => session.lookup_name(name)?,
        (None, None, Some(uri)) => session.lookup_uri(uri)?,
        (None, None, None) => {
            return Err(KvError::IoError(
                "Give one of --codepoint, --name or --uri".to_string(),
            ));
        }
    };

    if args.json_mode {
        print_json(&serde_json::json!({ "found": found.is_some(), "entry": found }))?;
    } else {
        match &found {
            Some(entry) => print_entry(entry),
            None => println!("Not found"),
        }
    }

    Ok(if found.is_some() {
        CommandStatus::Clean
    } else {
        CommandStatus::Failed
    })
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create an empty registry.
pub fn cmd_init(args: &RegistryArgs, force: bool) -> Result<CommandStatus, KvError> {
    if args.path.exists() && !force {
        return Err(KvError::IoError(
            "Registry already exists. Use --force to overwrite.".to_string(),
        ));
    }

    match args.backend {
        Backend::Redb => {
            if args.path.exists() {
                fs::remove_file(&args.path)
                    .map_err(|e| KvError::IoError(format!("Remove old registry: {}", e)))?;
            }
            let _session = Session::with_redb(&args.path, default_source(args))?;
            println!("Initialized new redb registry at {}", args.path.display());
        }
        Backend::Json => {
            let _lock = RegistryLock::acquire(&args.path)?;
            write_registry_file(&Registry::new(default_source(args)), &args.path)?;
            println!("Initialized new JSON registry at {}", args.path.display());
        }
    }

    Ok(CommandStatus::Clean)
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write the canonical export of the registry.
pub fn cmd_export(args: &RegistryArgs, output: &Path) -> Result<CommandStatus, KvError> {
    let validated_output = validate_output_path(output)?;
    let session = open_registry(args)?;

    let data = session.export_canonical()?;
    let checksum = session.canonical_checksum()?;

    fs::write(&validated_output, &data)
        .map_err(|e| KvError::IoError(format!("Write file: {}", e)))?;

    if args.json_mode {
        print_json(&serde_json::json!({
            "output": validated_output.to_string_lossy(),
            "bytes": data.len(),
            "checksum": checksum,
        }))?;
    } else {
        println!("Checksum: {}", checksum);
        println!(
            "Exported {} bytes to {}",
            data.len(),
            validated_output.display()
        );
    }

    Ok(CommandStatus::Clean)
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Load a canonical export.
///
/// The JSON backend replaces the target file (with `--force` if it exists);
/// the redb backend only accepts an empty database, since committed entries
/// are never overwritten.
pub fn cmd_import(args: &RegistryArgs, input: &Path, force: bool) -> Result<CommandStatus, KvError> {
    let data = read_input(input, MAX_IMPORT_FILE_SIZE)?;
    let imported = import_canonical(&data)?;
    let count = imported.entry_count()?;

    match args.backend {
        Backend::Json => {
            if args.path.exists() && !force {
                return Err(KvError::IoError(
                    "Registry already exists. Use --force to overwrite.".to_string(),
                ));
            }
            let _lock = RegistryLock::acquire(&args.path)?;
            write_registry_file(&imported, &args.path)?;
        }
        Backend::Redb => {
            let mut store = RedbRegistry::open(&args.path, imported.source().clone())?;
            if store.entry_count()? > 0 {
                return Err(KvError::IoError(format!(
                    "Refusing to import into non-empty redb registry {}",
                    args.path.display()
                )));
            }
            store.set_source(imported.source().clone())?;
            store.append(imported.as_slice().to_vec())?;
        }
    }

    println!(
        "Imported {} entries of {} into {}",
        count,
        imported.source().name,
        args.path.display()
    );
    Ok(CommandStatus::Clean)
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the canonical checksum and BLAKE3 digest.
pub fn cmd_hash(args: &RegistryArgs) -> Result<CommandStatus, KvError> {
    let session = open_registry(args)?;
    let checksum = session.canonical_checksum()?;
    let digest = session.canonical_crypto_hash()?;
    let entries = session.store().entry_count()?;

    if args.json_mode {
        print_json(&serde_json::json!({
            "checksum": checksum,
            "blake3": digest,
            "entries": entries,
        }))?;
    } else {
        println!("Entries:  {}", entries);
        println!("Checksum: {}", checksum);
        println!("BLAKE3:   {}", digest);
    }

    Ok(CommandStatus::Clean)
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server as the single writer of the registry.
pub async fn cmd_serve(
    args: &RegistryArgs,
    host: &str,
    port: u16,
) -> Result<CommandStatus, KvError> {
    let _lock = writer_lock(args)?;
    let session = open_registry(args)?;

    let config = ServerConfig::from_env();
    let submit_guard = match (&config.submit_key, config.submissions_per_minute) {
        (Some(_), 0) => "bearer key".to_string(),
        (Some(_), n) => format!("bearer key, {} batches/minute", n),
        (None, 0) => "open".to_string(),
        (None, n) => format!("open, {} batches/minute", n),
    };

    let mut state = AppState::new(session).with_config(config);
    if args.backend == Backend::Json {
        state = state.persisting_to(args.path.clone());
    }

    println!("kvreg Registry Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", args.backend.as_str());
    println!("  Registry: {}", args.path.display());
    println!("  Submit:   {}", submit_guard);
    println!();
    println!("Endpoints:");
    println!("  GET  /health              - Health check");
    println!("  GET  /status              - Registry statistics");
    println!("  GET  /entries/{{codepoint}} - Entry by codepoint");
    println!("  GET  /lookup              - Entry by name or uri");
    println!("  POST /validate            - Validate a request document");
    println!("  POST /submit              - Validate and commit");
    println!("  POST /export              - Canonical export");
    println!("  GET  /hash                - Checksum and BLAKE3 digest");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await?;
    Ok(CommandStatus::Clean)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kvreg_core::ValidationEngine;
    use tempfile::tempdir;

    fn args(path: PathBuf, backend: Backend) -> RegistryArgs {
        RegistryArgs {
            path,
            backend,
            engine: ValidationEngine::default(),
            json_mode: true,
        }
    }

    const REQUEST: &str = r#"{
        "request": {"submitter": "Alice", "description": "d", "contact": "a@example.com"},
        "entries": [
            {"codepoint": 100000, "canonical_name": "alpha", "type": "class",
             "uri": "https://example.com/alpha", "description": "A first example concept"}
        ]
    }"#;

    #[test]
    fn missing_file_is_a_syntax_violation() {
        let temp = tempdir().expect("temp dir");
        let missing = temp.path().join("nope.json");
        let batch = missing.display().to_string();
        let violation = read_request(&missing, &batch).unwrap_err();
        assert_eq!(violation.rule, RuleId::Syntax);
        assert!(violation.message.starts_with("File does not exist: "));
    }

    #[test]
    fn submit_commits_then_rejects_resubmission() {
        let temp = tempdir().expect("temp dir");
        let request = temp.path().join("req.json");
        fs::write(&request, REQUEST).unwrap();
        let a = args(temp.path().join("registry.json"), Backend::Json);

        let first = cmd_submit(&a, std::slice::from_ref(&request), Some(3)).unwrap();
        assert_eq!(first, CommandStatus::Clean);
        let second = cmd_submit(&a, std::slice::from_ref(&request), None).unwrap();
        assert_eq!(second, CommandStatus::Failed);

        let session = open_registry(&a).unwrap();
        let entry = session.lookup_name("alpha").unwrap().unwrap();
        assert_eq!(entry.source.unwrap().pr_number, Some(3));
        assert!(!temp.path().join("registry.json.lock").exists());
    }

    #[test]
    fn validate_writes_report_and_flags_failures() {
        let temp = tempdir().expect("temp dir");
        let request = temp.path().join("req.json");
        fs::write(&request, REQUEST).unwrap();
        let report = temp.path().join("report.json");
        let a = args(temp.path().join("registry.json"), Backend::Json);

        let clean = cmd_validate(&a, std::slice::from_ref(&request), Some(&report)).unwrap();
        assert_eq!(clean, CommandStatus::Clean);
        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(&report).unwrap()).unwrap();
        assert_eq!(json["valid"], true);

        let files = vec![request, temp.path().join("missing.json")];
        assert_eq!(
            cmd_validate(&a, &files, None).unwrap(),
            CommandStatus::Failed
        );
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let temp = tempdir().expect("temp dir");
        let a = args(temp.path().join("registry.json"), Backend::Json);
        cmd_init(&a, false).unwrap();
        assert!(cmd_init(&a, false).is_err());
        assert!(cmd_init(&a, true).is_ok());
    }

    #[test]
    fn export_import_moves_a_registry_between_backends() {
        let temp = tempdir().expect("temp dir");
        let request = temp.path().join("req.json");
        fs::write(&request, REQUEST).unwrap();
        let json_args = args(temp.path().join("registry.json"), Backend::Json);
        cmd_submit(&json_args, std::slice::from_ref(&request), None).unwrap();

        let dump = temp.path().join("registry.kvc");
        cmd_export(&json_args, &dump).unwrap();

        let redb_args = args(temp.path().join("registry.redb"), Backend::Redb);
        cmd_import(&redb_args, &dump, false).unwrap();
        let redb = open_registry(&redb_args).unwrap();
        assert_eq!(
            redb.canonical_checksum().unwrap(),
            open_registry(&json_args).unwrap().canonical_checksum().unwrap()
        );
        drop(redb);

        // A populated redb registry is never overwritten.
        assert!(cmd_import(&redb_args, &dump, true).is_err());
    }

    #[test]
    fn lookup_miss_is_failed_status() {
        let temp = tempdir().expect("temp dir");
        let a = args(temp.path().join("registry.json"), Backend::Json);
        let key = LookupKey {
            codepoint: Some(42),
            name: None,
            uri: None,
        };
        assert_eq!(cmd_lookup(&a, &key).unwrap(), CommandStatus::Failed);
    }
}
