//! # Registry Files
//!
//! Opening, saving and locking registries on disk, plus the path and size
//! checks every command applies before touching user-supplied files.

use chrono::Utc;
use clap::ValueEnum;
use kvreg_core::{
    KvError, Registry, RegistrySource, RegistryStore, Session, ValidationEngine, load_registry,
    registry_to_vec,
};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a request document or concept source (16 MB).
pub const MAX_INPUT_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum size of a registry file or canonical import (500 MB).
pub const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Where a registry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Pretty-printed JSON registry document.
    Json,
    /// redb database with transactional commits.
    Redb,
}

impl Backend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Redb => "redb",
        }
    }
}

// =============================================================================
// PATH CHECKS
// =============================================================================

/// Reject files larger than `max_size` before reading them.
pub fn validate_file_size(path: &Path, max_size: u64) -> Result<(), KvError> {
    let metadata = fs::metadata(path)
        .map_err(|e| KvError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(KvError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
pub fn validate_file_path(path: &Path) -> Result<PathBuf, KvError> {
    let canonical = path.canonicalize().map_err(|e| {
        KvError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(KvError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent directory of an output path.
pub fn validate_output_path(path: &Path) -> Result<PathBuf, KvError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        KvError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(KvError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| KvError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read a checked input file.
pub fn read_input(path: &Path, max_size: u64) -> Result<Vec<u8>, KvError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    fs::read(&validated).map_err(|e| KvError::IoError(format!("Read {}: {}", path.display(), e)))
}

// =============================================================================
// CLOCK
// =============================================================================

/// `YYYY-MM-DD` in UTC, used for `assigned_date`.
#[must_use]
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// RFC 3339 timestamp in UTC, used for `generated.last_updated`.
#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

// =============================================================================
// LOCK FILE
// =============================================================================

/// Exclusive lock on a JSON registry for the duration of a write.
///
/// Held as `<registry>.lock`, created with `create_new` so a second writer
/// fails fast instead of interleaving. Removed on drop.
#[derive(Debug)]
pub struct RegistryLock {
    lock_path: PathBuf,
    _file: File,
}

impl RegistryLock {
    pub fn acquire(registry: &Path) -> Result<Self, KvError> {
        let lock_path = lock_path_for(registry);
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                KvError::IoError(format!("Create {}: {}", parent.display(), e))
            })?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    now_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(KvError::IoError(
                format!("Registry is locked by another writer: {}", lock_path.display()),
            )),
            Err(e) => Err(KvError::IoError(format!(
                "Lock {}: {}",
                lock_path.display(),
                e
            ))),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_path_for(registry: &Path) -> PathBuf {
    let mut name = registry
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    registry.with_file_name(name)
}

// =============================================================================
// OPEN / SAVE
// =============================================================================

/// Load a JSON registry file. A missing file is an empty registry described
/// by `fallback`.
pub fn load_registry_file(path: &Path, fallback: RegistrySource) -> Result<Registry, KvError> {
    let raw = if path.exists() {
        validate_file_size(path, MAX_IMPORT_FILE_SIZE)?;
        Some(fs::read(path).map_err(|e| KvError::IoError(format!("Read {}: {}", path.display(), e)))?)
    } else {
        None
    };
    load_registry(raw.as_deref(), fallback)
}

/// Open a registry as a session.
pub fn open_session(
    path: &Path,
    backend: Backend,
    fallback: RegistrySource,
    engine: ValidationEngine,
) -> Result<Session, KvError> {
    let session = match backend {
        Backend::Redb => Session::with_redb(path, fallback)?,
        Backend::Json => Session::with_registry(load_registry_file(path, fallback)?),
    };
    Ok(session.with_engine(engine))
}

/// Persist a session. redb commits on every write, so only the JSON backend
/// has work to do here.
pub fn save_session(session: &Session, path: &Path) -> Result<(), KvError> {
    if session.is_persistent() {
        return Ok(());
    }
    write_registry_file(session.store(), path)
}

/// Write the JSON registry document for any store.
pub fn write_registry_file<S: RegistryStore + ?Sized>(store: &S, path: &Path) -> Result<(), KvError> {
    let bytes = registry_to_vec(store, Some(&now_rfc3339()))?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| KvError::IoError(format!("Create {}: {}", parent.display(), e)))?;
    }

    // Write beside the target and rename over it, so readers never see a
    // half-written registry.
    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(KvError::IoError(format!("Write {}: {}", tmp.display(), e)));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        KvError::IoError(format!("Replace {}: {}", path.display(), e))
    })
}

/// `<path>.tmp`, next to the target so the rename stays on one filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kvreg_core::Codepoint;
    use tempfile::tempdir;

    #[test]
    fn lock_is_exclusive_and_released() {
        let temp = tempdir().expect("temp dir");
        let registry = temp.path().join("registry.json");

        let lock = RegistryLock::acquire(&registry).unwrap();
        assert!(lock.path().ends_with("registry.json.lock"));
        assert!(RegistryLock::acquire(&registry).is_err());

        drop(lock);
        assert!(RegistryLock::acquire(&registry).is_ok());
    }

    #[test]
    fn missing_json_registry_is_empty() {
        let temp = tempdir().expect("temp dir");
        let session = open_session(
            &temp.path().join("none.json"),
            Backend::Json,
            RegistrySource::community(),
            ValidationEngine::default(),
        )
        .unwrap();
        assert_eq!(session.statistics().unwrap().total_entries, 0);
        assert_eq!(session.source().start_code_point, Codepoint(100_000));
    }

    #[test]
    fn save_writes_statistics_and_timestamp() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("nested").join("registry.json");
        let session = Session::new();
        save_session(&session, &path).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["statistics"]["total_entries"], 0);
        assert!(json["generated"]["last_updated"].is_string());

        let reopened = open_session(
            &path,
            Backend::Json,
            RegistrySource::new("ignored", Codepoint(1)),
            ValidationEngine::default(),
        )
        .unwrap();
        assert_eq!(reopened.store().source().name, "community_registry");
    }

    #[test]
    fn write_replaces_registry_without_leftovers() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("registry.json");
        fs::write(&path, b"stale").unwrap();

        let mut session = Session::new();
        let ctx = kvreg_core::SubmissionContext::new("2026-01-01");
        let doc = br#"{
            "request": {"submitter": "Alice", "description": "Adding example concepts", "contact": "alice@example.com"},
            "entries": [{"codepoint": 100000, "canonical_name": "alpha", "type": "class",
                         "uri": "https://example.com/alpha", "description": "A first example concept"}]
        }"#;
        assert!(session.submit("r", doc, &ctx).unwrap().is_committed());
        save_session(&session, &path).unwrap();

        let reloaded = load_registry_file(&path, RegistrySource::community()).unwrap();
        assert_eq!(reloaded.as_slice().len(), 1);
        assert!(!temp.path().join("registry.json.tmp").exists());
    }

    #[test]
    fn failed_replace_keeps_target_and_cleans_up() {
        let temp = tempdir().expect("temp dir");
        // A directory in the target's place makes the rename fail.
        let path = temp.path().join("registry.json");
        fs::create_dir(&path).unwrap();

        let err = write_registry_file(Session::new().store(), &path).unwrap_err();
        assert!(err.to_string().contains("registry.json"));
        assert!(path.is_dir());
        assert!(!temp.path().join("registry.json.tmp").exists());
    }

    #[test]
    fn output_path_without_parent_uses_cwd() {
        assert!(validate_output_path(Path::new("out.bin")).is_ok());
        assert!(validate_output_path(Path::new("/definitely/not/here/out.bin")).is_err());
    }

    #[test]
    fn today_is_a_date() {
        let d = today();
        assert_eq!(d.len(), 10);
        assert_eq!(&d[4..5], "-");
    }
}
