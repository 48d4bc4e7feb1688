//! # kvreg CLI Module
//!
//! This module implements the CLI interface for kvreg.
//!
//! ## Available Commands
//!
//! - `validate` - Check request documents against the registry
//! - `submit` - Validate and commit request documents
//! - `assign` - Assign codepoints to configured ontologies
//! - `list` - List configured ontologies
//! - `status` - Show registry statistics
//! - `lookup` - Find one entry by codepoint, name or URI
//! - `init` - Create an empty registry
//! - `export` - Write the canonical export
//! - `import` - Load a canonical export
//! - `hash` - Canonical checksum and BLAKE3 digest
//! - `serve` - Start the HTTP server

mod commands;

use crate::store::Backend;
use clap::{Args, Parser, Subcommand};
use kvreg_core::{Codepoint, KvError, ValidationEngine, primitives::MIN_COMMUNITY_CODEPOINT};
use std::path::PathBuf;
use std::process::ExitCode;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// kvreg - Known Value registry tool
///
/// Keeps codepoint registries consistent: validates community submissions
/// and assigns codepoints to ontology concepts without ever reassigning one.
#[derive(Parser, Debug)]
#[command(name = "kvreg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the registry (JSON document or redb database)
    #[arg(short = 'R', long, global = true, default_value = "registry.json")]
    pub registry: PathBuf,

    /// Storage backend
    #[arg(short = 'B', long, global = true, value_enum, default_value_t = Backend::Json)]
    pub backend: Backend,

    /// Lowest codepoint a submission may claim
    #[arg(long, global = true, default_value_t = MIN_COMMUNITY_CODEPOINT)]
    pub min_codepoint: u64,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Exactly one lookup key.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct LookupKey {
    /// Codepoint to find
    #[arg(long)]
    pub codepoint: Option<u64>,

    /// Canonical name to find
    #[arg(long)]
    pub name: Option<String>,

    /// URI to find
    #[arg(long)]
    pub uri: Option<String>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate request documents without committing them
    Validate {
        /// Request documents to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also write the report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Validate and commit request documents, one unit per file
    Submit {
        /// Request documents to commit
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Review request number recorded in each entry's provenance
        #[arg(long)]
        pr: Option<u64>,
    },

    /// Assign codepoints to configured ontologies
    Assign {
        /// Ontology unit file
        #[arg(short, long, default_value = "ontologies.toml")]
        config: PathBuf,

        /// Only process these ontologies (repeatable, case-insensitive)
        #[arg(short = 'o', long = "ontology")]
        ontologies: Vec<String>,

        /// Directory receiving `<start>_<name>_registry.json` files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// List configured ontologies
    List {
        /// Ontology unit file
        #[arg(short, long, default_value = "ontologies.toml")]
        config: PathBuf,
    },

    /// Show registry statistics
    Status,

    /// Find one entry
    Lookup {
        #[command(flatten)]
        key: LookupKey,
    },

    /// Create an empty registry
    Init {
        /// Overwrite an existing registry
        #[arg(short, long)]
        force: bool,
    },

    /// Write the canonical export
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Load a canonical export into an empty registry
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Replace an existing JSON registry
        #[arg(short, long)]
        force: bool,
    },

    /// Canonical checksum and BLAKE3 digest of the registry
    Hash,

    /// Start HTTP server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

// =============================================================================
// COMMAND STATUS
// =============================================================================

/// Result of a command that ran to completion.
///
/// `Failed` means the command worked but found problems (violations,
/// rejected units, missing entries); errors that stop a command are
/// returned as [`KvError`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Clean,
    Failed,
}

impl CommandStatus {
    #[must_use]
    pub fn from_failures(failures: usize) -> Self {
        if failures == 0 {
            Self::Clean
        } else {
            Self::Failed
        }
    }
}

impl From<CommandStatus> for ExitCode {
    fn from(status: CommandStatus) -> Self {
        match status {
            CommandStatus::Clean => ExitCode::SUCCESS,
            CommandStatus::Failed => ExitCode::FAILURE,
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Registry selection shared by every registry-backed command.
#[derive(Debug, Clone)]
pub struct RegistryArgs {
    pub path: PathBuf,
    pub backend: Backend,
    pub engine: ValidationEngine,
    pub json_mode: bool,
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<CommandStatus, KvError> {
    let args = RegistryArgs {
        path: cli.registry,
        backend: cli.backend,
        engine: ValidationEngine::new(Codepoint(cli.min_codepoint)),
        json_mode: cli.json_mode,
    };

    match cli.command {
        Some(Commands::Validate { files, report }) => {
            cmd_validate(&args, &files, report.as_deref())
        }
        Some(Commands::Submit { files, pr }) => cmd_submit(&args, &files, pr),
        Some(Commands::Assign {
            config,
            ontologies,
            output_dir,
        }) => cmd_assign(&config, &ontologies, &output_dir, args.json_mode),
        Some(Commands::List { config }) => cmd_list(&config, args.json_mode),
        Some(Commands::Lookup { key }) => cmd_lookup(&args, &key),
        Some(Commands::Init { force }) => cmd_init(&args, force),
        Some(Commands::Export { output }) => cmd_export(&args, &output),
        Some(Commands::Import { input, force }) => cmd_import(&args, &input, force),
        Some(Commands::Hash) => cmd_hash(&args),
        Some(Commands::Serve { host, port }) => cmd_serve(&args, &host, port).await,
        // No subcommand - show status by default
        Some(Commands::Status) | None => cmd_status(&args),
    }
}
