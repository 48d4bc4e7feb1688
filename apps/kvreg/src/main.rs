//! # kvreg - Known Value Registry Tool
//!
//! The main binary for the kvreg registry consistency engine.
//!
//! This application provides:
//! - CLI interface for validating and committing submissions
//! - Ontology assignment runs driven by a TOML unit file
//! - HTTP REST API server (axum-based) acting as single writer
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  apps/kvreg (THE BINARY)                 │
//! │                                                          │
//! │  ┌─────────────┐   ┌─────────────┐   ┌───────────────┐   │
//! │  │    CLI      │   │  HTTP API   │   │ Ontology runs │   │
//! │  │   (clap)    │   │   (axum)    │   │    (toml)     │   │
//! │  └──────┬──────┘   └──────┬──────┘   └───────┬───────┘   │
//! │         └─────────────────┼──────────────────┘           │
//! │                           ▼                              │
//! │                   ┌───────────────┐                      │
//! │                   │  kvreg-core   │                      │
//! │                   │  (THE LOGIC)  │                      │
//! │                   └───────────────┘                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! kvreg validate requests/new_entries.json --report report.md
//! kvreg submit requests/new_entries.json --pr 12
//! kvreg assign --config ontologies.toml -o rdf --output-dir registries
//! kvreg serve --host 0.0.0.0 --port 8080
//! ```

use clap::Parser;
use kvreg::cli;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // KVREG_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("KVREG_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "kvreg=debug,tower_http=debug"
    } else if cli.quiet {
        "kvreg=warn,tower_http=warn"
    } else {
        "kvreg=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    match cli::execute(cli).await {
        Ok(status) => status.into(),
        Err(e) => {
            tracing::error!("Error: {}", e);
            for line in e.details() {
                tracing::error!("  {}", line);
            }
            ExitCode::FAILURE
        }
    }
}
