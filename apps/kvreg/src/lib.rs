//! # kvreg
//!
//! Command-line tool and HTTP server over the kvreg registry engine.
//!
//! The library half exists so the integration tests can drive the router and
//! the command helpers directly; the binary in `main.rs` only sets up logging
//! and dispatches to [`cli::execute`].

pub mod api;
pub mod cli;
pub mod config;
pub mod ontology;
pub mod report;
pub mod store;
