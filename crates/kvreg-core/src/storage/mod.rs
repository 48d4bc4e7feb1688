//! # Storage
//!
//! Disk-backed registry storage.

pub mod redb_registry;

pub use redb_registry::RedbRegistry;
