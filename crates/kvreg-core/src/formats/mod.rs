//! # Formats
//!
//! On-disk document formats. File I/O itself lives in the app layer.

pub mod persistence;

pub use persistence::{
    MAX_REGISTRY_DOCUMENT_SIZE, RegistryDocument, load_registry, registry_from_slice,
    registry_to_vec,
};
