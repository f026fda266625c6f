//! Loader for multi-container application definitions in the compose file
//! format.
//!
//! [`load`] takes one or more documents, runs each through key
//! normalization, variable interpolation, optional schema validation,
//! shorthand expansion and typed decoding with `extends` resolution, merges
//! them in order and returns a normalized, cross-checked [`types::Project`].
//! [`discovery::ProjectOptions`] wraps the same pipeline with compose-file
//! discovery and `COMPOSE_*` environment handling.
//!
//! The crate only emits `tracing` events; installing a subscriber is left to
//! the application.

use std::sync::Arc;

pub mod consistency;
pub mod discovery;
mod document;
pub mod dotenv;
mod error;
pub mod interpolation;
pub mod keys;
mod loader;
pub mod merge;
pub mod normalize;
pub mod path;
pub mod paths;
mod result_ext;
pub mod transform;
pub mod types;

pub use document::{Document, DocumentSource, Node};
pub use error::{ComposeError, ServiceRef};
pub use loader::{
    ConfigDetails, FileSource, FsSource, LoadOptions, MemorySource, PROJECT_NAME_VARIABLE, Validator, load,
    load_with_source, normalize_project_name,
};
pub use result_ext::{ComposeResultExt, IoResultExt};

/// Result type used throughout the crate. Errors are reference counted so
/// they can be cloned cheaply while propagating through the pipeline.
pub type ComposeResult<T> = Result<T, Arc<ComposeError>>;
