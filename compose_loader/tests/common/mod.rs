//! Shared helpers for the integration tests.

use anyhow::{Result, anyhow};
use compose_loader::types::{Environment, Project};
use compose_loader::{ComposeResult, ConfigDetails, Document, LoadOptions, MemorySource, load_with_source};

/// Working directory used by in-memory projects.
pub const APP_DIR: &str = "/app";

/// Load `files` (filename, YAML) from [`APP_DIR`], reading referenced
/// files from `source`.
pub fn load_documents(
    files: &[(&str, &str)],
    environment: Environment,
    options: &LoadOptions,
    source: &MemorySource,
) -> ComposeResult<Project> {
    let documents = files
        .iter()
        .map(|(name, yaml)| Document::from_bytes(*name, *yaml))
        .collect();
    load_with_source(ConfigDetails::new(APP_DIR, documents, environment), options, source)
}

/// Load a single `compose.yml` with default options and no extra files.
pub fn load_yaml(yaml: &str) -> Result<Project> {
    load_documents(
        &[("compose.yml", yaml)],
        Environment::new(),
        &LoadOptions::new().project_name("demo", true),
        &MemorySource::default(),
    )
    .map_err(|err| anyhow!(err.to_string()))
}

/// Rendered error of a failed load, or `None` when it succeeded.
pub fn load_error(yaml: &str) -> Option<String> {
    load_yaml(yaml).err().map(|err| err.to_string())
}
