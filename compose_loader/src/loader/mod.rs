//! The [`load`] entry point.
//!
//! Loading runs every document through the same per-document pipeline
//! (decode, key normalization, interpolation, validation, shorthand
//! expansion, typed decoding with `extends` resolution), merges the
//! resulting configs in file order, then normalizes and checks the merged
//! project.

mod extends;
mod options;
mod sections;
mod service;
mod source;

pub use options::{LoadOptions, Validator, normalize_project_name};
pub use source::{FileSource, FsSource, MemorySource};

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use tracing::debug;

use crate::consistency::check_consistency;
use crate::document::Document;
use crate::interpolation::{CastTable, default_casts, interpolate};
use crate::keys::normalize_document;
use crate::merge::merge;
use crate::normalize::normalize;
use crate::path::FieldPath;
use crate::paths::absolutize;
use crate::transform::{TransformTable, default_transforms, transform};
use crate::types::{Config, Environment, Project};
use crate::{ComposeError, ComposeResult};

use extends::ExtendsResolver;

/// Environment variable that receives the resolved project name.
pub const PROJECT_NAME_VARIABLE: &str = "COMPOSE_PROJECT_NAME";

/// Inputs of one [`load`] call.
#[derive(Debug, Clone, Default)]
pub struct ConfigDetails {
    /// Directory that relative paths in the documents are resolved against.
    pub working_dir: Utf8PathBuf,
    /// Documents in override order: later documents win.
    pub documents: Vec<Document>,
    /// Variables visible to interpolation and environment resolution.
    pub environment: Environment,
}

impl ConfigDetails {
    /// Bundle the inputs of a load.
    #[must_use]
    pub fn new(working_dir: impl Into<Utf8PathBuf>, documents: Vec<Document>, environment: Environment) -> Self {
        Self {
            working_dir: working_dir.into(),
            documents,
            environment,
        }
    }

    /// Value of the environment variable `name`, if set.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<String> {
        self.environment.get(name).cloned()
    }
}

/// Load a project from `details`, reading referenced files from the local
/// filesystem.
///
/// # Errors
///
/// Fails on the first error raised by any stage. No partial project is
/// returned.
///
/// # Examples
///
/// ```
/// use compose_loader::{ConfigDetails, Document, LoadOptions, load};
///
/// let yaml = "services:\n  web:\n    image: nginx\n    ports: [\"8080:80\"]\n";
/// let details = ConfigDetails::new("/srv/app", vec![Document::from_bytes("compose.yml", yaml)], Default::default());
/// let project = load(details, &LoadOptions::new().project_name("demo", true)).unwrap();
/// assert_eq!(project.service_names(), ["web"]);
/// assert!(project.networks.contains_key("default"));
/// ```
pub fn load(details: ConfigDetails, options: &LoadOptions) -> ComposeResult<Project> {
    load_with_source(details, options, &FsSource)
}

/// Load a project, reading `extends` targets and env files from `source`.
///
/// # Errors
///
/// Fails on the first error raised by any stage.
pub fn load_with_source(
    details: ConfigDetails,
    options: &LoadOptions,
    source: &dyn FileSource,
) -> ComposeResult<Project> {
    if details.documents.is_empty() {
        return Err(ComposeError::decode("", "No files specified"));
    }
    let pipeline = Pipeline::new(&details, options, source);
    let mut configs = Vec::with_capacity(details.documents.len());
    for document in &details.documents {
        debug!(file = %document.filename, "loading compose document");
        let mut config = pipeline.load_config(document)?;
        if options.discard_env_files {
            for service in config.services.values_mut() {
                service.env_file.clear();
            }
        }
        configs.push(config);
    }

    let mut model = merge(configs)?;
    for service in model.services.values_mut() {
        for file in &mut service.env_file {
            *file = absolutize(&details.working_dir, file);
        }
    }

    let name = project_name(&model.name, options);
    let mut environment = details.environment;
    if !name.is_empty() {
        environment.insert(PROJECT_NAME_VARIABLE.to_owned(), name.clone());
    }
    let mut project = Project {
        name,
        working_dir: details.working_dir,
        compose_files: details
            .documents
            .iter()
            .map(|document| Utf8PathBuf::from(&document.filename))
            .collect(),
        services: model.services,
        networks: model.networks,
        volumes: model.volumes,
        secrets: model.secrets,
        configs: model.configs,
        extensions: model.extensions,
        environment,
        disabled_services: Default::default(),
    };

    if !options.skip_normalization {
        normalize(&mut project, options.resolve_paths, source)?;
    }
    if !options.skip_consistency_check {
        check_consistency(&project)?;
    }
    debug!(project = %project.name, services = project.services.len(), "project loaded");
    Ok(project)
}

/// A `name:` from the documents wins unless the caller set a name
/// imperatively.
fn project_name(declared: &str, options: &LoadOptions) -> String {
    let normalized = normalize_project_name(declared);
    let (configured, imperative) = options.name();
    if !imperative && !normalized.is_empty() {
        normalized
    } else {
        configured.to_owned()
    }
}

/// Per-load state shared by every document: the lookup tables built once at
/// the start of the call and the collaborators supplied by the caller.
pub(crate) struct Pipeline<'a> {
    options: &'a LoadOptions,
    environment: &'a Environment,
    working_dir: &'a Utf8Path,
    casts: CastTable,
    transforms: TransformTable,
    source: &'a dyn FileSource,
}

impl<'a> Pipeline<'a> {
    fn new(details: &'a ConfigDetails, options: &'a LoadOptions, source: &'a dyn FileSource) -> Self {
        Self {
            options,
            environment: &details.environment,
            working_dir: &details.working_dir,
            casts: options.type_casts.clone().unwrap_or_else(default_casts),
            transforms: default_transforms(),
            source,
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.environment.get(name).cloned()
    }

    /// Run one document through key normalization, interpolation,
    /// validation and shorthand expansion.
    fn prepare(&self, document: &Document) -> ComposeResult<Map<String, Value>> {
        let tree = Value::Object(normalize_document(document.decode()?)?);
        let interpolated = if self.options.skip_interpolation {
            tree
        } else {
            interpolate(tree, &FieldPath::root(), &|name| self.lookup(name), &self.casts)?
        };
        if !self.options.skip_validation
            && let Some(validator) = self.options.validator
        {
            validator(&interpolated)?;
        }
        match transform(interpolated, &FieldPath::root(), &self.transforms)? {
            Value::Object(map) => Ok(map),
            _ => Err(ComposeError::decode("", "Top-level object must be a mapping")),
        }
    }

    /// Decode one document into a typed config with every service's
    /// `extends` chain resolved.
    fn load_config(&self, document: &Document) -> ComposeResult<Config> {
        let mut tree = self.prepare(document)?;
        let services = sections::take_services(&mut tree)?;
        let mut config = sections::decode_sections(tree, self.working_dir, self.options.resolve_paths)?;
        config.filename.clone_from(&document.filename);

        let scope = extends::Scope {
            file: absolutize(self.working_dir, &document.filename),
            working_dir: self.working_dir.to_path_buf(),
            services: &services,
        };
        for name in services.keys() {
            let service = ExtendsResolver::new(self).resolve(&scope, name)?;
            config.services.insert(name.clone(), service);
        }
        Ok(config)
    }
}
