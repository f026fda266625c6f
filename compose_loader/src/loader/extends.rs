//! `extends` resolution with cycle detection.
//!
//! Each top-level service gets a fresh [`ExtendsResolver`]. The resolver
//! keeps the set of services currently being resolved, keyed by document
//! and service name, plus the same entries in visiting order for error
//! reporting.

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use tracing::debug;

use super::service::load_service;
use super::{Pipeline, sections};
use crate::document::Document;
use crate::merge::merge_service;
use crate::paths::{absolutize, expand_user, is_remote_context};
use crate::types::{ServiceConfig, VOLUME_TYPE_BIND};
use crate::{ComposeError, ComposeResult, ServiceRef};

/// The document a service is being resolved in.
pub(super) struct Scope<'s> {
    /// Absolute path of the document, used as its identity.
    pub(super) file: String,
    /// Directory relative paths inside the document resolve against.
    pub(super) working_dir: Utf8PathBuf,
    /// Canonical, undecoded service entries of the document.
    pub(super) services: &'s Map<String, Value>,
}

pub(super) struct ExtendsResolver<'r, 'a> {
    pipeline: &'r Pipeline<'a>,
    visited: HashSet<ServiceRef>,
    chain: Vec<ServiceRef>,
}

impl<'r, 'a> ExtendsResolver<'r, 'a> {
    pub(super) fn new(pipeline: &'r Pipeline<'a>) -> Self {
        Self {
            pipeline,
            visited: HashSet::new(),
            chain: Vec::new(),
        }
    }

    /// Decode `name` from `scope` and merge it over the service it extends.
    pub(super) fn resolve(&mut self, scope: &Scope<'_>, name: &str) -> ComposeResult<ServiceConfig> {
        let key = ServiceRef::new(scope.file.as_str(), name);
        self.with_cycle_detection(key, |resolver| resolver.resolve_unchecked(scope, name))
    }

    fn with_cycle_detection<T, F>(&mut self, key: ServiceRef, operation: F) -> ComposeResult<T>
    where
        F: FnOnce(&mut Self) -> ComposeResult<T>,
    {
        if !self.visited.insert(key.clone()) {
            let mut chain = self.chain.clone();
            chain.push(key);
            return Err(ComposeError::circular(chain));
        }
        self.chain.push(key.clone());
        let result = operation(self);
        self.visited.remove(&key);
        self.chain.pop();
        result
    }

    fn resolve_unchecked(&mut self, scope: &Scope<'_>, name: &str) -> ComposeResult<ServiceConfig> {
        let raw = scope.services.get(name).cloned().ok_or_else(|| {
            ComposeError::reference(name, format!("cannot be extended: not defined in {}", scope.file))
        })?;
        let mut service = load_service(self.pipeline, name, raw, &scope.working_dir)?;
        if self.pipeline.options.skip_extends {
            return Ok(service);
        }
        let Some(extends) = service.extends.take() else {
            return Ok(service);
        };
        let base = match &extends.file {
            None => self.resolve(scope, &extends.service)?,
            Some(file) => {
                let mut imported = self.resolve_in_file(scope, file, &extends.service)?;
                rebase(&mut imported, file);
                imported
            }
        };
        debug!(service = name, base = %extends.service, file = %scope.file, "resolved extends");
        Ok(merge_service(base, service))
    }

    /// Read `file`, run it through the document pipeline and resolve
    /// `service` inside it.
    fn resolve_in_file(&mut self, scope: &Scope<'_>, file: &str, service: &str) -> ComposeResult<ServiceConfig> {
        let path = Utf8PathBuf::from(absolutize(&scope.working_dir, &expand_user(file)));
        let bytes = self.pipeline.source.read(&path)?;
        let document = Document::from_bytes(path.as_str(), bytes);
        let mut tree = self.pipeline.prepare(&document)?;
        let services = sections::take_services(&mut tree)?;
        let imported = Scope {
            working_dir: path.parent().map(Utf8Path::to_path_buf).unwrap_or_default(),
            file: path.into_string(),
            services: &services,
        };
        self.resolve(&imported, service)
    }
}

/// Rewrite relative paths of a service imported from `file` so they stay
/// valid from the importing document's directory. `~` is expanded first, so
/// home-relative paths are never joined onto `file`'s directory.
fn rebase(service: &mut ServiceConfig, file: &str) {
    let dir = Utf8Path::new(file).parent().unwrap_or_else(|| Utf8Path::new(""));
    if let Some(build) = &mut service.build
        && !is_remote_context(&build.context)
    {
        build.context = absolutize(dir, &expand_user(&build.context));
    }
    for volume in &mut service.volumes {
        if volume.kind == VOLUME_TYPE_BIND {
            volume.source = absolutize(dir, &expand_user(&volume.source));
        }
    }
}
