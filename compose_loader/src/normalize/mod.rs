//! Default injection and deprecated-field relocation on the merged project.
//!
//! Every step leaves the project in a state the same step accepts again
//! unchanged, so normalizing twice equals normalizing once.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use crate::loader::FileSource;
use crate::paths::{absolute_dir, absolutize, expand_user, is_remote_context};
use crate::types::{
    BuildConfig, DeployConfig, Environment, LoggingConfig, MappingWithEquals, NamedResource, NetworkConfig,
    PULL_POLICY_IF_NOT_PRESENT, PULL_POLICY_MISSING, Project, ServiceConfig,
};
use crate::{ComposeError, ComposeResult};

/// Name of the network services join when they declare none.
pub const DEFAULT_NETWORK: &str = "default";

/// Dockerfile name used when a build does not name one.
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Normalize `project` in place.
///
/// `source` decides whether a build context names an existing local
/// directory; only those are made absolute, and only when `resolve_paths`
/// is set.
///
/// # Errors
///
/// Returns [`ComposeError::Conflict`] when a deprecated field and its
/// replacement are both set, and [`ComposeError::Io`] when the working
/// directory cannot be made absolute.
pub fn normalize(project: &mut Project, resolve_paths: bool, source: &dyn FileSource) -> ComposeResult<()> {
    project.working_dir = absolute_dir(&project.working_dir)?;
    for file in &mut project.compose_files {
        *file = Utf8PathBuf::from(absolutize(&project.working_dir, file.as_str()));
    }

    project
        .networks
        .entry(DEFAULT_NETWORK.to_owned())
        .or_insert_with(NetworkConfig::default);

    relocate_external_name("networks", &mut project.networks)?;
    relocate_external_name("volumes", &mut project.volumes)?;
    relocate_external_name("secrets", &mut project.secrets)?;
    relocate_external_name("configs", &mut project.configs)?;

    for service in project.services.values_mut() {
        normalize_service(service, &project.working_dir, &project.environment, resolve_paths, source)?;
    }

    set_name_from_key(&project.name, &mut project.networks);
    set_name_from_key(&project.name, &mut project.volumes);
    set_name_from_key(&project.name, &mut project.secrets);
    set_name_from_key(&project.name, &mut project.configs);
    Ok(())
}

fn normalize_service(
    service: &mut ServiceConfig,
    working_dir: &Utf8Path,
    environment: &Environment,
    resolve_paths: bool,
    source: &dyn FileSource,
) -> ComposeResult<()> {
    if service.networks.is_empty() && service.network_mode.is_empty() {
        service.networks.insert(DEFAULT_NETWORK.to_owned(), None);
    }
    if service.pull_policy == PULL_POLICY_IF_NOT_PRESENT {
        service.pull_policy = PULL_POLICY_MISSING.to_owned();
    }

    relocate_log_driver(service)?;
    relocate_log_opt(service)?;
    relocate_dockerfile(service)?;
    relocate_scale(service)?;

    if let Some(build) = &mut service.build {
        if build.dockerfile.is_empty() {
            build.dockerfile = DEFAULT_DOCKERFILE.to_owned();
        }
        if resolve_paths && !is_remote_context(&build.context) {
            let local = absolutize(working_dir, &expand_user(&build.context));
            if source.exists(Utf8Path::new(&local)) {
                build.context = local;
            }
        }
        resolve_missing(&mut build.args, environment);
    }
    resolve_missing(&mut service.environment, environment);
    Ok(())
}

/// Fill entries without a value from `environment` when it has them.
fn resolve_missing(mapping: &mut MappingWithEquals, environment: &Environment) {
    for (key, value) in mapping.iter_mut() {
        if value.is_none() {
            *value = environment.get(key).cloned();
        }
    }
}

fn conflict(service: &ServiceConfig, deprecated: &str, canonical: &str) -> std::sync::Arc<ComposeError> {
    ComposeError::conflict(
        format!("service {}", service.name),
        format!("can't use both '{deprecated}' (deprecated) and '{canonical}'"),
    )
}

fn relocate_log_driver(service: &mut ServiceConfig) -> ComposeResult<()> {
    if service.log_driver.is_empty() {
        return Ok(());
    }
    warn!(service = %service.name, "`log_driver` is deprecated. Use the `logging` element");
    if service.logging.as_ref().is_some_and(|logging| !logging.driver.is_empty()) {
        return Err(conflict(service, "log_driver", "logging.driver"));
    }
    let driver = std::mem::take(&mut service.log_driver);
    service.logging.get_or_insert_with(LoggingConfig::default).driver = driver;
    Ok(())
}

fn relocate_log_opt(service: &mut ServiceConfig) -> ComposeResult<()> {
    if service.log_opt.is_empty() {
        return Ok(());
    }
    warn!(service = %service.name, "`log_opt` is deprecated. Use the `logging` element");
    let overlaps = service
        .logging
        .as_ref()
        .is_some_and(|logging| service.log_opt.keys().any(|key| logging.options.contains_key(key)));
    if overlaps {
        return Err(conflict(service, "log_opt", "logging.options"));
    }
    let options = std::mem::take(&mut service.log_opt);
    service
        .logging
        .get_or_insert_with(LoggingConfig::default)
        .options
        .extend(options);
    Ok(())
}

fn relocate_dockerfile(service: &mut ServiceConfig) -> ComposeResult<()> {
    if service.dockerfile.is_empty() {
        return Ok(());
    }
    warn!(service = %service.name, "`dockerfile` is deprecated. Use the `build` element");
    if service.build.as_ref().is_some_and(|build| !build.dockerfile.is_empty()) {
        return Err(conflict(service, "dockerfile", "build.dockerfile"));
    }
    let dockerfile = std::mem::take(&mut service.dockerfile);
    service.build.get_or_insert_with(BuildConfig::default).dockerfile = dockerfile;
    Ok(())
}

fn relocate_scale(service: &mut ServiceConfig) -> ComposeResult<()> {
    let Some(scale) = service.scale else {
        return Ok(());
    };
    warn!(service = %service.name, "`scale` is deprecated. Use the `deploy.replicas` element");
    let replicas = service.deploy.as_ref().and_then(|deploy| deploy.replicas);
    if replicas.is_some_and(|count| count != scale) {
        return Err(conflict(service, "scale", "deploy.replicas"));
    }
    service.scale = None;
    service.deploy.get_or_insert_with(DeployConfig::default).replicas = Some(scale);
    Ok(())
}

fn relocate_external_name<T: NamedResource>(section: &str, resources: &mut BTreeMap<String, T>) -> ComposeResult<()> {
    for (key, resource) in resources.iter_mut() {
        if resource.external().name.is_empty() {
            continue;
        }
        if !resource.name().is_empty() {
            return Err(ComposeError::conflict(
                format!("{section}.{key}"),
                format!("can't use both '{section}.external.name' (deprecated) and '{section}.name'"),
            ));
        }
        warn!(resource = %key, "`{section}.external.name` is deprecated. Use `{section}.name`");
        let name = std::mem::take(&mut resource.external_mut().name);
        *resource.name_mut() = name;
    }
    Ok(())
}

fn set_name_from_key<T: NamedResource>(project: &str, resources: &mut BTreeMap<String, T>) {
    for (key, resource) in resources.iter_mut() {
        if resource.name().is_empty() {
            *resource.name_mut() = if project.is_empty() {
                key.clone()
            } else {
                format!("{project}_{key}")
            };
        }
    }
}
