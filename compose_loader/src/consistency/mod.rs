//! Cross-reference checks on the final project.
//!
//! Checking stops at the first dangling reference.

use crate::types::{Project, SERVICE_PREFIX, ServiceConfig, VOLUME_TYPE_VOLUME};
use crate::{ComposeError, ComposeResult};

/// Verify that every service is buildable or pullable and that every
/// network, volume, secret, config and service it names is defined.
///
/// # Errors
///
/// Returns [`ComposeError::Reference`] for the first offending service.
///
/// # Examples
///
/// ```
/// use compose_loader::consistency::check_consistency;
/// use compose_loader::types::{Project, ServiceConfig};
///
/// let web = ServiceConfig { name: "web".to_owned(), image: "nginx".to_owned(), ..Default::default() };
/// let mut project = Project { services: [("web".to_owned(), web)].into(), ..Default::default() };
/// assert!(check_consistency(&project).is_ok());
///
/// if let Some(web) = project.services.get_mut("web") {
///     web.networks.insert("back".to_owned(), None);
/// }
/// let err = check_consistency(&project).unwrap_err();
/// assert_eq!(err.to_string(), "service \"web\" refers to undefined network back");
/// ```
pub fn check_consistency(project: &Project) -> ComposeResult<()> {
    project
        .services
        .iter()
        .try_for_each(|(name, service)| check_service(project, name, service))
}

fn check_service(project: &Project, name: &str, service: &ServiceConfig) -> ComposeResult<()> {
    let undefined = |kind: &str, target: &str| ComposeError::reference(name, format!("refers to undefined {kind} {target}"));

    match (service.image.is_empty(), service.build.is_some()) {
        (true, false) => {
            return Err(ComposeError::reference(
                name,
                "has neither an image nor a build context specified",
            ));
        }
        (false, true) => {
            return Err(ComposeError::reference(
                name,
                "specifies both an image and a build context; use exactly one",
            ));
        }
        _ => {}
    }

    if let Some(network) = service.networks.keys().find(|n| !project.networks.contains_key(*n)) {
        return Err(undefined("network", network));
    }
    if let Some(target) = service.network_mode.strip_prefix(SERVICE_PREFIX)
        && !project.services.contains_key(target)
    {
        return Err(ComposeError::reference(
            name,
            format!("depends on undefined service {target} for its network mode"),
        ));
    }
    let named_volume = service.volumes.iter().find(|volume| {
        volume.kind == VOLUME_TYPE_VOLUME
            && !volume.source.is_empty()
            && !project.volumes.contains_key(&volume.source)
    });
    if let Some(volume) = named_volume {
        return Err(undefined("volume", &volume.source));
    }
    if let Some(secret) = service.secrets.iter().find(|s| !project.secrets.contains_key(&s.source)) {
        return Err(undefined("secret", &secret.source));
    }
    if let Some(config) = service.configs.iter().find(|c| !project.configs.contains_key(&c.source)) {
        return Err(undefined("config", &config.source));
    }
    Ok(())
}
