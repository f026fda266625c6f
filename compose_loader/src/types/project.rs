//! Per-document configs and the final merged project.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::resources::{ConfigObjConfig, NetworkConfig, SecretConfig, VolumeConfig};
use super::service::ServiceConfig;
use super::{Environment, Extensions};
use crate::{ComposeError, ComposeResult};

/// Typed content of one input document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document the config was decoded from.
    #[serde(skip)]
    pub filename: String,
    /// Project name declared in the document, if any.
    pub name: String,
    /// Services keyed by name.
    pub services: BTreeMap<String, ServiceConfig>,
    /// Networks keyed by name.
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Volumes keyed by name.
    pub volumes: BTreeMap<String, VolumeConfig>,
    /// Secrets keyed by name.
    pub secrets: BTreeMap<String, SecretConfig>,
    /// Configs keyed by name.
    pub configs: BTreeMap<String, ConfigObjConfig>,
    /// Top-level `x-` entries.
    pub extensions: Extensions,
}

/// The merged, normalized and validated model of a compose application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Normalized project name.
    pub name: String,
    /// Directory relative paths are resolved against.
    pub working_dir: Utf8PathBuf,
    /// Source documents in load order.
    pub compose_files: Vec<Utf8PathBuf>,
    /// Enabled services keyed by name.
    pub services: BTreeMap<String, ServiceConfig>,
    /// Networks keyed by name.
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Volumes keyed by name.
    pub volumes: BTreeMap<String, VolumeConfig>,
    /// Secrets keyed by name.
    pub secrets: BTreeMap<String, SecretConfig>,
    /// Configs keyed by name.
    pub configs: BTreeMap<String, ConfigObjConfig>,
    /// Top-level `x-` entries.
    pub extensions: Extensions,
    /// Environment the project was loaded with.
    pub environment: Environment,
    /// Services excluded by [`Project::apply_profiles`].
    pub disabled_services: BTreeMap<String, ServiceConfig>,
}

impl Project {
    /// Names of the enabled services, sorted.
    #[must_use]
    pub fn service_names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    /// Names of the declared networks, sorted.
    #[must_use]
    pub fn network_names(&self) -> Vec<&str> {
        self.networks.keys().map(String::as_str).collect()
    }

    /// Names of the declared volumes, sorted.
    #[must_use]
    pub fn volume_names(&self) -> Vec<&str> {
        self.volumes.keys().map(String::as_str).collect()
    }

    /// Names of the declared secrets, sorted.
    #[must_use]
    pub fn secret_names(&self) -> Vec<&str> {
        self.secrets.keys().map(String::as_str).collect()
    }

    /// Names of the declared configs, sorted.
    #[must_use]
    pub fn config_names(&self) -> Vec<&str> {
        self.configs.keys().map(String::as_str).collect()
    }

    /// Look up an enabled service.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Reference`] if no enabled service is named
    /// `name`. The message says so when the service exists but is disabled.
    pub fn get_service(&self, name: &str) -> ComposeResult<&ServiceConfig> {
        if let Some(service) = self.services.get(name) {
            return Ok(service);
        }
        if self.disabled_services.contains_key(name) {
            return Err(ComposeError::reference(name, "is disabled by the active profiles"));
        }
        Err(ComposeError::reference(name, "is not defined"))
    }

    /// Look up several services. An empty `names` selects every enabled
    /// service.
    ///
    /// # Errors
    ///
    /// Fails on the first name [`Project::get_service`] rejects.
    pub fn get_services(&self, names: &[&str]) -> ComposeResult<Vec<&ServiceConfig>> {
        if names.is_empty() {
            return Ok(self.services.values().collect());
        }
        names.iter().map(|name| self.get_service(name)).collect()
    }

    /// Names of the services `name` depends on.
    ///
    /// # Errors
    ///
    /// Fails when `name` is not an enabled service.
    pub fn dependencies(&self, name: &str) -> ComposeResult<Vec<String>> {
        Ok(self.get_service(name)?.dependencies())
    }

    /// Move every service whose profiles are not among `profiles` into
    /// [`Project::disabled_services`]. The profile `*` enables all services.
    pub fn apply_profiles(&mut self, profiles: &[String]) {
        if profiles.iter().any(|profile| profile == "*") {
            let disabled = std::mem::take(&mut self.disabled_services);
            self.services.extend(disabled);
            return;
        }
        let (enabled, disabled): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.services)
            .into_iter()
            .chain(std::mem::take(&mut self.disabled_services))
            .partition(|(_, service)| service.has_profile(profiles));
        self.services = enabled;
        self.disabled_services = disabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn service(name: &str, profiles: &[&str]) -> ServiceConfig {
        ServiceConfig {
            name: name.to_owned(),
            image: "busybox".to_owned(),
            profiles: profiles.iter().map(|p| (*p).to_owned()).collect(),
            ..ServiceConfig::default()
        }
    }

    #[fixture]
    fn project() -> Project {
        let services = [
            service("web", &[]),
            service("debug", &["debug"]),
            service("worker", &["jobs", "debug"]),
        ];
        Project {
            name: "demo".to_owned(),
            services: services.into_iter().map(|s| (s.name.clone(), s)).collect(),
            ..Project::default()
        }
    }

    #[rstest]
    #[case(&[], &["web"])]
    #[case(&["jobs"], &["web", "worker"])]
    #[case(&["debug"], &["debug", "web", "worker"])]
    #[case(&["*"], &["debug", "web", "worker"])]
    fn profiles_select_services(mut project: Project, #[case] profiles: &[&str], #[case] expected: &[&str]) {
        let profiles: Vec<String> = profiles.iter().map(|p| (*p).to_owned()).collect();
        project.apply_profiles(&profiles);
        assert_eq!(project.service_names(), expected);
    }

    #[rstest]
    fn reapplying_profiles_restores_disabled_services(mut project: Project) {
        project.apply_profiles(&[]);
        project.apply_profiles(&["debug".to_owned()]);
        assert_eq!(project.service_names(), ["debug", "web", "worker"]);
        assert!(project.disabled_services.is_empty());
    }

    #[rstest]
    fn get_service_reports_disabled_and_missing(mut project: Project) {
        project.apply_profiles(&[]);
        let disabled = project.get_service("debug").err().map(|e| e.to_string());
        assert_eq!(disabled.as_deref(), Some("service \"debug\" is disabled by the active profiles"));
        let missing = project.get_service("nope").err().map(|e| e.to_string());
        assert_eq!(missing.as_deref(), Some("service \"nope\" is not defined"));
        assert_eq!(project.get_services(&[]).map(|s| s.len()).ok(), Some(1));
    }

    #[test]
    fn dependencies_cover_every_reference_kind() {
        let mut web = service("web", &[]);
        web.depends_on.insert("db".to_owned(), Default::default());
        web.links = vec!["cache:redis".to_owned(), "db".to_owned()];
        web.network_mode = "service:proxy".to_owned();
        web.volumes_from = vec!["data:ro".to_owned(), "container:abc".to_owned()];
        assert_eq!(web.dependencies(), ["cache", "data", "db", "proxy"]);
    }
}
