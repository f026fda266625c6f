//! Typed service definitions.
//!
//! Field names follow the keys of the compose file format.
#![expect(missing_docs, reason = "fields are named after the compose file keys they decode from")]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::units::{Duration, UnitBytes};
use super::{Extensions, Labels, Mapping, MappingWithEquals};

/// Default pull policy spelling that normalization rewrites.
pub const PULL_POLICY_IF_NOT_PRESENT: &str = "if_not_present";
/// Canonical spelling of the "pull when missing" policy.
pub const PULL_POLICY_MISSING: &str = "missing";

/// Prefix of `network_mode`, `ipc` and `pid` values that point at a service.
pub const SERVICE_PREFIX: &str = "service:";
/// Prefix of values that point at an existing container.
pub const CONTAINER_PREFIX: &str = "container:";

/// Condition a dependent service waits for when none is given.
pub const SERVICE_CONDITION_STARTED: &str = "service_started";

/// Marker placed before a shell command in a health check test.
pub const HEALTHCHECK_SHELL: &str = "CMD-SHELL";

/// Bind mount volume type.
pub const VOLUME_TYPE_BIND: &str = "bind";
/// Named or anonymous volume type.
pub const VOLUME_TYPE_VOLUME: &str = "volume";
/// In-memory volume type.
pub const VOLUME_TYPE_TMPFS: &str = "tmpfs";

/// Full definition of one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name, taken from its key in the `services` mapping.
    #[serde(skip)]
    pub name: String,
    pub profiles: Vec<String>,
    pub build: Option<BuildConfig>,
    pub blkio_config: Option<BlkioConfig>,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub cgroup_parent: String,
    pub cpu_count: i64,
    pub cpu_percent: f32,
    pub cpu_period: i64,
    pub cpu_quota: i64,
    pub cpu_rt_period: i64,
    pub cpu_rt_runtime: i64,
    pub cpus: f32,
    pub cpuset: String,
    pub cpu_shares: i64,
    /// `None` when unset, which differs from an explicitly empty command.
    pub command: Option<Vec<String>>,
    pub configs: Vec<FileReferenceConfig>,
    pub container_name: String,
    pub credential_spec: Option<CredentialSpecConfig>,
    pub depends_on: BTreeMap<String, ServiceDependency>,
    pub deploy: Option<DeployConfig>,
    pub device_cgroup_rules: Vec<String>,
    pub devices: Vec<String>,
    pub dns: Vec<String>,
    pub dns_opt: Vec<String>,
    pub dns_search: Vec<String>,
    /// Deprecated location of `build.dockerfile`.
    pub dockerfile: String,
    pub domainname: String,
    pub entrypoint: Option<Vec<String>>,
    pub environment: MappingWithEquals,
    pub env_file: Vec<String>,
    pub expose: Vec<String>,
    pub extends: Option<ExtendsConfig>,
    pub external_links: Vec<String>,
    /// Host name to address entries added to `/etc/hosts`.
    pub extra_hosts: Mapping,
    pub group_add: Vec<String>,
    pub hostname: String,
    pub healthcheck: Option<HealthCheckConfig>,
    pub image: String,
    pub init: Option<bool>,
    pub ipc: String,
    pub isolation: String,
    pub labels: Labels,
    pub links: Vec<String>,
    pub logging: Option<LoggingConfig>,
    /// Deprecated location of `logging.driver`.
    pub log_driver: String,
    /// Deprecated location of `logging.options`.
    pub log_opt: Mapping,
    pub mem_limit: UnitBytes,
    pub mem_reservation: UnitBytes,
    pub memswap_limit: UnitBytes,
    pub mem_swappiness: UnitBytes,
    pub mac_address: String,
    pub net: String,
    pub network_mode: String,
    /// Attached networks. A `None` value attaches with default settings.
    pub networks: BTreeMap<String, Option<ServiceNetworkConfig>>,
    pub oom_kill_disable: bool,
    pub oom_score_adj: i64,
    pub pid: String,
    pub pids_limit: i64,
    pub platform: String,
    pub ports: Vec<ServicePortConfig>,
    pub privileged: bool,
    pub pull_policy: String,
    pub read_only: bool,
    pub restart: String,
    pub runtime: String,
    /// Deprecated location of `deploy.replicas`.
    pub scale: Option<u64>,
    pub secrets: Vec<FileReferenceConfig>,
    pub security_opt: Vec<String>,
    pub shm_size: UnitBytes,
    pub stdin_open: bool,
    pub stop_grace_period: Option<Duration>,
    pub stop_signal: String,
    pub sysctls: Mapping,
    pub tmpfs: Vec<String>,
    pub tty: bool,
    pub ulimits: BTreeMap<String, UlimitsConfig>,
    pub user: String,
    pub userns_mode: String,
    pub uts: String,
    pub volume_driver: String,
    pub volumes: Vec<ServiceVolumeConfig>,
    pub volumes_from: Vec<String>,
    pub working_dir: String,
    pub extensions: Extensions,
}

impl ServiceConfig {
    /// Names of the services this service depends on, sorted and
    /// deduplicated.
    ///
    /// Covers `depends_on`, `links`, `service:` references in
    /// `network_mode`, `ipc` and `pid`, and `volumes_from` entries that do
    /// not name a container.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        let mut names: Vec<String> = self.depends_on.keys().cloned().collect();
        names.extend(
            self.links
                .iter()
                .map(|link| link.split_once(':').map_or(link.as_str(), |(name, _)| name).to_owned()),
        );
        names.extend(
            [&self.network_mode, &self.ipc, &self.pid]
                .into_iter()
                .filter_map(|mode| mode.strip_prefix(SERVICE_PREFIX))
                .map(str::to_owned),
        );
        names.extend(
            self.volumes_from
                .iter()
                .filter(|source| !source.starts_with(CONTAINER_PREFIX))
                .map(|source| source.split_once(':').map_or(source.as_str(), |(name, _)| name).to_owned()),
        );
        names.sort();
        names.dedup();
        names
    }

    /// `true` when the service is enabled for `profiles`. Services without
    /// profiles are always enabled.
    #[must_use]
    pub fn has_profile(&self, profiles: &[String]) -> bool {
        self.profiles.is_empty()
            || self
                .profiles
                .iter()
                .any(|profile| profiles.iter().any(|enabled| enabled == profile))
    }
}

/// Image build settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub context: String,
    pub dockerfile: String,
    pub args: MappingWithEquals,
    pub ssh: Vec<SshKey>,
    pub labels: Labels,
    pub cache_from: Vec<String>,
    pub cache_to: Vec<String>,
    pub no_cache: bool,
    pub pull: bool,
    pub extra_hosts: Mapping,
    pub isolation: String,
    pub network: String,
    pub target: String,
    pub extensions: Extensions,
}

/// One SSH agent socket or key made available to a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct SshKey {
    pub id: String,
    pub path: String,
}

/// Block IO weights and throttles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlkioConfig {
    pub weight: u16,
    pub weight_device: Vec<WeightDevice>,
    pub device_read_bps: Vec<ThrottleDevice>,
    pub device_read_iops: Vec<ThrottleDevice>,
    pub device_write_bps: Vec<ThrottleDevice>,
    pub device_write_iops: Vec<ThrottleDevice>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightDevice {
    pub path: String,
    pub weight: u16,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleDevice {
    pub path: String,
    pub rate: u64,
    pub extensions: Extensions,
}

/// Windows credential spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSpecConfig {
    pub config: String,
    pub file: String,
    pub registry: String,
    pub extensions: Extensions,
}

/// Startup ordering constraint on another service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDependency {
    pub condition: String,
    pub extensions: Extensions,
}

/// Link to the service this one inherits from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendsConfig {
    pub service: String,
    /// Document holding the base service. `None` means the same document.
    pub file: Option<String>,
}

/// Orchestrator deployment settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub mode: String,
    pub replicas: Option<u64>,
    pub labels: Labels,
    pub update_config: Option<UpdateConfig>,
    pub rollback_config: Option<UpdateConfig>,
    pub resources: Resources,
    pub restart_policy: Option<RestartPolicy>,
    pub placement: Placement,
    pub endpoint_mode: String,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    pub parallelism: Option<u64>,
    pub delay: Duration,
    pub failure_action: String,
    pub monitor: Duration,
    pub max_failure_ratio: f32,
    pub order: String,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub limits: Option<Resource>,
    pub reservations: Option<Resource>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    pub cpus: String,
    pub memory: UnitBytes,
    pub pids: i64,
    pub devices: Vec<DeviceRequest>,
    pub generic_resources: Vec<GenericResource>,
    pub extensions: Extensions,
}

/// Request for host devices such as GPUs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceRequest {
    pub capabilities: Vec<String>,
    pub driver: String,
    /// Number of devices, or `-1` for all of them.
    pub count: i64,
    pub device_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericResource {
    pub discrete_resource_spec: Option<DiscreteGenericResource>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscreteGenericResource {
    pub kind: String,
    pub value: i64,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartPolicy {
    pub condition: String,
    pub delay: Option<Duration>,
    pub max_attempts: Option<u64>,
    pub window: Option<Duration>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub constraints: Vec<String>,
    pub preferences: Vec<PlacementPreferences>,
    pub max_replicas_per_node: u64,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementPreferences {
    pub spread: String,
    pub extensions: Extensions,
}

/// Health probe settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Probe command. A shell command is stored as `["CMD-SHELL", cmd]`.
    pub test: Vec<String>,
    pub timeout: Option<Duration>,
    pub interval: Option<Duration>,
    pub retries: Option<u64>,
    pub start_period: Option<Duration>,
    pub disable: bool,
    pub extensions: Extensions,
}

/// Log driver and its options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub driver: String,
    pub options: Mapping,
    pub extensions: Extensions,
}

/// Per-network attachment settings of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNetworkConfig {
    pub priority: i64,
    pub aliases: Vec<String>,
    pub ipv4_address: String,
    pub ipv6_address: String,
    pub extensions: Extensions,
}

/// One published or exposed port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicePortConfig {
    pub mode: String,
    pub host_ip: String,
    pub target: u32,
    pub published: String,
    pub protocol: String,
    pub extensions: Extensions,
}

/// One mount of a bind path, volume or tmpfs into the container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceVolumeConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub target: String,
    pub read_only: bool,
    pub consistency: String,
    pub bind: Option<ServiceVolumeBind>,
    pub volume: Option<ServiceVolumeVolume>,
    pub tmpfs: Option<ServiceVolumeTmpfs>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceVolumeBind {
    pub selinux: String,
    pub propagation: String,
    pub create_host_path: bool,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceVolumeVolume {
    pub nocopy: bool,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceVolumeTmpfs {
    pub size: UnitBytes,
    pub extensions: Extensions,
}

/// Attachment of a secret or config to a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReferenceConfig {
    pub source: String,
    pub target: String,
    pub uid: String,
    pub gid: String,
    pub mode: Option<u32>,
    pub extensions: Extensions,
}

/// Resource limit. The shorthand `nofile: 1024` sets both limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UlimitsConfig {
    pub soft: i64,
    pub hard: i64,
}

impl UlimitsConfig {
    /// `true` when neither limit is set.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.soft == 0 && self.hard == 0
    }
}
