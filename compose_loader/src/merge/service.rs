//! Per-field merge rules for services and their nested settings.

use std::collections::BTreeMap;

use super::Merge;
use crate::types::{
    BlkioConfig, BuildConfig, CredentialSpecConfig, DeployConfig, ExtendsConfig, HealthCheckConfig,
    LoggingConfig, Placement, Resource, Resources, RestartPolicy, ServiceConfig, ServiceDependency,
    ServiceNetworkConfig, UlimitsConfig, UpdateConfig,
};

/// Merge `layer` over `base` and return the combined service.
///
/// Besides the generic rules, `command` and `entrypoint` are replaced
/// whole when `layer` sets them, `environment` is overridden key-wise
/// (an unset `KEY` in `layer` replaces a value in `base`), and the
/// `ports`, `volumes`, `secrets` and `configs` lists are matched by key
/// and sorted.
///
/// # Examples
///
/// ```
/// use compose_loader::merge::merge_service;
/// use compose_loader::types::ServiceConfig;
///
/// let base = ServiceConfig {
///     image: "app".to_owned(),
///     command: Some(vec!["serve".to_owned(), "--debug".to_owned()]),
///     ..Default::default()
/// };
/// let layer = ServiceConfig { command: Some(vec!["migrate".to_owned()]), ..Default::default() };
/// let merged = merge_service(base, layer);
/// assert_eq!(merged.image, "app");
/// assert_eq!(merged.command, Some(vec!["migrate".to_owned()]));
/// ```
#[must_use]
pub fn merge_service(mut base: ServiceConfig, layer: ServiceConfig) -> ServiceConfig {
    base.merge(layer);
    base
}

/// Merge `layer` into `base` by key, then return the entries sorted by key.
fn merge_keyed<T, K, F>(base: &mut Vec<T>, layer: Vec<T>, key: F)
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut entries: BTreeMap<K, T> = std::mem::take(base)
        .into_iter()
        .map(|entry| (key(&entry), entry))
        .collect();
    for entry in layer {
        entries.insert(key(&entry), entry);
    }
    *base = entries.into_values().collect();
}

impl Merge for ServiceConfig {
    #[expect(clippy::too_many_lines, reason = "one statement per service field")]
    fn merge(&mut self, other: Self) {
        let Self {
            name,
            profiles,
            build,
            blkio_config,
            cap_add,
            cap_drop,
            cgroup_parent,
            cpu_count,
            cpu_percent,
            cpu_period,
            cpu_quota,
            cpu_rt_period,
            cpu_rt_runtime,
            cpus,
            cpuset,
            cpu_shares,
            command,
            configs,
            container_name,
            credential_spec,
            depends_on,
            deploy,
            device_cgroup_rules,
            devices,
            dns,
            dns_opt,
            dns_search,
            dockerfile,
            domainname,
            entrypoint,
            environment,
            env_file,
            expose,
            extends,
            external_links,
            extra_hosts,
            group_add,
            hostname,
            healthcheck,
            image,
            init,
            ipc,
            isolation,
            labels,
            links,
            logging,
            log_driver,
            log_opt,
            mem_limit,
            mem_reservation,
            memswap_limit,
            mem_swappiness,
            mac_address,
            net,
            network_mode,
            networks,
            oom_kill_disable,
            oom_score_adj,
            pid,
            pids_limit,
            platform,
            ports,
            privileged,
            pull_policy,
            read_only,
            restart,
            runtime,
            scale,
            secrets,
            security_opt,
            shm_size,
            stdin_open,
            stop_grace_period,
            stop_signal,
            sysctls,
            tmpfs,
            tty,
            ulimits,
            user,
            userns_mode,
            uts,
            volume_driver,
            volumes,
            volumes_from,
            working_dir,
            extensions,
        } = other;

        self.name.merge(name);
        self.profiles.merge(profiles);
        self.build.merge(build);
        self.blkio_config.merge(blkio_config);
        self.cap_add.merge(cap_add);
        self.cap_drop.merge(cap_drop);
        self.cgroup_parent.merge(cgroup_parent);
        self.cpu_count.merge(cpu_count);
        self.cpu_percent.merge(cpu_percent);
        self.cpu_period.merge(cpu_period);
        self.cpu_quota.merge(cpu_quota);
        self.cpu_rt_period.merge(cpu_rt_period);
        self.cpu_rt_runtime.merge(cpu_rt_runtime);
        self.cpus.merge(cpus);
        self.cpuset.merge(cpuset);
        self.cpu_shares.merge(cpu_shares);
        if command.is_some() {
            self.command = command;
        }
        merge_keyed(&mut self.configs, configs, |config| config.source.clone());
        self.container_name.merge(container_name);
        self.credential_spec.merge(credential_spec);
        self.depends_on.merge(depends_on);
        self.deploy.merge(deploy);
        self.device_cgroup_rules.merge(device_cgroup_rules);
        self.devices.merge(devices);
        self.dns.merge(dns);
        self.dns_opt.merge(dns_opt);
        self.dns_search.merge(dns_search);
        self.dockerfile.merge(dockerfile);
        self.domainname.merge(domainname);
        if entrypoint.is_some() {
            self.entrypoint = entrypoint;
        }
        self.environment.extend(environment);
        self.env_file.merge(env_file);
        self.expose.merge(expose);
        self.extends.merge(extends);
        self.external_links.merge(external_links);
        self.extra_hosts.merge(extra_hosts);
        self.group_add.merge(group_add);
        self.hostname.merge(hostname);
        self.healthcheck.merge(healthcheck);
        self.image.merge(image);
        self.init.merge(init);
        self.ipc.merge(ipc);
        self.isolation.merge(isolation);
        self.labels.merge(labels);
        self.links.merge(links);
        self.logging.merge(logging);
        self.log_driver.merge(log_driver);
        self.log_opt.merge(log_opt);
        self.mem_limit.merge(mem_limit);
        self.mem_reservation.merge(mem_reservation);
        self.memswap_limit.merge(memswap_limit);
        self.mem_swappiness.merge(mem_swappiness);
        self.mac_address.merge(mac_address);
        self.net.merge(net);
        self.network_mode.merge(network_mode);
        self.networks.merge(networks);
        self.oom_kill_disable.merge(oom_kill_disable);
        self.oom_score_adj.merge(oom_score_adj);
        self.pid.merge(pid);
        self.pids_limit.merge(pids_limit);
        self.platform.merge(platform);
        merge_keyed(&mut self.ports, ports, |port| {
            (port.target, port.published.clone(), port.host_ip.clone(), port.protocol.clone())
        });
        self.privileged.merge(privileged);
        self.pull_policy.merge(pull_policy);
        self.read_only.merge(read_only);
        self.restart.merge(restart);
        self.runtime.merge(runtime);
        self.scale.merge(scale);
        merge_keyed(&mut self.secrets, secrets, |secret| secret.source.clone());
        self.security_opt.merge(security_opt);
        self.shm_size.merge(shm_size);
        self.stdin_open.merge(stdin_open);
        self.stop_grace_period.merge(stop_grace_period);
        self.stop_signal.merge(stop_signal);
        self.sysctls.merge(sysctls);
        self.tmpfs.merge(tmpfs);
        self.tty.merge(tty);
        self.ulimits.merge(ulimits);
        self.user.merge(user);
        self.userns_mode.merge(userns_mode);
        self.uts.merge(uts);
        self.volume_driver.merge(volume_driver);
        merge_keyed(&mut self.volumes, volumes, |volume| volume.target.clone());
        self.volumes_from.merge(volumes_from);
        self.working_dir.merge(working_dir);
        self.extensions.merge(extensions);
    }
}

/// Drivers that differ replace the whole logging block; otherwise options
/// are merged key-wise.
impl Merge for LoggingConfig {
    fn merge(&mut self, other: Self) {
        if self.driver == other.driver || self.driver.is_empty() || other.driver.is_empty() {
            let Self {
                driver,
                options,
                extensions,
            } = other;
            self.driver.merge(driver);
            self.options.merge(options);
            self.extensions.merge(extensions);
        } else {
            *self = other;
        }
    }
}

impl Merge for UlimitsConfig {
    fn merge(&mut self, other: Self) {
        if !other.is_zero() {
            *self = other;
        }
    }
}

/// Aliases are replaced as a whole. Addresses only change when set.
impl Merge for ServiceNetworkConfig {
    fn merge(&mut self, other: Self) {
        let Self {
            priority,
            aliases,
            ipv4_address,
            ipv6_address,
            extensions,
        } = other;
        self.priority.merge(priority);
        self.aliases = aliases;
        self.ipv4_address.merge(ipv4_address);
        self.ipv6_address.merge(ipv6_address);
        self.extensions.merge(extensions);
    }
}

/// The test command is replaced as a whole when set.
impl Merge for HealthCheckConfig {
    fn merge(&mut self, other: Self) {
        let Self {
            test,
            timeout,
            interval,
            retries,
            start_period,
            disable,
            extensions,
        } = other;
        if !test.is_empty() {
            self.test = test;
        }
        self.timeout.merge(timeout);
        self.interval.merge(interval);
        self.retries.merge(retries);
        self.start_period.merge(start_period);
        self.disable.merge(disable);
        self.extensions.merge(extensions);
    }
}

/// Implements `Merge` by applying the generic rule of each listed field.
/// The field list must name every field of the struct.
macro_rules! merge_fields {
    ($($ty:ident { $($field:ident),+ $(,)? })+) => {
        $(
            impl Merge for $ty {
                fn merge(&mut self, other: Self) {
                    let $ty { $($field),+ } = other;
                    $( self.$field.merge($field); )+
                }
            }
        )+
    };
}

merge_fields! {
    BuildConfig {
        context, dockerfile, args, ssh, labels, cache_from, cache_to, no_cache, pull,
        extra_hosts, isolation, network, target, extensions,
    }
    BlkioConfig {
        weight, weight_device, device_read_bps, device_read_iops, device_write_bps,
        device_write_iops, extensions,
    }
    CredentialSpecConfig { config, file, registry, extensions }
    ServiceDependency { condition, extensions }
    ExtendsConfig { service, file }
    DeployConfig {
        mode, replicas, labels, update_config, rollback_config, resources, restart_policy,
        placement, endpoint_mode, extensions,
    }
    UpdateConfig {
        parallelism, delay, failure_action, monitor, max_failure_ratio, order, extensions,
    }
    Resources { limits, reservations, extensions }
    Resource { cpus, memory, pids, devices, generic_resources, extensions }
    RestartPolicy { condition, delay, max_attempts, window, extensions }
    Placement { constraints, preferences, max_replicas_per_node, extensions }
}
