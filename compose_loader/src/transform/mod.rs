//! Shorthand expansion ahead of typed decoding.
//!
//! Many compose fields accept several spellings: `ports: ["80:80"]` and
//! `ports: [{target: 80, published: "80"}]` describe the same thing. Each
//! such field position is registered in a [`TransformTable`] with the
//! [`FieldKind`] that knows its spellings. [`transform`] rewrites the tree
//! so every registered position holds its canonical shape, which the typed
//! model then decodes without further special cases.

mod ports;
mod rules;
mod volume;

pub use ports::parse_port_spec;
pub use volume::parse_volume;

use std::fmt;

use serde_json::{Map, Value};

use crate::path::{FieldPath, PathTable};
use crate::{ComposeError, ComposeResult};

/// Field shapes with more than one accepted spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldKind {
    /// `external: true` or the legacy `external: {name: x}`.
    External,
    /// Port list mixing numbers, `host:container/proto` strings and mappings.
    Ports,
    /// Secret or config attachments given as names or mappings.
    FileReferences,
    /// `build: ./dir` or a build mapping.
    Build,
    /// `depends_on` as a list of names or a mapping of conditions.
    DependsOn,
    /// Service volume list in short or long syntax.
    Volumes,
    /// Mapping given either as a mapping or as `KEY<sep>VALUE` strings.
    MappingOrList {
        /// Whether a bare `KEY` maps to null rather than to `""`.
        allow_nil: bool,
        /// Separator between key and value in list form.
        separator: char,
    },
    /// A single ulimit: a number or a `{soft, hard}` mapping.
    Ulimit,
    /// Health check command as a shell string or an exec list.
    HealthcheckTest,
    /// Build SSH entries as a string, `id=path` strings or a mapping.
    Ssh,
    /// A list that also accepts a single string.
    StringList,
    /// A list whose items may be numbers, stored as strings.
    StringOrNumberList,
    /// A command line as a string (split into words) or a list.
    ShellCommand,
    /// Service network attachments as a list of names or a mapping.
    ServiceNetworks,
    /// `extends: base` or `extends: {service, file}`.
    Extends,
    /// Device request count: a number or `all`.
    DeviceCount,
    /// Byte size as a number of bytes or a unit-suffixed string.
    UnitBytes,
    /// Duration as nanoseconds or a unit-suffixed string.
    Duration,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::External => "external",
            Self::Ports => "ports",
            Self::FileReferences => "file reference",
            Self::Build => "build",
            Self::DependsOn => "depends_on",
            Self::Volumes => "service volume",
            Self::MappingOrList { .. } => "mapping or list",
            Self::Ulimit => "ulimits",
            Self::HealthcheckTest => "healthcheck test",
            Self::Ssh => "ssh",
            Self::StringList => "string list",
            Self::StringOrNumberList => "string or number list",
            Self::ShellCommand => "command",
            Self::ServiceNetworks => "service networks",
            Self::Extends => "extends",
            Self::DeviceCount => "device count",
            Self::UnitBytes => "byte size",
            Self::Duration => "duration",
        })
    }
}

/// Field-path patterns mapped to the shorthand rules applied there.
pub type TransformTable = PathTable<FieldKind>;

const ENVIRONMENT: FieldKind = FieldKind::MappingOrList {
    allow_nil: true,
    separator: '=',
};
const LABELS: FieldKind = FieldKind::MappingOrList {
    allow_nil: false,
    separator: '=',
};
const HOSTS: FieldKind = FieldKind::MappingOrList {
    allow_nil: false,
    separator: ':',
};

/// Rules for every shorthand of the compose file format.
#[must_use]
pub fn default_transforms() -> TransformTable {
    let service = [
        ("build", FieldKind::Build),
        ("build.args", ENVIRONMENT),
        ("build.labels", LABELS),
        ("build.ssh", FieldKind::Ssh),
        ("build.extra_hosts", HOSTS),
        ("build.cache_from", FieldKind::StringList),
        ("build.cache_to", FieldKind::StringList),
        ("command", FieldKind::ShellCommand),
        ("entrypoint", FieldKind::ShellCommand),
        ("configs", FieldKind::FileReferences),
        ("secrets", FieldKind::FileReferences),
        ("depends_on", FieldKind::DependsOn),
        ("deploy.labels", LABELS),
        ("deploy.update_config.delay", FieldKind::Duration),
        ("deploy.update_config.monitor", FieldKind::Duration),
        ("deploy.rollback_config.delay", FieldKind::Duration),
        ("deploy.rollback_config.monitor", FieldKind::Duration),
        ("deploy.restart_policy.delay", FieldKind::Duration),
        ("deploy.restart_policy.window", FieldKind::Duration),
        ("deploy.resources.*.memory", FieldKind::UnitBytes),
        ("deploy.resources.*.devices.[].count", FieldKind::DeviceCount),
        ("dns", FieldKind::StringList),
        ("dns_search", FieldKind::StringList),
        ("env_file", FieldKind::StringList),
        ("tmpfs", FieldKind::StringList),
        ("environment", ENVIRONMENT),
        ("expose", FieldKind::StringOrNumberList),
        ("extends", FieldKind::Extends),
        ("extra_hosts", HOSTS),
        ("healthcheck.test", FieldKind::HealthcheckTest),
        ("healthcheck.interval", FieldKind::Duration),
        ("healthcheck.timeout", FieldKind::Duration),
        ("healthcheck.start_period", FieldKind::Duration),
        ("stop_grace_period", FieldKind::Duration),
        ("labels", LABELS),
        ("logging.options", LABELS),
        ("log_opt", LABELS),
        ("sysctls", LABELS),
        ("mem_limit", FieldKind::UnitBytes),
        ("mem_reservation", FieldKind::UnitBytes),
        ("memswap_limit", FieldKind::UnitBytes),
        ("mem_swappiness", FieldKind::UnitBytes),
        ("shm_size", FieldKind::UnitBytes),
        ("networks", FieldKind::ServiceNetworks),
        ("ports", FieldKind::Ports),
        ("ulimits.*", FieldKind::Ulimit),
        ("volumes", FieldKind::Volumes),
        ("volumes.[].tmpfs.size", FieldKind::UnitBytes),
    ]
    .map(|(suffix, kind)| (format!("services.*.{suffix}"), kind));
    let resources = ["networks", "volumes", "secrets", "configs"].into_iter().flat_map(|section| {
        [
            (format!("{section}.*.external"), FieldKind::External),
            (format!("{section}.*.labels"), LABELS),
            (format!("{section}.*.driver_opts"), LABELS),
        ]
    });
    PathTable::new(service.into_iter().chain(resources))
}

/// Rewrite every registered position of `value` into its canonical shape.
///
/// Rules run top-down: a position is rewritten first, then its children
/// are visited, so nested rules see the canonical parent shape.
///
/// # Errors
///
/// Returns [`ComposeError::Decode`] naming the field path when a value has
/// a shape its rule does not accept.
///
/// # Examples
///
/// ```
/// use compose_loader::path::FieldPath;
/// use compose_loader::transform::{default_transforms, transform};
/// use serde_json::json;
///
/// let doc = json!({"services": {"web": {"build": ".", "depends_on": ["db"]}}});
/// let out = transform(doc, &FieldPath::root(), &default_transforms()).ok();
/// assert_eq!(
///     out,
///     Some(json!({"services": {"web": {
///         "build": {"context": "."},
///         "depends_on": {"db": {"condition": "service_started"}}
///     }}}))
/// );
/// ```
pub fn transform(value: Value, path: &FieldPath, table: &TransformTable) -> ComposeResult<Value> {
    let canonical = match table.lookup(path) {
        Some(kind) => rules::apply(*kind, value, path)?,
        None => value,
    };
    match canonical {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| transform(item, &path.index(index), table))
            .collect::<ComposeResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, item)| {
                let canonical_item = transform(item, &path.key(&key), table)?;
                Ok((key, canonical_item))
            })
            .collect::<ComposeResult<Map<_, _>>>()
            .map(Value::Object),
        scalar => Ok(scalar),
    }
}

/// Name of the shape of `value`, for diagnostics.
pub(crate) const fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn invalid(kind: FieldKind, value: &Value, path: &FieldPath) -> std::sync::Arc<ComposeError> {
    ComposeError::decode(path.to_string(), format!("invalid type {} for {kind}", shape(value)))
}

#[cfg(test)]
mod tests;
