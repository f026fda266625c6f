//! Combining configs from several documents, and a base service with the
//! service that extends it.
//!
//! Every merged type implements the crate's `Merge` trait, with `other` taking precedence.
//! The generic rules are:
//!
//! - strings and numbers: a non-empty, non-zero value wins;
//! - booleans: `true` wins;
//! - lists: appended;
//! - maps: merged key-wise, each value with its own rule;
//! - optional values: merged when both are set, otherwise whichever is set.
//!
//! Structs spell out one rule per field by destructuring, so a new field
//! without a rule is a compile error.

mod service;

pub use service::merge_service;

use std::collections::BTreeMap;
use std::num::FpCategory;

use serde_json::Value;
use tracing::debug;

use crate::types::{Config, Duration, NamedResource, UnitBytes};
use crate::{ComposeError, ComposeResult};

/// Fold another value of the same type into `self`.
pub(crate) trait Merge {
    /// Merge `other` over `self`.
    fn merge(&mut self, other: Self);
}

impl Merge for String {
    fn merge(&mut self, other: Self) {
        if !other.is_empty() {
            *self = other;
        }
    }
}

impl Merge for bool {
    fn merge(&mut self, other: Self) {
        if other {
            *self = true;
        }
    }
}

impl Merge for f32 {
    fn merge(&mut self, other: Self) {
        if other.classify() != FpCategory::Zero {
            *self = other;
        }
    }
}

macro_rules! merge_non_zero {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Merge for $ty {
                fn merge(&mut self, other: Self) {
                    if other != <$ty>::default() {
                        *self = other;
                    }
                }
            }
        )+
    };
}

merge_non_zero!(i64, u64, u32, u16, Duration, UnitBytes);

/// Objects merge recursively; any other value replaces.
impl Merge for Value {
    fn merge(&mut self, other: Self) {
        match (self, other) {
            (Self::Object(current), Self::Object(layer)) => {
                for (key, value) in layer {
                    match current.get_mut(&key) {
                        Some(existing) => existing.merge(value),
                        None => {
                            current.insert(key, value);
                        }
                    }
                }
            }
            (current, layer) => *current = layer,
        }
    }
}

impl<T> Merge for Vec<T> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<T: Merge> Merge for Option<T> {
    fn merge(&mut self, other: Self) {
        let Some(value) = other else {
            return;
        };
        match self {
            Some(current) => current.merge(value),
            None => *self = Some(value),
        }
    }
}

impl<K: Ord, V: Merge> Merge for BTreeMap<K, V> {
    fn merge(&mut self, other: Self) {
        for (key, value) in other {
            match self.get_mut(&key) {
                Some(current) => current.merge(value),
                None => {
                    self.insert(key, value);
                }
            }
        }
    }
}

/// Merge `configs` in order: the first is the base and every later config
/// overrides it.
///
/// Services with the same name are combined with [`merge_service`]. Networks,
/// volumes, secrets and configs are replaced key-wise.
///
/// # Errors
///
/// Returns [`ComposeError::Conflict`], wrapped with the section and the
/// overriding document's filename, when the merged section ends up with two
/// entries sharing one explicit name.
///
/// # Examples
///
/// ```
/// use compose_loader::merge::merge;
/// use compose_loader::types::{Config, ServiceConfig};
///
/// let service = |image: &str| ServiceConfig { image: image.to_owned(), ..Default::default() };
/// let base = Config { services: [("web".to_owned(), service("nginx:1"))].into(), ..Default::default() };
/// let layer = Config { services: [("web".to_owned(), service("nginx:2"))].into(), ..Default::default() };
/// let merged = merge(vec![base, layer]).unwrap();
/// assert_eq!(merged.services["web"].image, "nginx:2");
/// ```
pub fn merge(configs: Vec<Config>) -> ComposeResult<Config> {
    let mut layers = configs.into_iter();
    let Some(mut base) = layers.next() else {
        return Ok(Config::default());
    };
    for layer in layers {
        debug!(base = %base.filename, layer = %layer.filename, "merging compose document");
        let Config {
            filename,
            name,
            services,
            networks,
            volumes,
            secrets,
            configs: config_objects,
            extensions,
        } = layer;
        base.name.merge(name);
        base.services.merge(services);
        merge_resources(("network", "networks"), &filename, &mut base.networks, networks)?;
        merge_resources(("volume", "volumes"), &filename, &mut base.volumes, volumes)?;
        merge_resources(("secret", "secrets"), &filename, &mut base.secrets, secrets)?;
        merge_resources(("config", "configs"), &filename, &mut base.configs, config_objects)?;
        base.extensions.merge(extensions);
    }
    Ok(base)
}

fn merge_resources<T: NamedResource>(
    (kind, section): (&str, &str),
    filename: &str,
    base: &mut BTreeMap<String, T>,
    layer: BTreeMap<String, T>,
) -> ComposeResult<()> {
    base.extend(layer);
    check_unique_names(kind, base)
        .map_err(|err| ComposeError::context(format!("cannot merge {section} from {filename}"), err))
}

/// Two entries that are created by the project must not share one name.
fn check_unique_names<T: NamedResource>(kind: &str, resources: &BTreeMap<String, T>) -> ComposeResult<()> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for (key, resource) in resources {
        if resource.external().external || resource.name().is_empty() {
            continue;
        }
        if let Some(first) = seen.insert(resource.name(), key) {
            return Err(ComposeError::conflict(
                format!("{kind} {key}"),
                format!("name {:?} is already used by {kind} {first}", resource.name()),
            ));
        }
    }
    Ok(())
}
