//! Typed model produced by the loader.
//!
//! Every struct carries an `extensions` map holding the `x-` keys found at
//! its level of the document.

use std::collections::BTreeMap;

use serde_json::Value;

mod project;
mod resources;
mod service;
mod units;

pub use project::{Config, Project};
pub use resources::{
    ConfigObjConfig, External, FileObjectConfig, IpamConfig, IpamPool, NamedResource, NetworkConfig,
    SecretConfig, VolumeConfig,
};
pub use service::*;
pub use units::{Duration, UnitBytes};

/// String-to-string mapping such as `sysctls` or `driver_opts`.
pub type Mapping = BTreeMap<String, String>;
/// Container or resource labels.
pub type Labels = BTreeMap<String, String>;
/// Mapping whose values may be unset, such as `environment: [DEBUG]`.
pub type MappingWithEquals = BTreeMap<String, Option<String>>;
/// `x-` entries grouped at one level of the document.
pub type Extensions = BTreeMap<String, Value>;
/// Resolved process environment.
pub type Environment = BTreeMap<String, String>;
