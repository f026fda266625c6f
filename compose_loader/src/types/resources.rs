//! Top-level resources that services attach to: networks, volumes, secrets
//! and configs.
#![expect(missing_docs, reason = "fields are named after the compose file keys they decode from")]

use serde::{Deserialize, Serialize};

use super::{Extensions, Labels, Mapping};

/// Marks a resource as created outside the project.
///
/// The shorthand `external: true` decodes to `{external: true}`. The legacy
/// `external: {name: foo}` form keeps the name here until normalization
/// moves it to the resource itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct External {
    pub external: bool,
    pub name: String,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    pub driver: String,
    pub driver_opts: Mapping,
    pub ipam: IpamConfig,
    pub external: External,
    pub internal: bool,
    pub attachable: bool,
    pub labels: Labels,
    pub enable_ipv6: bool,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpamConfig {
    pub driver: String,
    pub config: Vec<IpamPool>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpamPool {
    pub subnet: String,
    pub gateway: String,
    pub ip_range: String,
    pub aux_addresses: Mapping,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub name: String,
    pub driver: String,
    pub driver_opts: Mapping,
    pub external: External,
    pub labels: Labels,
    pub extensions: Extensions,
}

/// Definition of a secret or config: file-backed, environment-backed,
/// inline or external.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileObjectConfig {
    pub name: String,
    pub file: String,
    pub environment: String,
    pub content: String,
    pub external: External,
    pub labels: Labels,
    pub driver: String,
    pub driver_opts: Mapping,
    pub template_driver: String,
    pub extensions: Extensions,
}

/// A top-level secret definition.
pub type SecretConfig = FileObjectConfig;
/// A top-level config definition.
pub type ConfigObjConfig = FileObjectConfig;

/// Name and external marker shared by every top-level resource kind.
///
/// Lets normalization and the per-section checks treat the four resource
/// maps uniformly.
pub trait NamedResource {
    /// Name of the resource as created on the engine.
    fn name(&self) -> &str;
    /// Mutable access to the name.
    fn name_mut(&mut self) -> &mut String;
    /// External marker.
    fn external(&self) -> &External;
    /// Mutable access to the external marker.
    fn external_mut(&mut self) -> &mut External;
}

macro_rules! named_resource {
    ($($ty:ty),+) => {
        $(
            impl NamedResource for $ty {
                fn name(&self) -> &str {
                    &self.name
                }

                fn external(&self) -> &External {
                    &self.external
                }

                fn name_mut(&mut self) -> &mut String {
                    &mut self.name
                }

                fn external_mut(&mut self) -> &mut External {
                    &mut self.external
                }
            }
        )+
    };
}

named_resource!(NetworkConfig, VolumeConfig, FileObjectConfig);
