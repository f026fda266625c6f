//! Typed decoding of the top-level sections of one document, with the
//! checks that apply to a single section in isolation.

use std::collections::BTreeMap;

use camino::Utf8Path;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::keys::EXTENSIONS_KEY;
use crate::paths::{absolutize, expand_user};
use crate::transform::shape;
use crate::types::{Config, FileObjectConfig, NetworkConfig, VolumeConfig};
use crate::{ComposeError, ComposeResult};

/// Remove the `services` section from `tree`, returning its entries
/// undecoded so each service can be resolved with its `extends` chain.
pub(super) fn take_services(tree: &mut Map<String, Value>) -> ComposeResult<Map<String, Value>> {
    match tree.remove("services") {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(services)) => Ok(services),
        Some(other) => Err(not_a_mapping("services", &other)),
    }
}

/// Decode everything except `services`.
pub(super) fn decode_sections(
    mut tree: Map<String, Value>,
    working_dir: &Utf8Path,
    resolve_paths: bool,
) -> ComposeResult<Config> {
    let name = match tree.remove("name") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(ComposeError::decode(
                "name",
                format!("invalid type {} for name, expected string", shape(&other)),
            ));
        }
    };
    let mut networks: BTreeMap<String, NetworkConfig> = decode_section(&mut tree, "networks")?;
    let mut volumes: BTreeMap<String, VolumeConfig> = decode_section(&mut tree, "volumes")?;
    let mut secrets: BTreeMap<String, FileObjectConfig> = decode_section(&mut tree, "secrets")?;
    let mut configs: BTreeMap<String, FileObjectConfig> = decode_section(&mut tree, "configs")?;
    let extensions = match tree.remove(EXTENSIONS_KEY) {
        Some(Value::Object(entries)) => entries.into_iter().collect(),
        _ => BTreeMap::new(),
    };

    for (key, network) in &mut networks {
        if network.external.external && network.external.name.is_empty() && network.name.is_empty() {
            network.name.clone_from(key);
        }
    }
    for (key, volume) in &mut volumes {
        check_external_volume(key, volume)?;
    }
    for (key, secret) in &mut secrets {
        check_file_object("secret", key, secret, working_dir, resolve_paths)?;
    }
    for (key, config) in &mut configs {
        check_file_object("config", key, config, working_dir, resolve_paths)?;
    }

    Ok(Config {
        filename: String::new(),
        name,
        services: BTreeMap::new(),
        networks,
        volumes,
        secrets,
        configs,
        extensions,
    })
}

fn decode_section<T>(tree: &mut Map<String, Value>, section: &str) -> ComposeResult<BTreeMap<String, T>>
where
    T: DeserializeOwned + Default,
{
    let entries = match tree.remove(section) {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => entries,
        Some(other) => return Err(not_a_mapping(section, &other)),
    };
    entries
        .into_iter()
        .map(|(key, value)| {
            let decoded = if value.is_null() {
                T::default()
            } else {
                serde_json::from_value(value)
                    .map_err(|err| ComposeError::decode(format!("{section}.{key}"), err.to_string()))?
            };
            Ok((key, decoded))
        })
        .collect()
}

fn not_a_mapping(section: &str, value: &Value) -> std::sync::Arc<ComposeError> {
    ComposeError::decode(
        section,
        format!("invalid type {} for {section}, expected mapping", shape(value)),
    )
}

fn check_external_volume(key: &str, volume: &mut VolumeConfig) -> ComposeResult<()> {
    if !volume.external.external {
        return Ok(());
    }
    let conflicting = [
        ("driver", !volume.driver.is_empty()),
        ("driver_opts", !volume.driver_opts.is_empty()),
        ("labels", !volume.labels.is_empty()),
    ]
    .into_iter()
    .find_map(|(field, set)| set.then_some(field));
    if let Some(field) = conflicting {
        return Err(ComposeError::conflict(
            format!("volume {key}"),
            format!("conflicting parameters \"external\" and {field:?} specified"),
        ));
    }
    if volume.external.name.is_empty() && volume.name.is_empty() {
        volume.name = key.to_owned();
    }
    Ok(())
}

fn check_file_object(
    kind: &str,
    key: &str,
    object: &mut FileObjectConfig,
    working_dir: &Utf8Path,
    resolve_paths: bool,
) -> ComposeResult<()> {
    if object.external.external {
        if object.external.name.is_empty() && object.name.is_empty() {
            object.name = key.to_owned();
        }
    } else if !object.driver.is_empty() {
        if !object.file.is_empty() {
            return Err(ComposeError::conflict(
                format!("{kind} {key}"),
                format!("{kind}.driver and {kind}.file conflict; only use {kind}.driver"),
            ));
        }
    } else if resolve_paths && !object.file.is_empty() {
        object.file = absolutize(working_dir, &expand_user(&object.file));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn sections(value: Value, resolve_paths: bool) -> ComposeResult<Config> {
        let Value::Object(tree) = value else {
            return Err(ComposeError::decode("", "test input must be a mapping"));
        };
        decode_sections(tree, Utf8Path::new("/srv/app"), resolve_paths)
    }

    #[test]
    fn null_entries_decode_to_defaults() {
        let config = sections(json!({"volumes": {"data": null}, "networks": {"front": {}}}), false)
            .ok()
            .unwrap_or_default();
        assert_eq!(config.volumes.get("data"), Some(&VolumeConfig::default()));
        assert_eq!(config.networks.get("front"), Some(&NetworkConfig::default()));
    }

    #[rstest]
    #[case(json!({"driver": "local"}), "driver")]
    #[case(json!({"driver_opts": {"o": "bind"}}), "driver_opts")]
    #[case(json!({"labels": {"a": "b"}}), "labels")]
    fn external_volume_rejects_driver_settings(#[case] extra: Value, #[case] field: &str) {
        let mut volume = json!({"external": {"external": true}});
        if let (Value::Object(target), Value::Object(source)) = (&mut volume, extra) {
            target.extend(source);
        }
        let err = sections(json!({"volumes": {"data": volume}}), false)
            .err()
            .map(|e| e.to_string());
        assert_eq!(
            err,
            Some(format!("volume data: conflicting parameters \"external\" and {field:?} specified"))
        );
    }

    #[test]
    fn external_resources_default_their_name_to_the_key() {
        let config = sections(
            json!({
                "volumes": {"data": {"external": {"external": true}}},
                "secrets": {"token": {"external": {"external": true}}},
                "networks": {"legacy": {"external": {"external": true, "name": "real"}}}
            }),
            false,
        )
        .ok()
        .unwrap_or_default();
        assert_eq!(config.volumes.get("data").map(|v| v.name.as_str()), Some("data"));
        assert_eq!(config.secrets.get("token").map(|s| s.name.as_str()), Some("token"));
        assert_eq!(config.networks.get("legacy").map(|n| n.name.as_str()), Some(""));
    }

    #[test]
    fn driver_and_file_conflict() {
        let err = sections(json!({"configs": {"app": {"driver": "vault", "file": "./app.conf"}}}), false)
            .err()
            .map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("config app: config.driver and config.file conflict; only use config.driver")
        );
    }

    #[rstest]
    #[case(true, "/srv/app/certs/key.pem")]
    #[case(false, "./certs/key.pem")]
    fn file_backed_secrets_follow_resolve_paths(#[case] resolve: bool, #[case] expected: &str) {
        let config = sections(json!({"secrets": {"key": {"file": "./certs/key.pem"}}}), resolve)
            .ok()
            .unwrap_or_default();
        assert_eq!(config.secrets.get("key").map(|s| s.file.as_str()), Some(expected));
    }

    #[test]
    fn rejects_non_mapping_sections() {
        let err = sections(json!({"networks": ["front"]}), false)
            .err()
            .map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("networks: invalid type sequence for networks, expected mapping")
        );
    }
}
