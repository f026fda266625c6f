//! One rewrite function per [`FieldKind`].

use serde_json::{Map, Value, json};

use super::{FieldKind, invalid, ports, volume};
use crate::path::FieldPath;
use crate::paths::clean_path;
use crate::types::{Duration, HEALTHCHECK_SHELL, SERVICE_CONDITION_STARTED, UnitBytes};
use crate::{ComposeError, ComposeResult};

pub(super) fn apply(kind: FieldKind, value: Value, path: &FieldPath) -> ComposeResult<Value> {
    match kind {
        FieldKind::External => external(value, path),
        FieldKind::Ports => ports::expand_ports(value, path),
        FieldKind::FileReferences => each_item(kind, value, path, file_reference),
        FieldKind::Build => wrap_string(kind, "context", value, path),
        FieldKind::Extends => wrap_string(kind, "service", value, path),
        FieldKind::DependsOn => depends_on(value, path),
        FieldKind::Volumes => each_item(kind, value, path, service_volume),
        FieldKind::MappingOrList { allow_nil, separator } => mapping_or_list(kind, allow_nil, separator, value, path),
        FieldKind::Ulimit => ulimit(value, path),
        FieldKind::HealthcheckTest => healthcheck_test(value, path),
        FieldKind::Ssh => ssh(value, path),
        FieldKind::StringList => string_list(value, path),
        FieldKind::StringOrNumberList => string_or_number_list(value, path),
        FieldKind::ShellCommand => shell_command(value, path),
        FieldKind::ServiceNetworks => service_networks(value, path),
        FieldKind::DeviceCount => device_count(value, path),
        FieldKind::UnitBytes => unit_suffixed(kind, value, path, |raw| UnitBytes::parse(raw).map(UnitBytes::bytes)),
        FieldKind::Duration => unit_suffixed(kind, value, path, |raw| Duration::parse(raw).map(Duration::as_nanos)),
    }
}

/// Text of a scalar, with numbers and booleans rendered as written.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn each_item(
    kind: FieldKind,
    value: Value,
    path: &FieldPath,
    rewrite: fn(Value, &FieldPath) -> ComposeResult<Value>,
) -> ComposeResult<Value> {
    match value {
        Value::Null => Ok(Value::Array(Vec::new())),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| rewrite(item, &path.index(index)))
            .collect::<ComposeResult<Vec<_>>>()
            .map(Value::Array),
        other => Err(invalid(kind, &other, path)),
    }
}

fn external(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Bool(external) => Ok(json!({ "external": external })),
        Value::Object(mut map) => {
            map.entry("external").or_insert(Value::Bool(true));
            Ok(Value::Object(map))
        }
        other => Err(invalid(FieldKind::External, &other, path)),
    }
}

fn wrap_string(kind: FieldKind, field: &str, value: Value, path: &FieldPath) -> ComposeResult<Value> {
    match value {
        Value::String(text) => {
            let mut map = Map::new();
            map.insert(field.to_owned(), Value::String(text));
            Ok(Value::Object(map))
        }
        Value::Null | Value::Object(_) => Ok(value),
        other => Err(invalid(kind, &other, path)),
    }
}

fn clean_target(mut map: Map<String, Value>) -> Value {
    if let Some(Value::String(target)) = map.get_mut("target") {
        if !target.is_empty() {
            *target = clean_path(target);
        }
    }
    Value::Object(map)
}

fn file_reference(item: Value, path: &FieldPath) -> ComposeResult<Value> {
    match item {
        Value::String(source) => Ok(json!({ "source": source })),
        Value::Object(map) => Ok(clean_target(map)),
        other => Err(invalid(FieldKind::FileReferences, &other, path)),
    }
}

fn service_volume(item: Value, path: &FieldPath) -> ComposeResult<Value> {
    match item {
        Value::String(spec) => volume::parse_volume(&spec)
            .map_err(|message| ComposeError::decode(path.to_string(), message))
            .and_then(|parsed| serde_json::to_value(parsed).map_err(|err| ComposeError::decode(path.to_string(), err.to_string()))),
        Value::Object(map) => Ok(clean_target(map)),
        other => Err(invalid(FieldKind::Volumes, &other, path)),
    }
}

fn started() -> Value {
    json!({ "condition": SERVICE_CONDITION_STARTED })
}

fn depends_on(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    let kind = FieldKind::DependsOn;
    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::String(name) => Ok((name, started())),
                other => Err(invalid(kind, &other, &path.index(index))),
            })
            .collect::<ComposeResult<Map<_, _>>>()
            .map(Value::Object),
        Value::Object(map) => map
            .into_iter()
            .map(|(name, dependency)| match dependency {
                Value::Null => Ok((name, started())),
                Value::Object(mut fields) => {
                    fields
                        .entry("condition")
                        .or_insert_with(|| Value::from(SERVICE_CONDITION_STARTED));
                    Ok((name, Value::Object(fields)))
                }
                other => Err(invalid(kind, &other, &path.key(&name))),
            })
            .collect::<ComposeResult<Map<_, _>>>()
            .map(Value::Object),
        other => Err(invalid(kind, &other, path)),
    }
}

fn mapping_or_list(
    kind: FieldKind,
    allow_nil: bool,
    separator: char,
    value: Value,
    path: &FieldPath,
) -> ComposeResult<Value> {
    let unset = || {
        if allow_nil {
            Value::Null
        } else {
            Value::String(String::new())
        }
    };
    let mut entries = Map::new();
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, item) in map {
                let entry = match item {
                    Value::Null => unset(),
                    other => scalar_string(&other)
                        .map(Value::String)
                        .ok_or_else(|| invalid(kind, &other, &path.key(&key)))?,
                };
                entries.insert(key, entry);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.into_iter().enumerate() {
                let text = scalar_string(&item).ok_or_else(|| invalid(kind, &item, &path.index(index)))?;
                match text.split_once(separator) {
                    Some((key, entry)) => entries.insert(key.to_owned(), Value::from(entry)),
                    None => entries.insert(text, unset()),
                };
            }
        }
        other => return Err(invalid(kind, &other, path)),
    }
    Ok(Value::Object(entries))
}

fn ulimit(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    match value {
        Value::Number(limit) => Ok(json!({ "soft": limit, "hard": limit })),
        Value::Object(_) => Ok(value),
        other => Err(invalid(FieldKind::Ulimit, &other, path)),
    }
}

fn healthcheck_test(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    match value {
        Value::String(command) => Ok(json!([HEALTHCHECK_SHELL, command])),
        Value::Null | Value::Array(_) => Ok(value),
        other => Err(invalid(FieldKind::HealthcheckTest, &other, path)),
    }
}

fn ssh_entry(spec: &str) -> Value {
    let entry = if spec.is_empty() { "default" } else { spec };
    let (id, key_path) = entry.split_once('=').unwrap_or((entry, ""));
    json!({ "id": id, "path": key_path })
}

fn ssh(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    let kind = FieldKind::Ssh;
    match value {
        Value::Null => Ok(Value::Array(Vec::new())),
        Value::String(spec) => Ok(Value::Array(vec![ssh_entry(&spec)])),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::String(spec) => Ok(ssh_entry(&spec)),
                Value::Object(_) => Ok(item),
                other => Err(invalid(kind, &other, &path.index(index))),
            })
            .collect::<ComposeResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => map
            .into_iter()
            .map(|(id, entry)| match entry {
                Value::Null => Ok(json!({ "id": id, "path": "" })),
                Value::String(key_path) => Ok(json!({ "id": id, "path": key_path })),
                other => Err(invalid(kind, &other, &path.key(&id))),
            })
            .collect::<ComposeResult<Vec<_>>>()
            .map(Value::Array),
        other => Err(invalid(kind, &other, path)),
    }
}

fn string_list(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    match value {
        Value::Null => Ok(Value::Array(Vec::new())),
        Value::String(item) => Ok(Value::Array(vec![Value::String(item)])),
        Value::Array(_) => Ok(value),
        other => Err(invalid(FieldKind::StringList, &other, path)),
    }
}

fn string_or_number_list(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    let kind = FieldKind::StringOrNumberList;
    let items = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        scalar @ (Value::String(_) | Value::Number(_)) => vec![scalar],
        other => return Err(invalid(kind, &other, path)),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            scalar_string(&item)
                .map(Value::String)
                .ok_or_else(|| invalid(kind, &item, &path.index(index)))
        })
        .collect::<ComposeResult<Vec<_>>>()
        .map(Value::Array)
}

fn shell_command(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    match value {
        Value::String(line) => shlex::split(&line)
            .map(|words| Value::Array(words.into_iter().map(Value::String).collect()))
            .ok_or_else(|| ComposeError::decode(path.to_string(), format!("invalid command line {line:?}"))),
        Value::Null | Value::Array(_) => Ok(value),
        other => Err(invalid(FieldKind::ShellCommand, &other, path)),
    }
}

fn service_networks(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    let kind = FieldKind::ServiceNetworks;
    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Array(names) => names
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::String(name) => Ok((name, Value::Null)),
                other => Err(invalid(kind, &other, &path.index(index))),
            })
            .collect::<ComposeResult<Map<_, _>>>()
            .map(Value::Object),
        Value::Object(_) => Ok(value),
        other => Err(invalid(kind, &other, path)),
    }
}

fn device_count(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    match value {
        Value::Number(_) => Ok(value),
        Value::String(count) if count == "all" => Ok(Value::from(-1)),
        Value::String(count) => count
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| ComposeError::decode(path.to_string(), format!("invalid value for count: {count:?}"))),
        other => Err(invalid(FieldKind::DeviceCount, &other, path)),
    }
}

fn unit_suffixed(
    kind: FieldKind,
    value: Value,
    path: &FieldPath,
    parse: fn(&str) -> Result<i64, String>,
) -> ComposeResult<Value> {
    match value {
        Value::Null | Value::Number(_) => Ok(value),
        Value::String(raw) => parse(&raw)
            .map(Value::from)
            .map_err(|message| ComposeError::decode(path.to_string(), message)),
        other => Err(invalid(kind, &other, path)),
    }
}
