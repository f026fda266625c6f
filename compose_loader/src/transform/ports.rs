//! Port list expansion.

use serde_json::{Map, Value};

use super::{FieldKind, invalid};
use crate::path::FieldPath;
use crate::types::ServicePortConfig;
use crate::{ComposeError, ComposeResult};

const DEFAULT_MODE: &str = "ingress";
const DEFAULT_PROTOCOL: &str = "tcp";
const PROTOCOLS: [&str; 3] = ["tcp", "udp", "sctp"];

/// Expand a short port spec `[ip:][host[-range]:]container[-range][/proto]`
/// into one record per container port.
///
/// A host range paired with a single container port is kept whole as the
/// published value.
///
/// # Errors
///
/// Returns a message when a port or range is malformed, when host and
/// container ranges differ in length, or when the protocol is unknown.
///
/// # Examples
///
/// ```
/// use compose_loader::transform::parse_port_spec;
///
/// let ports = parse_port_spec("127.0.0.1:8000-8001:80-81/UDP").unwrap_or_default();
/// let pairs: Vec<_> = ports.iter().map(|p| (p.published.as_str(), p.target)).collect();
/// assert_eq!(pairs, [("8000", 80), ("8001", 81)]);
/// assert!(ports.iter().all(|p| p.protocol == "udp" && p.host_ip == "127.0.0.1"));
/// ```
pub fn parse_port_spec(spec: &str) -> Result<Vec<ServicePortConfig>, String> {
    let (addresses, protocol) = spec.rsplit_once('/').map_or_else(
        || (spec, DEFAULT_PROTOCOL.to_owned()),
        |(addresses, protocol)| (addresses, protocol.to_ascii_lowercase()),
    );
    if !PROTOCOLS.contains(&protocol.as_str()) {
        return Err(format!("invalid proto: {protocol}"));
    }
    let mut parts = addresses.rsplitn(3, ':');
    let container = parts.next().unwrap_or_default();
    let host = parts.next().unwrap_or_default();
    let host_ip = parts
        .next()
        .map(|ip| ip.trim_start_matches('[').trim_end_matches(']').to_owned())
        .unwrap_or_default();

    let (container_start, container_end) =
        parse_range(container).ok_or_else(|| format!("invalid containerPort: {container}"))?;
    let host_range = if host.is_empty() {
        None
    } else {
        Some(parse_range(host).ok_or_else(|| format!("invalid hostPort: {host}"))?)
    };

    let record = |target: u32, published: String| ServicePortConfig {
        mode: DEFAULT_MODE.to_owned(),
        host_ip: host_ip.clone(),
        target,
        published,
        protocol: protocol.clone(),
        ..ServicePortConfig::default()
    };

    let container_len = container_end.saturating_sub(container_start);
    match host_range {
        None => Ok((container_start..=container_end)
            .map(|target| record(target, String::new()))
            .collect()),
        Some(_) if container_len == 0 => Ok(vec![record(container_start, host.to_owned())]),
        Some((host_start, host_end)) if host_end.saturating_sub(host_start) == container_len => {
            Ok((container_start..=container_end)
                .zip(host_start..=host_end)
                .map(|(target, published)| record(target, published.to_string()))
                .collect())
        }
        Some(_) => Err(format!(
            "invalid ranges specified for container and host Ports: {container} and {host}"
        )),
    }
}

fn parse_port(text: &str) -> Option<u32> {
    text.parse::<u32>().ok().filter(|port| *port <= 65_535)
}

fn parse_range(text: &str) -> Option<(u32, u32)> {
    match text.split_once('-') {
        Some((start, end)) => {
            let (first, last) = (parse_port(start)?, parse_port(end)?);
            (first <= last).then_some((first, last))
        }
        None => parse_port(text).map(|port| (port, port)),
    }
}

fn canonical_mapping(mut map: Map<String, Value>) -> Value {
    if let Some(Value::Number(number)) = map.get("published") {
        let published = number.to_string();
        map.insert("published".to_owned(), Value::String(published));
    }
    for (field, default) in [("mode", DEFAULT_MODE), ("protocol", DEFAULT_PROTOCOL)] {
        let missing = map
            .get(field)
            .is_none_or(|value| value.is_null() || value.as_str() == Some(""));
        if missing {
            map.insert(field.to_owned(), Value::from(default));
        }
    }
    Value::Object(map)
}

pub(super) fn expand_ports(value: Value, path: &FieldPath) -> ComposeResult<Value> {
    let items = match value {
        Value::Null => return Ok(Value::Array(Vec::new())),
        Value::Array(items) => items,
        other => return Err(invalid(FieldKind::Ports, &other, path)),
    };
    let mut expanded = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let item_path = path.index(index);
        let spec = match item {
            Value::Object(map) => {
                expanded.push(canonical_mapping(map));
                continue;
            }
            Value::Number(number) => number.to_string(),
            Value::String(spec) => spec,
            other => return Err(invalid(FieldKind::Ports, &other, &item_path)),
        };
        let records = parse_port_spec(&spec).map_err(|message| ComposeError::decode(item_path.to_string(), message))?;
        for record in records {
            expanded.push(
                serde_json::to_value(record)
                    .map_err(|err| ComposeError::decode(item_path.to_string(), err.to_string()))?,
            );
        }
    }
    Ok(Value::Array(expanded))
}
