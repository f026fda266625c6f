//! Key normalization for decoded documents.
//!
//! Converts a generic [`Node`] tree into a string-keyed JSON tree. Non-string
//! keys are rejected with their location, and vendor-extension keys (`x-`)
//! are grouped under an `extensions` key at the level where they appear.
//!
//! The top-level `services` mapping is the one exception: an `x-` entry there
//! is an ordinary service, because services may legitimately be named
//! `x-something`.

use serde_json::{Map, Value};

use crate::document::Node;
use crate::path::FieldPath;
use crate::{ComposeError, ComposeResult};

/// Prefix that marks vendor-extension keys.
pub const EXTENSION_PREFIX: &str = "x-";

/// Key under which extension entries are collected.
pub const EXTENSIONS_KEY: &str = "extensions";

/// Normalize a whole document.
///
/// # Errors
///
/// Returns [`ComposeError::Decode`] when the root is not a mapping or a
/// mapping anywhere in the tree has a non-string key.
///
/// # Examples
///
/// ```
/// use compose_loader::{Node, keys::normalize_document};
///
/// let doc = Node::mapping([("x-common", Node::from("shared")), ("name", Node::from("demo"))]);
/// let tree = normalize_document(doc).unwrap();
/// assert_eq!(tree["extensions"]["x-common"], "shared");
/// ```
pub fn normalize_document(node: Node) -> ComposeResult<Map<String, Value>> {
    let Node::Mapping(_) = &node else {
        return Err(ComposeError::decode("", "Top-level object must be a mapping"));
    };
    match stringify_keys(node, &FieldPath::root())? {
        Value::Object(map) => Ok(group_document(map)),
        _ => Err(ComposeError::decode("", "Top-level object must be a mapping")),
    }
}

/// Recursively convert `node` into a JSON value, rejecting non-string keys.
///
/// # Errors
///
/// Returns [`ComposeError::Decode`] naming the mapping that holds the
/// offending key.
pub fn stringify_keys(node: Node, path: &FieldPath) -> ComposeResult<Value> {
    Ok(match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(b),
        Node::Number(n) => Value::Number(n),
        Node::String(s) => Value::String(s),
        Node::Sequence(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| stringify_keys(item, &path.index(index)))
                .collect::<ComposeResult<_>>()?,
        ),
        Node::Mapping(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                let Node::String(key) = key else {
                    return Err(non_string_key(path, &key));
                };
                let converted = stringify_keys(value, &path.key(&key))?;
                map.insert(key, converted);
            }
            Value::Object(map)
        }
    })
}

fn non_string_key(path: &FieldPath, key: &Node) -> std::sync::Arc<ComposeError> {
    let location = if path.is_root() {
        "at top level".to_owned()
    } else {
        format!("in {path}")
    };
    ComposeError::decode(path.to_string(), format!("Non-string key {location}: {key}"))
}

fn group_document(mut root: Map<String, Value>) -> Map<String, Value> {
    let services = root.remove("services");
    let mut grouped = group_mapping(root);
    if let Some(services) = services {
        let value = match services {
            Value::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(name, service)| (name, group_extensions(service)))
                    .collect(),
            ),
            other => group_extensions(other),
        };
        grouped.insert("services".to_owned(), value);
    }
    grouped
}

/// Group `x-` keys under `extensions` at every mapping level of `value`.
#[must_use]
pub fn group_extensions(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(group_mapping(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(group_extensions).collect()),
        scalar => scalar,
    }
}

fn group_mapping(map: Map<String, Value>) -> Map<String, Value> {
    let mut grouped = Map::new();
    let mut extensions = Map::new();
    for (key, value) in map {
        if key.starts_with(EXTENSION_PREFIX) {
            extensions.insert(key, value);
        } else {
            grouped.insert(key, group_extensions(value));
        }
    }
    if !extensions.is_empty() {
        match grouped.get_mut(EXTENSIONS_KEY) {
            Some(Value::Object(existing)) => existing.extend(extensions),
            _ => {
                grouped.insert(EXTENSIONS_KEY.to_owned(), Value::Object(extensions));
            }
        }
    }
    grouped
}
