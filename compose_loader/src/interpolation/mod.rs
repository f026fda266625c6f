//! Variable substitution over a document tree, followed by type casts at
//! known field positions.

mod cast;
mod template;

pub use cast::{Cast, CastTable, default_casts, parse_bool};
pub use template::{TemplateError, Variable, extract_variables, substitute};

use serde_json::{Map, Value};

use crate::path::FieldPath;
use crate::{ComposeError, ComposeResult};

/// Expand every string in `value` and cast it when `casts` has an entry for
/// its location.
///
/// Mapping keys are left untouched. Non-string scalars pass through.
///
/// # Errors
///
/// Returns [`ComposeError::Decode`] naming the field path for malformed
/// templates, unsatisfied required variables and failed casts.
///
/// # Examples
///
/// ```
/// use compose_loader::interpolation::{default_casts, interpolate};
/// use compose_loader::path::FieldPath;
/// use serde_json::json;
///
/// let doc = json!({"services": {"web": {"image": "nginx:${TAG}", "tty": "${TTY}"}}});
/// let lookup = |name: &str| match name {
///     "TAG" => Some("1.25".to_owned()),
///     "TTY" => Some("yes".to_owned()),
///     _ => None,
/// };
/// let out = interpolate(doc, &FieldPath::root(), &lookup, &default_casts()).ok();
/// assert_eq!(out, Some(json!({"services": {"web": {"image": "nginx:1.25", "tty": true}}})));
/// ```
pub fn interpolate(
    value: Value,
    path: &FieldPath,
    lookup: &dyn Fn(&str) -> Option<String>,
    casts: &CastTable,
) -> ComposeResult<Value> {
    match value {
        Value::String(template) => interpolate_string(&template, path, lookup, casts),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| interpolate(item, &path.index(index), lookup, casts))
            .collect::<ComposeResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, item)| {
                let expanded = interpolate(item, &path.key(&key), lookup, casts)?;
                Ok((key, expanded))
            })
            .collect::<ComposeResult<Map<_, _>>>()
            .map(Value::Object),
        scalar => Ok(scalar),
    }
}

fn interpolate_string(
    template: &str,
    path: &FieldPath,
    lookup: &dyn Fn(&str) -> Option<String>,
    casts: &CastTable,
) -> ComposeResult<Value> {
    let expanded = substitute(template, lookup).map_err(|err| match err {
        TemplateError::Invalid { .. } => ComposeError::decode(
            path.to_string(),
            format!(
                "invalid interpolation format for {path}.\nYou may need to escape any $ with another $.\n{template}"
            ),
        ),
        TemplateError::MissingRequired { .. } => ComposeError::decode(path.to_string(), err.to_string()),
    })?;
    match casts.lookup(path) {
        Some(cast) => cast
            .apply(&expanded)
            .map_err(|message| ComposeError::decode(path.to_string(), format!("failed to cast to expected type: {message}"))),
        None => Ok(Value::String(expanded)),
    }
}
