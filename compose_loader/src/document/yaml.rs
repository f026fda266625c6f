//! YAML decoding backed by `serde-saphyr`.

use serde_saphyr::Options;

use crate::{ComposeError, ComposeResult};

use super::Node;

/// Decode YAML `contents` into a generic [`Node`] tree using strict boolean
/// semantics, so `yes`/`no` stay strings until a field cast says otherwise.
///
/// # Errors
///
/// Returns [`ComposeError::Decode`] naming `filename` when the contents are
/// not valid YAML.
pub(crate) fn parse_yaml(filename: &str, contents: &str) -> ComposeResult<Node> {
    serde_saphyr::from_str_with_options(
        contents,
        Options {
            strict_booleans: true,
            ..Options::default()
        },
    )
    .map_err(|err| ComposeError::decode("", format!("failed to parse {filename}: {err}")))
}
