//! Flags controlling which pipeline stages [`load`](super::load) runs.

use serde_json::Value;

use crate::ComposeResult;
use crate::interpolation::CastTable;

/// Schema validator applied to each document after interpolation.
///
/// Validators report failures as [`crate::ComposeError::Validation`].
pub type Validator = fn(&Value) -> ComposeResult<()>;

/// Options for [`load`](super::load). Every flag defaults to off.
///
/// # Examples
///
/// ```
/// use compose_loader::LoadOptions;
///
/// let options = LoadOptions::new()
///     .project_name("My App!", true)
///     .resolve_paths(true)
///     .skip_consistency_check(true);
/// assert_eq!(options.name(), ("myapp", true));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub(crate) skip_validation: bool,
    pub(crate) skip_interpolation: bool,
    pub(crate) skip_normalization: bool,
    pub(crate) resolve_paths: bool,
    pub(crate) convert_windows_paths: bool,
    pub(crate) skip_consistency_check: bool,
    pub(crate) skip_extends: bool,
    pub(crate) discard_env_files: bool,
    project_name: String,
    project_name_imperatively_set: bool,
    pub(crate) type_casts: Option<CastTable>,
    pub(crate) validator: Option<Validator>,
}

impl LoadOptions {
    /// Options with every stage enabled and no project name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the schema validator.
    #[must_use]
    pub const fn skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    /// Leave `${VAR}` references and string scalars untouched.
    #[must_use]
    pub const fn skip_interpolation(mut self, skip: bool) -> Self {
        self.skip_interpolation = skip;
        self
    }

    /// Skip default injection, deprecated-field relocation and naming.
    #[must_use]
    pub const fn skip_normalization(mut self, skip: bool) -> Self {
        self.skip_normalization = skip;
        self
    }

    /// Rewrite relative bind sources, build contexts and file paths to
    /// absolute paths.
    #[must_use]
    pub const fn resolve_paths(mut self, resolve: bool) -> Self {
        self.resolve_paths = resolve;
        self
    }

    /// Rewrite `C:\dir` bind sources as `/c/dir`.
    #[must_use]
    pub const fn convert_windows_paths(mut self, convert: bool) -> Self {
        self.convert_windows_paths = convert;
        self
    }

    /// Skip cross-reference checks on the final project.
    #[must_use]
    pub const fn skip_consistency_check(mut self, skip: bool) -> Self {
        self.skip_consistency_check = skip;
        self
    }

    /// Leave `extends` links unresolved.
    #[must_use]
    pub const fn skip_extends(mut self, skip: bool) -> Self {
        self.skip_extends = skip;
        self
    }

    /// Drop `env_file` references once their values are folded into
    /// `environment`.
    #[must_use]
    pub const fn discard_env_files(mut self, discard: bool) -> Self {
        self.discard_env_files = discard;
        self
    }

    /// Set the project name. `imperatively_set` marks a name chosen by the
    /// caller, which takes precedence over a `name:` in the documents.
    #[must_use]
    pub fn project_name(mut self, name: &str, imperatively_set: bool) -> Self {
        self.set_project_name(name, imperatively_set);
        self
    }

    /// In-place form of [`LoadOptions::project_name`].
    pub fn set_project_name(&mut self, name: &str, imperatively_set: bool) {
        self.project_name = normalize_project_name(name);
        self.project_name_imperatively_set = imperatively_set;
    }

    /// Replace the interpolation cast table.
    #[must_use]
    pub fn type_casts(mut self, casts: CastTable) -> Self {
        self.type_casts = Some(casts);
        self
    }

    /// Install a schema validator.
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Normalized project name and whether the caller set it imperatively.
    #[must_use]
    pub fn name(&self) -> (&str, bool) {
        (&self.project_name, self.project_name_imperatively_set)
    }
}

/// Lower-case `name`, keep only `[a-z0-9_-]` and trim leading `_` and `-`.
///
/// # Examples
///
/// ```
/// use compose_loader::normalize_project_name;
/// assert_eq!(normalize_project_name("-_My.Project 2"), "myproject2");
/// ```
#[must_use]
pub fn normalize_project_name(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-'))
        .collect();
    kept.trim_start_matches(['_', '-']).to_owned()
}
