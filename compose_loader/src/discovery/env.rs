//! `COMPOSE_*` variables as a figment provider.
//!
//! Values are emitted as plain strings so a project named `2024` or a
//! `COMPOSE_CONVERT_WINDOWS_PATHS=1` reach [`ComposeSettings`] unchanged.

use std::collections::BTreeMap;

use figment::providers::Env;
use figment::value::{Dict, Map, Value};
use figment::{Figment, Metadata, Profile, Provider};
use serde::Deserialize;

use crate::types::Environment;
use crate::{ComposeResult, ComposeResultExt};

/// Prefix shared by every variable the loader reads.
pub const ENV_PREFIX: &str = "COMPOSE_";

/// Provider over the `COMPOSE_*` entries of an environment, keyed by the
/// lower-cased remainder of the variable name.
#[derive(Debug, Clone, Default)]
pub struct ComposeEnv {
    vars: BTreeMap<String, String>,
}

impl ComposeEnv {
    /// Read the entries of a caller-supplied environment.
    #[must_use]
    pub fn from_environment(environment: &Environment) -> Self {
        let vars = environment
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|rest| (rest.to_ascii_lowercase(), value.clone()))
            })
            .collect();
        Self { vars }
    }

    /// Read the entries of the process environment.
    #[must_use]
    pub fn from_process() -> Self {
        let vars = Env::prefixed(ENV_PREFIX)
            .iter()
            .map(|(key, value)| (key.as_str().to_ascii_lowercase(), value))
            .collect();
        Self { vars }
    }
}

impl Provider for ComposeEnv {
    fn metadata(&self) -> Metadata {
        Metadata::named("COMPOSE_* environment variables")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let dict: Dict = self
            .vars
            .iter()
            .map(|(key, value)| (key.clone(), Value::from(value.clone())))
            .collect();
        Ok(Profile::Default.collect(dict))
    }
}

/// Settings carried by `COMPOSE_*` variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ComposeSettings {
    /// `COMPOSE_FILE`: compose files joined by [`Self::path_separator`].
    pub file: Option<String>,
    /// `COMPOSE_PATH_SEPARATOR`.
    pub path_separator: Option<String>,
    /// `COMPOSE_PROJECT_NAME`.
    pub project_name: Option<String>,
    /// `COMPOSE_CONVERT_WINDOWS_PATHS`.
    pub convert_windows_paths: Option<String>,
    /// `COMPOSE_PROFILES`: comma-separated profile names.
    pub profiles: Option<String>,
}

impl ComposeSettings {
    /// Extract the settings from `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ComposeError::Gathering`] when figment cannot
    /// extract the values.
    pub fn gather(provider: ComposeEnv) -> ComposeResult<Self> {
        Figment::from(provider).extract().into_compose()
    }

    /// `COMPOSE_FILE` split on the configured separator, with empty entries
    /// dropped.
    #[must_use]
    pub fn files(&self) -> Vec<String> {
        let default_separator = if cfg!(windows) { ";" } else { ":" };
        let separator = self
            .path_separator
            .as_deref()
            .filter(|sep| !sep.is_empty())
            .unwrap_or(default_separator);
        self.file
            .as_deref()
            .map(|files| {
                files
                    .split(separator)
                    .filter(|file| !file.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `COMPOSE_PROFILES` split on commas.
    #[must_use]
    pub fn profiles(&self) -> Vec<String> {
        self.profiles
            .as_deref()
            .map(|profiles| {
                profiles
                    .split(',')
                    .map(str::trim)
                    .filter(|profile| !profile.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}
