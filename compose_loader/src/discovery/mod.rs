//! Locating compose files and assembling load inputs from the environment.
//!
//! [`find_compose_files`] walks up from a working directory looking for the
//! conventional file names. [`ProjectOptions`] gathers the `COMPOSE_*`
//! variables, an optional `.env` file and explicit caller choices, then
//! drives [`load`](crate::load).

mod env;
mod options;

pub use env::{ComposeEnv, ComposeSettings, ENV_PREFIX};
pub use options::{ProjectOptions, ProjectOptionsBuilder};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use crate::loader::FileSource;
use crate::{ComposeError, ComposeResult};

/// Compose file names in order of preference.
pub const DEFAULT_FILE_NAMES: [&str; 4] = [
    "compose.yaml",
    "compose.yml",
    "docker-compose.yml",
    "docker-compose.yaml",
];

/// Override file names in order of preference.
pub const DEFAULT_OVERRIDE_FILE_NAMES: [&str; 4] = [
    "compose.override.yml",
    "compose.override.yaml",
    "docker-compose.override.yml",
    "docker-compose.override.yaml",
];

fn existing<'n>(
    dir: &'n Utf8Path,
    names: &'n [&str],
    source: &'n dyn FileSource,
) -> impl Iterator<Item = Utf8PathBuf> + 'n {
    names
        .iter()
        .map(move |name| dir.join(name))
        .filter(move |path| source.exists(path))
}

/// Find the compose file for `start` and the override file beside it.
///
/// Starting at `start` and moving up through its parents, the first
/// directory holding any of [`DEFAULT_FILE_NAMES`] wins. The preferred
/// name is returned first, followed by the first override found in the
/// same directory.
///
/// # Errors
///
/// Returns [`ComposeError::Decode`] when no directory up to the root holds
/// a compose file.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use compose_loader::MemorySource;
/// use compose_loader::discovery::find_compose_files;
///
/// let source = MemorySource::default()
///     .with_file("/work/compose.yaml", "services: {}")
///     .with_file("/work/compose.override.yml", "services: {}");
/// let files = find_compose_files(Utf8Path::new("/work/app/src"), &source).unwrap();
/// assert_eq!(files, ["/work/compose.yaml", "/work/compose.override.yml"]);
/// ```
pub fn find_compose_files(start: &Utf8Path, source: &dyn FileSource) -> ComposeResult<Vec<Utf8PathBuf>> {
    for dir in start.ancestors() {
        let mut candidates = existing(dir, &DEFAULT_FILE_NAMES, source);
        let Some(first) = candidates.next() else {
            continue;
        };
        let others: Vec<Utf8PathBuf> = candidates.collect();
        if !others.is_empty() {
            warn!(using = %first, ignored = ?others, "found multiple compose files with supported names");
        }
        let mut files = vec![first];
        files.extend(existing(dir, &DEFAULT_OVERRIDE_FILE_NAMES, source).take(1));
        return Ok(files);
    }
    Err(ComposeError::decode(
        "",
        format!("no compose file found in {start} or any parent directory"),
    ))
}

#[cfg(test)]
mod tests;
