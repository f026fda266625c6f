//! Access to files referenced while loading: `extends` targets, env files
//! and discovered compose files.

use std::collections::BTreeMap;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};

use crate::result_ext::IoResultExt;
use crate::ComposeResult;

/// Reads files on behalf of the loader.
pub trait FileSource {
    /// Read the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ComposeError::Io`] when the file cannot be read.
    fn read(&self, path: &Utf8Path) -> ComposeResult<Vec<u8>>;

    /// `true` when `path` names an existing file or directory.
    fn exists(&self, path: &Utf8Path) -> bool;
}

/// Reads from the local filesystem through capability-scoped directory
/// handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

fn parent_or_dot(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

fn open_parent_dir_and_name(path: &Utf8Path) -> io::Result<(Dir, &str)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let dir = Dir::open_ambient_dir(parent_or_dot(path), ambient_authority())?;
    Ok((dir, file_name))
}

impl FileSource for FsSource {
    fn read(&self, path: &Utf8Path) -> ComposeResult<Vec<u8>> {
        let (dir, name) = open_parent_dir_and_name(path).with_path(path)?;
        dir.read(name).with_path(path)
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        if path.parent().is_none() {
            return Dir::open_ambient_dir(path, ambient_authority()).is_ok();
        }
        open_parent_dir_and_name(path).is_ok_and(|(dir, name)| dir.exists(name))
    }
}

/// In-memory file tree keyed by path.
///
/// Parent directories of every stored file count as existing.
///
/// # Examples
///
/// ```
/// use compose_loader::{FileSource, MemorySource};
/// use camino::Utf8Path;
///
/// let source = MemorySource::default().with_file("/app/base.yml", "services: {}");
/// assert!(source.exists(Utf8Path::new("/app")));
/// assert!(source.read(Utf8Path::new("/app/missing.yml")).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<Utf8PathBuf, Vec<u8>>,
}

impl MemorySource {
    /// Add or replace the file at `path`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<Utf8PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl FileSource for MemorySource {
    fn read(&self, path: &Utf8Path) -> ComposeResult<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
            .with_path(path)
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        self.files.keys().any(|file| file.starts_with(path))
    }
}
