//! On-disk compose projects in a temporary directory.

use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// A temporary directory holding compose files, env files and build
/// contexts. The directory is deleted on drop.
///
/// # Examples
///
/// ```
/// use compose_loader_test_helpers::project::ComposeProject;
///
/// # fn main() -> anyhow::Result<()> {
/// let project = ComposeProject::new()?
///     .with_file("compose.yaml", "services:\n  web:\n    image: nginx\n")?
///     .with_file("app/Dockerfile", "FROM scratch\n")?;
/// assert!(project.join("app/Dockerfile").is_file());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ComposeProject {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl ComposeProject {
    /// Create an empty project directory.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or its path is not UTF-8.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("create project directory")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("temporary path {} is not UTF-8", path.display()))?;
        Ok(Self { _dir: dir, root })
    }

    /// Write `contents` to `relative`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails when the file or its parents cannot be written.
    pub fn write(&self, relative: &str, contents: &str) -> Result<Utf8PathBuf> {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {path}"))?;
        Ok(path)
    }

    /// Builder form of [`ComposeProject::write`].
    ///
    /// # Errors
    ///
    /// See [`ComposeProject::write`].
    pub fn with_file(self, relative: &str, contents: &str) -> Result<Self> {
        self.write(relative, contents)?;
        Ok(self)
    }

    /// Root of the project.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.root
    }

    /// `relative` resolved against the root.
    #[must_use]
    pub fn join(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }
}
