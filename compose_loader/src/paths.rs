//! Lexical path helpers shared by the transformer, the loader and the
//! normalizer.
//!
//! Compose paths are strings that may use POSIX or Windows syntax
//! regardless of the host, so these helpers work on `&str` rather than on
//! platform paths.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use crate::result_ext::IoResultExt;
use crate::{ComposeError, ComposeResult};

/// Clean a POSIX path lexically: collapse repeated separators, drop `.`
/// segments and resolve `..` against earlier segments.
///
/// An empty path cleans to `.`.
#[must_use]
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." if segments.last().is_some_and(|last| *last != "..") => {
                segments.pop();
            }
            ".." if rooted => {}
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_owned(),
        (false, false) => joined,
    }
}

/// `true` for `C:\...`, `C:/...` and `\\server\share` paths.
#[must_use]
pub fn is_windows_absolute(path: &str) -> bool {
    if path.starts_with("\\\\") {
        return true;
    }
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(drive), Some(':'), Some('\\' | '/')) if drive.is_ascii_alphabetic()
    )
}

/// `true` when `path` is absolute in either POSIX or Windows syntax.
#[must_use]
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || is_windows_absolute(path)
}

/// Rewrite a Windows path into the `/c/dir/file` form a Linux-hosted
/// engine expects. UNC paths keep their server as the first segment.
/// Other paths are returned unchanged.
#[must_use]
pub fn convert_windows_path(path: &str) -> String {
    if let Some(unc) = path.strip_prefix("\\\\") {
        return format!("//{}", unc.replace('\\', "/"));
    }
    if !is_windows_absolute(path) {
        return path.to_owned();
    }
    let mut chars = path.chars();
    let drive = chars.next().map(|c| c.to_ascii_lowercase()).unwrap_or_default();
    let rest: String = chars.skip(1).collect();
    format!("/{drive}{}", rest.replace('\\', "/"))
}

/// Expand a leading `~` to the home directory.
///
/// Leaves the path unchanged, with a warning, when no home directory is
/// known.
#[must_use]
pub fn expand_user(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return path.to_owned(),
    };
    dirs::home_dir().map_or_else(
        || {
            warn!(path, "cannot expand '~' because the home directory is unknown");
            path.to_owned()
        },
        |home| format!("{}{rest}", home.display()),
    )
}

/// Resolve `path` against `base` unless it is already absolute.
#[must_use]
pub fn absolutize(base: &Utf8Path, path: &str) -> String {
    if is_absolute(path) {
        return path.to_owned();
    }
    clean_path(base.join(path).as_str())
}

/// The process working directory as a UTF-8 path.
///
/// # Errors
///
/// Returns [`ComposeError::Io`] when the directory cannot be read and
/// [`ComposeError::Decode`] when it is not valid UTF-8.
pub fn current_dir() -> ComposeResult<Utf8PathBuf> {
    let cwd = std::env::current_dir().with_path(Utf8Path::new("."))?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|path| ComposeError::decode("", format!("current directory {} is not UTF-8", path.display())))
}

/// `dir` cleaned, and resolved against the current directory when it is
/// relative.
///
/// # Errors
///
/// Fails as [`current_dir`] does, and only when `dir` is relative.
pub fn absolute_dir(dir: &Utf8Path) -> ComposeResult<Utf8PathBuf> {
    if dir.is_absolute() {
        return Ok(Utf8PathBuf::from(clean_path(dir.as_str())));
    }
    Ok(Utf8PathBuf::from(absolutize(&current_dir()?, dir.as_str())))
}

/// `true` for build contexts that name a repository or URL rather than a
/// local directory.
#[must_use]
pub fn is_remote_context(context: &str) -> bool {
    context.contains("://") || context.starts_with("git@") || context.starts_with("github.com/")
}
