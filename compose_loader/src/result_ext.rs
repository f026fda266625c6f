//! Extensions for mapping errors to `ComposeResult` concisely.
//!
//! These helpers reduce repetitive `.map_err(|e| Arc::new(ComposeError::…))`
//! patterns when converting external error types into the crate's
//! `ComposeResult<T>` alias (`Result<T, Arc<ComposeError>>`).
//!
//! # Examples
//!
//! ```
//! use compose_loader::{ComposeResult, ComposeResultExt};
//!
//! fn decode() -> ComposeResult<u32> {
//!     serde_json::from_value(serde_json::json!(8080)).into_compose()
//! }
//! assert_eq!(decode().ok(), Some(8080));
//! ```

use std::sync::Arc;

use camino::Utf8Path;

use crate::{ComposeError, ComposeResult};

/// Generic extension for mapping any `Result<T, E>` with
/// `E: Into<ComposeError>` into a `ComposeResult<T>`.
pub trait ComposeResultExt<T, E> {
    /// Convert `Result<T, E>` into `ComposeResult<T>` using
    /// `Into<ComposeError>`.
    ///
    /// # Errors
    ///
    /// Propagates the original error after conversion into
    /// `Arc<ComposeError>`.
    fn into_compose(self) -> ComposeResult<T>;
}

impl<T, E> ComposeResultExt<T, E> for Result<T, E>
where
    E: Into<ComposeError>,
{
    fn into_compose(self) -> ComposeResult<T> {
        self.map_err(|e| Arc::new(e.into()))
    }
}

/// Attach a file path to `std::io::Error` results.
pub trait IoResultExt<T> {
    /// Convert an I/O failure into [`ComposeError::Io`] for `path`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error when `self` is `Err`.
    fn with_path(self, path: &Utf8Path) -> ComposeResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: &Utf8Path) -> ComposeResult<T> {
        self.map_err(|e| ComposeError::io(path, e))
    }
}
