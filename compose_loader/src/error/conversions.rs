//! Trait-based conversions between external error types and `ComposeError`.

use figment::Error as FigmentError;

use super::ComposeError;

/// Convert JSON decoding failures raised while building typed sections into
/// [`ComposeError::Decode`]. Callers that know the field location should
/// prefer [`ComposeError::decode`].
impl From<serde_json::Error> for ComposeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode {
            path: String::new(),
            message: e.to_string(),
        }
    }
}

impl From<FigmentError> for ComposeError {
    fn from(e: FigmentError) -> Self {
        Self::Gathering(e.into())
    }
}

impl From<ComposeError> for FigmentError {
    /// Allow using `?` in `figment::Jail` closures that load projects.
    fn from(e: ComposeError) -> Self {
        match e {
            ComposeError::Gathering(fe) => *fe,
            other => Self::from(other.to_string()),
        }
    }
}
