//! Primary error enum for compose loading flows.

use std::fmt;
use std::sync::Arc;

use camino::Utf8PathBuf;
use figment::Error as FigmentError;
use thiserror::Error;

/// Identity of a service definition inside a specific document.
///
/// Used while following `extends` links so a chain that revisits a service
/// can be reported in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceRef {
    /// Document the service was read from.
    pub file: String,
    /// Service name within that document.
    pub service: String,
}

impl ServiceRef {
    /// Builds a reference for `service` inside `file`.
    #[must_use]
    pub fn new(file: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            service: service.into(),
        }
    }
}

impl fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.service, self.file)
    }
}

/// Errors that can occur while loading a compose project.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ComposeError {
    /// A value has the wrong shape for its field or could not be converted.
    #[error("{}", located(.path, .message))]
    Decode {
        /// Dotted location of the offending value (`services.web.ports[2]`).
        /// Empty when the failure concerns a whole document.
        path: String,
        /// Human-readable explanation of the failure.
        message: String,
    },

    /// A document was rejected by a schema validator.
    #[error("Validation failed for '{key}': {message}")]
    Validation {
        /// Key that failed validation.
        key: String,
        /// Explanation supplied by the validator.
        message: String,
    },

    /// Following `extends` links revisited a service already on the chain.
    #[error("{}", render_chain(.chain))]
    CircularReference {
        /// Services in traversal order, ending with the repeated entry.
        chain: Vec<ServiceRef>,
    },

    /// A deprecated and a canonical field were both set, or two settings
    /// exclude each other.
    #[error("{subject}: {message}")]
    Conflict {
        /// Resource or service carrying the conflicting settings.
        subject: String,
        /// Explanation of the conflict.
        message: String,
    },

    /// A service refers to a resource or service that is not defined.
    #[error("service {service:?} {message}")]
    Reference {
        /// Service that holds the dangling reference.
        service: String,
        /// Description of the missing target.
        message: String,
    },

    /// A referenced file could not be read.
    #[error("cannot read '{path}': {source}")]
    Io {
        /// Path that failed to open or read.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Extracting project options from the environment failed.
    #[error("Failed to gather project options: {0}")]
    Gathering(#[from] Box<FigmentError>),

    /// An inner failure annotated with the step that was running.
    #[error("{context}: {source}")]
    Context {
        /// Description of the failing step, such as `cannot merge service web`.
        context: String,
        /// Failure raised by that step.
        #[source]
        source: Arc<ComposeError>,
    },
}

fn located(path: &str, message: &str) -> String {
    if path.is_empty() {
        message.to_owned()
    } else {
        format!("{path}: {message}")
    }
}

fn render_chain(chain: &[ServiceRef]) -> String {
    let mut lines = vec!["Circular reference:".to_owned()];
    for (index, entry) in chain.iter().enumerate() {
        if index == 0 {
            lines.push(format!("  {entry}"));
        } else {
            lines.push(format!("  extends {entry}"));
        }
    }
    lines.join("\n")
}
