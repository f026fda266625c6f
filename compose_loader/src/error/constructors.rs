//! Constructors and inspection helpers for `ComposeError`.

use std::sync::Arc;

use camino::Utf8Path;

use super::{ComposeError, ServiceRef};

impl ComposeError {
    /// Construct a shared [`ComposeError::Decode`] for the value at `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use compose_loader::ComposeError;
    /// let err = ComposeError::decode("services.web.ports[0]", "invalid port");
    /// assert_eq!(err.to_string(), "services.web.ports[0]: invalid port");
    /// ```
    #[must_use]
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::Decode {
            path: path.into(),
            message: message.into(),
        })
    }

    /// Construct a shared [`ComposeError::Conflict`].
    #[must_use]
    pub fn conflict(subject: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::Conflict {
            subject: subject.into(),
            message: message.into(),
        })
    }

    /// Construct a shared [`ComposeError::Reference`] for `service`.
    #[must_use]
    pub fn reference(service: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::Reference {
            service: service.into(),
            message: message.into(),
        })
    }

    /// Construct a shared [`ComposeError::CircularReference`] from the chain
    /// of visited services.
    #[must_use]
    pub fn circular(chain: Vec<ServiceRef>) -> Arc<Self> {
        Arc::new(Self::CircularReference { chain })
    }

    /// Construct a shared [`ComposeError::Io`] for `path`.
    #[must_use]
    pub fn io(path: &Utf8Path, source: std::io::Error) -> Arc<Self> {
        Arc::new(Self::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Wrap `source` with a description of the step that produced it.
    ///
    /// # Examples
    ///
    /// ```
    /// use compose_loader::ComposeError;
    /// let inner = ComposeError::conflict("volume data", "driver and external both set");
    /// let err = ComposeError::context("cannot merge volumes from override.yml", inner);
    /// assert!(err.to_string().starts_with("cannot merge volumes from override.yml: "));
    /// ```
    #[must_use]
    pub fn context(context: impl Into<String>, source: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::Context {
            context: context.into(),
            source,
        })
    }

    /// Return the innermost error, skipping any [`ComposeError::Context`]
    /// wrappers.
    #[must_use]
    pub fn innermost(&self) -> &Self {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source.as_ref();
        }
        current
    }
}
