//! Field locations inside a document tree and wildcard patterns over them.
//!
//! Both the interpolation cast table and the transformer table are keyed by
//! [`PathPattern`]s and built once per load as a [`PathTable`].

use std::fmt;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping key.
    Key(String),
    /// Sequence position.
    Index(usize),
}

/// Location of a value inside a document, such as `services.web.ports[2]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// The document root.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from plain mapping keys.
    #[must_use]
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(|k| Segment::Key(k.into())).collect())
    }

    /// Path of the mapping entry `key` below `self`.
    #[must_use]
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.to_owned()));
        Self(segments)
    }

    /// Path of the sequence element `index` below `self`.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    /// Segments from the root down.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// `true` for the document root.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if position == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// One step of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    /// Matches exactly this mapping key.
    Key(String),
    /// `*`: matches any mapping key.
    AnyKey,
    /// `[]`: matches any sequence position.
    AnyIndex,
}

impl PatternSegment {
    fn matches(&self, segment: &Segment) -> bool {
        match (self, segment) {
            (Self::Key(expected), Segment::Key(actual)) => expected == actual,
            (Self::AnyKey, Segment::Key(_)) | (Self::AnyIndex, Segment::Index(_)) => true,
            _ => false,
        }
    }
}

/// Dotted pattern over [`FieldPath`]s, with `*` for any key and `[]` for any
/// sequence position.
///
/// # Examples
///
/// ```
/// use compose_loader::path::{FieldPath, PathPattern};
///
/// let pattern = PathPattern::parse("services.*.ports.[].target");
/// let path = FieldPath::from_keys(["services", "web", "ports"]).index(0).key("target");
/// assert!(pattern.matches(&path));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern(Vec<PatternSegment>);

impl PathPattern {
    /// Parse a dotted pattern.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        Self(
            pattern
                .split('.')
                .filter(|part| !part.is_empty())
                .map(|part| match part {
                    "*" => PatternSegment::AnyKey,
                    "[]" => PatternSegment::AnyIndex,
                    key => PatternSegment::Key(key.to_owned()),
                })
                .collect(),
        )
    }

    /// `true` when every segment of `path` matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &FieldPath) -> bool {
        self.0.len() == path.0.len()
            && self
                .0
                .iter()
                .zip(path.segments())
                .all(|(pattern, segment)| pattern.matches(segment))
    }
}

/// Ordered lookup from path patterns to values. The first matching entry
/// wins.
#[derive(Debug, Clone)]
pub struct PathTable<T> {
    entries: Vec<(PathPattern, T)>,
}

impl<T> PathTable<T> {
    /// Build a table from `(pattern, value)` pairs.
    #[must_use]
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(pattern, value)| (PathPattern::parse(pattern.as_ref()), value))
                .collect(),
        }
    }

    /// Value registered for the first pattern matching `path`.
    #[must_use]
    pub fn lookup(&self, path: &FieldPath) -> Option<&T> {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, value)| value)
    }

    /// Number of registered patterns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no patterns are registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
