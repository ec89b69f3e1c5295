//! # DocumentPath
//! Every remote resource is addressed by a slash-separated path such as `users/abc/games/xyz`.
//! Even-length paths name documents and odd-length paths name collections, but nothing here depends on that:
//! the caller says which shape it expects when it builds a request.
//!
//! Paths are usually built from runtime values (user ids, game ids), so construction is fallible.
//! A segment can never be empty and can never contain the separator.

use std::fmt;

const SEPARATOR: char = '/';

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path has no segments")]
    NoSegments,
    #[error("path segment is empty")]
    EmptySegment,
    #[error("path segment {0:?} contains a separator")]
    ContainsSeparator(String),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath(String);

impl DocumentPath {
    pub fn new<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = String::new();
        for segment in segments {
            let segment = segment.as_ref();
            validate_segment(segment, SEPARATOR)?;
            if !path.is_empty() {
                path.push(SEPARATOR);
            }
            path.push_str(segment);
        }
        if path.is_empty() {
            return Err(PathError::NoSegments);
        }
        Ok(Self(path))
    }

    pub fn parse(path: &str) -> Result<Self, PathError> {
        Self::new(path.split(SEPARATOR))
    }

    pub fn child(&self, segment: impl AsRef<str>) -> Result<Self, PathError> {
        let segment = segment.as_ref();
        validate_segment(segment, SEPARATOR)?;
        Ok(Self(format!("{}{SEPARATOR}{segment}", self.0)))
    }

    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// True if `other` is exactly one segment below `self`.
    pub fn is_parent_of(&self, other: &DocumentPath) -> bool {
        other.parent().as_ref() == Some(self)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    pub fn last_segment(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(_, last)| last)
            .unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.0
    }
}

/// A path to a field inside a single document, e.g. `fcmTokens` -> `com.triumph.app`.
///
/// Segments are kept separate rather than joined with dots, so a segment may itself contain dots
/// (bundle identifiers do).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::NoSegments);
        }
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment);
        }
        Ok(Self(segments))
    }

    pub fn child(&self, segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        if segment.is_empty() {
            return Err(PathError::EmptySegment);
        }
        let mut segments = self.0.clone();
        segments.push(segment);
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    /// Dotted form, with backtick quoting for segments that contain a dot.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if segment.contains('.') {
                write!(f, "`{segment}`")?;
            } else {
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}

fn validate_segment(segment: &str, separator: char) -> Result<(), PathError> {
    if segment.is_empty() {
        return Err(PathError::EmptySegment);
    }
    if segment.contains(separator) {
        return Err(PathError::ContainsSeparator(segment.to_string()));
    }
    Ok(())
}
