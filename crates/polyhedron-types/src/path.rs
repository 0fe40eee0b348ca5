//! Dot-delimited key paths into nested attributes.
//!
//! `"meta.title"` addresses the `title` attribute inside a project's `meta`
//! group. Paths are resolved segment by segment against an existing JSON
//! value; [`set_key_value`] replaces the addressed value and never creates
//! new structure, so a path must name a location that already exists.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// Errors from parsing or resolving a [`FieldPath`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path string was empty.
    #[error("empty field path")]
    Empty,

    /// A segment between dots was empty (`"meta..title"`).
    #[error("empty segment in field path '{0}'")]
    EmptySegment(String),

    /// A segment does not name an existing nested location.
    #[error("field path '{0}' does not address an existing location")]
    Missing(String),

    /// The path resolves, but not to a text attribute.
    #[error("field path '{0}' does not address a text attribute")]
    NotText(String),
}

/// A parsed dot-delimited path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Build from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(PathError::EmptySegment(segments.join(".")));
        }
        Ok(Self { segments })
    }

    /// The path segments in resolution order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        Self::from_segments(s.split('.'))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Resolve an existing nested location.
pub fn lookup<'a, S: AsRef<str>>(value: &'a Value, segments: &[S]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(value, |current, segment| current.as_object()?.get(segment.as_ref()))
}

/// Replace the value at an existing nested location.
///
/// Segments are resolved in order; every one must already exist. Nothing is
/// inserted, so a typo in a path is an error instead of a new attribute.
pub fn set_key_value<S: AsRef<str>>(
    target: &mut Value,
    segments: &[S],
    new_value: Value,
) -> Result<(), PathError> {
    let dotted = || {
        segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(".")
    };
    if segments.is_empty() {
        return Err(PathError::Empty);
    }

    let mut current = target;
    for segment in segments {
        current = current
            .as_object_mut()
            .and_then(|map| map.get_mut(segment.as_ref()))
            .ok_or_else(|| PathError::Missing(dotted()))?;
    }
    *current = new_value;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_dotted_path() {
        let path: FieldPath = "meta.title".parse().unwrap();
        assert_eq!(path.segments(), ["meta", "title"]);
        assert_eq!(path.to_string(), "meta.title");
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert_eq!("".parse::<FieldPath>(), Err(PathError::Empty));
        assert!(matches!(
            "meta..title".parse::<FieldPath>(),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(".title".parse::<FieldPath>(), Err(PathError::EmptySegment(_))));
    }

    #[test]
    fn test_set_replaces_only_addressed_leaf() {
        let mut value = json!({"meta": {"time": 5, "title": "", "desc": "keep"}});
        set_key_value(&mut value, &["meta", "title"], json!("Hello")).unwrap();
        assert_eq!(value, json!({"meta": {"time": 5, "title": "Hello", "desc": "keep"}}));
    }

    #[test]
    fn test_set_creates_no_structure() {
        let mut value = json!({"meta": {"title": ""}});
        let before = value.clone();
        let err = set_key_value(&mut value, &["meta", "subtitle"], json!("x")).unwrap_err();
        assert_eq!(err, PathError::Missing("meta.subtitle".into()));
        assert_eq!(value, before);

        let err = set_key_value(&mut value, &["meta", "title", "deeper"], json!("x")).unwrap_err();
        assert!(matches!(err, PathError::Missing(_)));
        assert_eq!(value, before);
    }

    #[test]
    fn test_lookup() {
        let value = json!({"a": {"b": {"c": 1}}});
        assert_eq!(lookup(&value, &["a", "b", "c"]), Some(&json!(1)));
        assert_eq!(lookup(&value, &["a", "x"]), None);
        assert_eq!(lookup::<&str>(&value, &[]), Some(&value));
    }
}
