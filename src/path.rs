//! Paths for navigating nested data trees.
//!
//! A path is a sequence of segments describing a location in a tree. Each
//! segment is a record field, a sequence index, or an associative-container
//! key. Sets have no addressable positions, so no segment kind exists for
//! them; set elements are reached through the add/remove-by-value operations.

use crate::value::Key;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single segment in a path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seg {
    /// Record field access: `{field: value}`
    Field(String),
    /// Sequence index access: `[index]`
    Index(usize),
    /// Associative-container key access with an arbitrary runtime key.
    Key(Key),
}

impl Seg {
    /// Create a field segment.
    #[inline]
    pub fn field(name: impl Into<String>) -> Self {
        Seg::Field(name.into())
    }

    /// Create an index segment.
    #[inline]
    pub fn index(i: usize) -> Self {
        Seg::Index(i)
    }

    /// Create a key segment for an associative container.
    #[inline]
    pub fn key(k: impl Into<Key>) -> Self {
        Seg::Key(k.into())
    }

    /// Get the field name if this is a field segment.
    #[inline]
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Seg::Field(name) => Some(name),
            _ => None,
        }
    }

    /// Get the index if this is an index segment.
    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Index(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the key if this is a key segment.
    #[inline]
    pub fn as_key(&self) -> Option<&Key> {
        match self {
            Seg::Key(k) => Some(k),
            _ => None,
        }
    }

    /// Short name for the access kind, used in error messages.
    #[inline]
    pub fn access_name(&self) -> &'static str {
        match self {
            Seg::Field(_) => "field access",
            Seg::Index(_) => "index access",
            Seg::Key(_) => "key access",
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Field(name) => write!(f, ".{}", name),
            Seg::Index(i) => write!(f, "[{}]", i),
            Seg::Key(k) => write!(f, "{{{}}}", k),
        }
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Field(s)
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Field(s.to_owned())
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

impl From<Key> for Seg {
    fn from(k: Key) -> Self {
        Seg::Key(k)
    }
}

/// A complete path into a nested tree.
///
/// Paths are sequences of segments. Use the builder methods to construct
/// paths incrementally, or the [`path!`](crate::path!) macro for literals.
///
/// # Examples
///
/// ```
/// use graft::Path;
///
/// let path = Path::root().field("users").index(0).field("name");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.to_string(), "$.users[0].name");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    /// Create an empty path (root).
    #[inline]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create an empty path (alias for `new`).
    #[inline]
    pub fn root() -> Self {
        Self::new()
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Append a field segment and return self (builder pattern).
    #[inline]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.0.push(Seg::Field(name.into()));
        self
    }

    /// Append an index segment and return self (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    /// Append an associative-container key segment and return self.
    #[inline]
    pub fn key(mut self, k: impl Into<Key>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Push a segment onto the path (mutating).
    #[inline]
    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    /// Pop the last segment from the path.
    #[inline]
    pub fn pop(&mut self) -> Option<Seg> {
        self.0.pop()
    }

    /// Get the segments of this path.
    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// Check if this path is empty (root).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of segments in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the last segment.
    #[inline]
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// Join this path with another path.
    #[inline]
    pub fn join(&self, other: &Path) -> Path {
        let mut result = self.clone();
        result.0.extend(other.0.iter().cloned());
        result
    }

    /// Get the parent path (path without the last segment).
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            let mut p = self.clone();
            p.pop();
            Some(p)
        }
    }

    /// Check if this path starts with another path.
    #[inline]
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for seg in &self.0 {
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = Seg;
    type IntoIter = std::vec::IntoIter<Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Seg;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Construct a [`Path`] from a sequence of segments.
///
/// String literals become field segments and integer literals become index
/// segments. Associative-container keys need an explicit [`Seg::key`] or the
/// [`Path::key`] builder, since a bare string always means a record field.
///
/// # Examples
///
/// ```
/// use graft::path;
///
/// let p = path!("users", 0, "name");
/// assert_eq!(p.to_string(), "$.users[0].name");
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Seg::from($seg));
        )+
        p
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_construction() {
        let path = Path::root().field("users").index(0).field("name");
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], Seg::Field("users".into()));
        assert_eq!(path[1], Seg::Index(0));
        assert_eq!(path[2], Seg::Field("name".into()));
    }

    #[test]
    fn test_path_display() {
        let path = Path::root().field("users").index(0).field("name");
        assert_eq!(format!("{}", path), "$.users[0].name");
    }

    #[test]
    fn test_path_display_key_segment() {
        let path = Path::root().field("roles").key("admin");
        assert_eq!(format!("{}", path), "$.roles{admin}");
    }

    #[test]
    fn test_path_macro() {
        let p = path!("users", 0, "name");
        assert_eq!(p.len(), 3);
        assert_eq!(p[0], Seg::Field("users".into()));
        assert_eq!(p[1], Seg::Index(0));
    }

    #[test]
    fn test_path_join() {
        let base = Path::root().field("data");
        let sub = Path::root().field("items").index(0);
        let joined = base.join(&sub);
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.to_string(), "$.data.items[0]");
    }

    #[test]
    fn test_path_parent() {
        let path = Path::root().field("a").field("b");
        let parent = path.parent().unwrap();
        assert_eq!(parent.len(), 1);
        assert!(Path::root().parent().is_none());
    }

    #[test]
    fn test_path_serde() {
        let path = Path::root().field("users").index(0).key(7i64);
        let json = serde_json::to_string(&path).unwrap();
        let parsed: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(path, parsed);
    }
}
