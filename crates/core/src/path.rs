use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The repository root. Never stored as a node, never deletable.
pub const ROOT_PATH: &str = "/";

const SEPARATOR: char = '/';

/// Errors raised while parsing a caller-supplied path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),
}

/// A normalized node path, held as an explicit segment list.
///
/// Keeping segments instead of a raw string makes ancestor walks and
/// subtree checks exact: `/ab` is never mistaken for a child of `/a`.
/// The materialized string forms (`full_path`, parent `path`, `name`)
/// are always recomputed from here on write, never trusted from input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// The root path (no segments).
    #[must_use]
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse and normalize a caller-supplied path.
    ///
    /// Redundant separators and surrounding whitespace are dropped;
    /// `.` and `..` segments are rejected rather than resolved.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        let mut segments = Vec::new();
        for raw in trimmed.split(SEPARATOR) {
            let segment = raw.trim();
            if segment.is_empty() {
                continue;
            }
            if segment == "." || segment == ".." || segment.contains('\0') {
                return Err(PathError::InvalidSegment(segment.to_owned()));
            }
            segments.push(segment.to_owned());
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The full path string, e.g. `/a/b/c.txt`. Root renders as `/`.
    #[must_use]
    pub fn full_path(&self) -> String {
        if self.is_root() {
            ROOT_PATH.to_owned()
        } else {
            format!("/{}", self.segments.join("/"))
        }
    }

    /// The basename; empty for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Parent path. The root is its own parent.
    #[must_use]
    pub fn parent(&self) -> Self {
        if self.is_root() {
            return Self::root();
        }
        Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// This path rendered as a directory prefix with a trailing
    /// separator, e.g. `/a/b/`. Root renders as `/`.
    ///
    /// Matching candidates against this prefix is boundary-safe: the
    /// trailing separator prevents `/ab` from matching under `/a`.
    #[must_use]
    pub fn dir_prefix(&self) -> String {
        if self.is_root() {
            ROOT_PATH.to_owned()
        } else {
            format!("/{}/", self.segments.join("/"))
        }
    }

    /// The materialized parent directory string stored on a node
    /// record, e.g. `/a/b/` for `/a/b/c.txt`.
    #[must_use]
    pub fn parent_dir(&self) -> String {
        self.parent().dir_prefix()
    }

    /// Append one name segment.
    pub fn join(&self, name: &str) -> Result<Self, PathError> {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(SEPARATOR)
            || trimmed.contains('\0')
        {
            return Err(PathError::InvalidSegment(name.to_owned()));
        }
        let mut segments = self.segments.clone();
        segments.push(trimmed.to_owned());
        Ok(Self { segments })
    }

    /// All strict ancestors below the root, from the top down.
    /// `/a/b/c` yields `/a`, `/a/b`.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        (1..self.segments.len())
            .map(|depth| Self {
                segments: self.segments[..depth].to_vec(),
            })
            .collect()
    }

    /// Whether `candidate` is this path itself or lies inside its
    /// subtree. Segment-wise comparison, no string-prefix pitfalls.
    #[must_use]
    pub fn matches_subtree(&self, candidate: &str) -> bool {
        candidate == self.full_path()
            || (self.is_root() && candidate.starts_with(ROOT_PATH))
            || candidate.starts_with(&self.dir_prefix())
    }

    /// Whether `other` is a strict descendant of this path.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Re-root this path from `old_root` onto `new_root`. `None` when
    /// the path does not lie under `old_root`.
    #[must_use]
    pub fn rebase(&self, old_root: &Self, new_root: &Self) -> Option<Self> {
        if self.segments.len() < old_root.segments.len()
            || self.segments[..old_root.segments.len()] != old_root.segments[..]
        {
            return None;
        }
        let mut segments = new_root.segments.clone();
        segments.extend_from_slice(&self.segments[old_root.segments.len()..]);
        Some(Self { segments })
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_path())
    }
}

impl std::str::FromStr for NodePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_redundant_separators() {
        let path = NodePath::parse("//a///b/c.txt/").unwrap();
        assert_eq!(path.full_path(), "/a/b/c.txt");
        assert_eq!(path.name(), "c.txt");
        assert_eq!(path.parent_dir(), "/a/b/");
    }

    #[test]
    fn trims_whitespace() {
        let path = NodePath::parse("  /a/ b /c  ").unwrap();
        assert_eq!(path.full_path(), "/a/b/c");
    }

    #[test]
    fn root_forms() {
        let root = NodePath::parse("/").unwrap();
        assert!(root.is_root());
        assert_eq!(root.full_path(), "/");
        assert_eq!(root.dir_prefix(), "/");
        assert!(root.parent().is_root());
        assert_eq!(root.name(), "");
    }

    #[test]
    fn rejects_empty_and_dot_segments() {
        assert_eq!(NodePath::parse(""), Err(PathError::Empty));
        assert_eq!(NodePath::parse("   "), Err(PathError::Empty));
        assert!(matches!(
            NodePath::parse("/a/../b"),
            Err(PathError::InvalidSegment(_))
        ));
        assert!(matches!(
            NodePath::parse("/./a"),
            Err(PathError::InvalidSegment(_))
        ));
    }

    #[test]
    fn ancestors_top_down() {
        let path = NodePath::parse("/a/b/c").unwrap();
        let ancestors: Vec<String> = path.ancestors().iter().map(NodePath::full_path).collect();
        assert_eq!(ancestors, vec!["/a", "/a/b"]);
        assert!(NodePath::parse("/a").unwrap().ancestors().is_empty());
    }

    #[test]
    fn subtree_match_is_boundary_safe() {
        let dir = NodePath::parse("/a").unwrap();
        assert!(dir.matches_subtree("/a"));
        assert!(dir.matches_subtree("/a/b"));
        assert!(dir.matches_subtree("/a/b/c.txt"));
        assert!(!dir.matches_subtree("/ab"));
        assert!(!dir.matches_subtree("/ab/c"));
    }

    #[test]
    fn root_matches_everything() {
        let root = NodePath::root();
        assert!(root.matches_subtree("/a"));
        assert!(root.matches_subtree("/ab/c"));
    }

    #[test]
    fn ancestor_check_is_segment_wise() {
        let a = NodePath::parse("/a").unwrap();
        let ab = NodePath::parse("/ab").unwrap();
        let a_b = NodePath::parse("/a/b").unwrap();
        assert!(a.is_ancestor_of(&a_b));
        assert!(!a.is_ancestor_of(&ab));
        assert!(!a.is_ancestor_of(&a));
    }

    #[test]
    fn rebase_moves_subpaths_between_roots() {
        let old_root = NodePath::parse("/a/b").unwrap();
        let new_root = NodePath::parse("/x").unwrap();
        let path = NodePath::parse("/a/b/c/d.txt").unwrap();
        assert_eq!(
            path.rebase(&old_root, &new_root).unwrap().full_path(),
            "/x/c/d.txt"
        );
        assert_eq!(
            old_root.rebase(&old_root, &new_root).unwrap().full_path(),
            "/x"
        );
        assert!(NodePath::parse("/ab").unwrap().rebase(&old_root, &new_root).is_none());
    }

    #[test]
    fn join_rejects_separator() {
        let dir = NodePath::parse("/a").unwrap();
        assert!(dir.join("b/c").is_err());
        assert_eq!(dir.join("b").unwrap().full_path(), "/a/b");
    }
}
