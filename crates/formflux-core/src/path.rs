#![forbid(unsafe_code)]

//! Dot-delimited paths into the form-data graph.
//!
//! A path addresses one node in the tree: `address.city`, `items.2.qty`.
//! Numeric segments index arrays; everything else keys into objects. A
//! segment may be the wildcard `*`, which is only meaningful in unresolved
//! dependency/condition expressions (see [`crate::resolver`]) — resolved
//! paths never contain it.

use std::fmt;

/// The wildcard segment used by repeated-structure expressions.
pub const WILDCARD: &str = "*";

/// A parsed dot-delimited path.
///
/// Ordering is segment-wise lexicographic, which keeps descendants adjacent
/// to their ancestor in sorted collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The empty path, addressing the root of the graph.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path. Empty input yields the root path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::root();
        }
        Self {
            segments: raw.split('.').map(str::to_string).collect(),
        }
    }

    /// Build a path from owned segments.
    #[must_use]
    pub fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// The path's segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segment at index `i`, if present.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&str> {
        self.segments.get(i).map(String::as_str)
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// `true` for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Final segment, if any.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Everything but the final segment. The root's parent is the root.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Append one segment.
    #[must_use]
    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// Append all of `other`'s segments.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// `true` if `self` is `other` or an ancestor of `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// `true` if one path is a prefix of the other (either direction).
    ///
    /// This is the condition under which a write at one path can change the
    /// value observed at the other.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// `true` if any segment is the wildcard.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| s == WILDCARD)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for Path {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let p = Path::parse("items.2.qty");
        assert_eq!(p.segments(), ["items", "2", "qty"]);
        assert_eq!(p.to_string(), "items.2.qty");
    }

    #[test]
    fn empty_string_is_root() {
        let p = Path::parse("");
        assert!(p.is_empty());
        assert_eq!(p.to_string(), "");
    }

    #[test]
    fn parent_and_last() {
        let p = Path::parse("address.city");
        assert_eq!(p.parent().to_string(), "address");
        assert_eq!(p.last(), Some("city"));
        assert_eq!(Path::root().parent(), Path::root());
    }

    #[test]
    fn join_and_concat() {
        let p = Path::parse("items.2");
        assert_eq!(p.join("qty").to_string(), "items.2.qty");
        assert_eq!(p.concat(&Path::parse("a.b")).to_string(), "items.2.a.b");
    }

    #[test]
    fn prefix_relations() {
        let parent = Path::parse("items");
        let child = Path::parse("items.2.qty");
        assert!(parent.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
        assert!(parent.is_prefix_of(&parent));
        assert!(parent.overlaps(&child));
        assert!(child.overlaps(&parent));
        assert!(!Path::parse("items.1").overlaps(&Path::parse("items.2")));
    }

    #[test]
    fn prefix_is_segment_wise_not_textual() {
        // "item" is not a prefix of "items" even though the string is.
        assert!(!Path::parse("item").is_prefix_of(&Path::parse("items")));
    }

    #[test]
    fn wildcard_detection() {
        assert!(Path::parse("items.*.qty").has_wildcard());
        assert!(!Path::parse("items.2.qty").has_wildcard());
    }
}
