use crate::error::ValidationError;
use serde::{Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Deepest heading level markdown supports
pub const MAX_HEADING_LEVEL: u8 = 6;

/// Heading level for a dotted index: `min(count('.') + 1, 6)`
pub fn heading_level(index: &str) -> u8 {
    let depth = index.matches('.').count() + 1;
    depth.min(MAX_HEADING_LEVEL as usize) as u8
}

/// A dotted-path section address such as `1.2.3`
///
/// Every segment is a positive integer written without leading zeros, so two
/// indices are equal exactly when their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionIndex {
    raw: String,
    segments: Vec<u32>,
}

impl SectionIndex {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedIndex(raw.to_string());

        if raw.is_empty() {
            return Err(malformed());
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) || part.starts_with('0')
            {
                return Err(malformed());
            }
            let value: u32 = part.parse().map_err(|_| malformed())?;
            segments.push(value);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn level(&self) -> u8 {
        heading_level(&self.raw)
    }

    pub fn parent(&self) -> Option<SectionIndex> {
        if self.segments.len() < 2 {
            return None;
        }
        let segments = self.segments[..self.segments.len() - 1].to_vec();
        let raw = segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".");
        Some(Self { raw, segments })
    }

    /// True when `self` extends `parent` by exactly one segment
    pub fn is_child_of(&self, parent: &SectionIndex) -> bool {
        self.segments.len() == parent.segments.len() + 1
            && self.segments.starts_with(&parent.segments)
    }
}

// Hash on the raw string only so lookups can borrow as `&str`
impl Hash for SectionIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Borrow<str> for SectionIndex {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl FromStr for SectionIndex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SectionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for SectionIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_formula() {
        assert_eq!(heading_level("1"), 1);
        assert_eq!(heading_level("2.1.3"), 3);
        assert_eq!(heading_level("1.1.1.1.1.1"), 6);
        assert_eq!(heading_level("1.1.1.1.1.1.1"), 6);
    }

    #[test]
    fn test_parse_valid() {
        let index = SectionIndex::parse("1.10.3").unwrap();
        assert_eq!(index.parent().unwrap().as_str(), "1.10");
        assert_eq!(index.depth(), 3);
        assert_eq!(index.level(), 3);
        assert_eq!(index.to_string(), "1.10.3");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in ["", "1.", ".1", "1..2", "a", "1.b", "0", "1.0", "01", "-1", "1 .2", "+1"] {
            assert_eq!(
                SectionIndex::parse(raw),
                Err(ValidationError::MalformedIndex(raw.to_string())),
                "expected {:?} to be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_parent_and_child_relation() {
        let parent = SectionIndex::parse("1.2").unwrap();
        let child = SectionIndex::parse("1.2.7").unwrap();
        let grandchild = SectionIndex::parse("1.2.7.1").unwrap();
        let stranger = SectionIndex::parse("2.3").unwrap();

        assert!(child.is_child_of(&parent));
        assert!(!grandchild.is_child_of(&parent));
        assert!(!stranger.is_child_of(&SectionIndex::parse("1").unwrap()));
        assert_eq!(child.parent(), Some(parent));
        assert_eq!(SectionIndex::parse("4").unwrap().parent(), None);
    }
}
