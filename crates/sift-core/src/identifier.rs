//! Stable hierarchical identifiers for discovered nodes.
//!
//! An [`Identifier`] is an ordered list of `(type, value)` [`Segment`]s. The
//! root identifier has no segments; every tree node's identifier extends its
//! parent's by exactly one segment.
//!
//! ## String Form
//!
//! The string form is the only persisted representation and is stable across
//! versions:
//!
//! ```text
//! [engine:sift][class:com.example.MyTest][method:test1()]
//! ```
//!
//! The delimiter characters `[`, `]`, `:` and the escape character `%` are
//! percent-encoded inside segment types and values, so distinct segment
//! sequences never serialize to the same string.
//!
//! ```
//! use sift_core::identifier::Identifier;
//!
//! let id = Identifier::root()
//!     .append("engine", "sift")
//!     .append("method", "check(a:b)");
//! assert_eq!(id.to_string(), "[engine:sift][method:check(a%3Ab)]");
//! assert_eq!(Identifier::parse(&id.to_string()).unwrap(), id);
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ============================================================================
// Segment Types
// ============================================================================

/// Segment type constants used by the resolver chain.
///
/// These strings are part of the wire format; changing one breaks identifiers
/// persisted by earlier runs.
pub mod segment_type {
    /// Root segment naming the engine that owns the tree.
    pub const ENGINE: &str = "engine";
    /// Top-level container.
    pub const CONTAINER: &str = "class";
    /// Inner container identified beneath its enclosing container.
    pub const NESTED_CONTAINER: &str = "nested-class";
    /// Ordinary test member.
    pub const TEST: &str = "method";
    /// Member producing dynamic tests at execution time.
    pub const FACTORY: &str = "test-factory";
    /// Member producing repeated invocations at execution time.
    pub const TEMPLATE: &str = "test-template";
    /// Runtime-produced test.
    pub const DYNAMIC_TEST: &str = "dynamic-test";
    /// Runtime-produced container of dynamic nodes.
    pub const DYNAMIC_CONTAINER: &str = "dynamic-container";
    /// Runtime-produced template invocation.
    pub const TEMPLATE_INVOCATION: &str = "test-template-invocation";

    /// Returns true for segment types whose nodes only exist once execution begins.
    pub fn is_runtime_only(segment_type: &str) -> bool {
        matches!(
            segment_type,
            DYNAMIC_TEST | DYNAMIC_CONTAINER | TEMPLATE_INVOCATION
        )
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error produced when parsing the string form of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The input does not follow the `[type:value]...` syntax.
    #[error("malformed identifier '{input}': {reason} at '{offending}'")]
    MalformedIdentifier {
        input: String,
        offending: String,
        reason: String,
    },
}

impl IdentifierError {
    fn malformed(input: &str, offending: &str, reason: impl Into<String>) -> Self {
        IdentifierError::MalformedIdentifier {
            input: input.to_string(),
            offending: offending.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Segment
// ============================================================================

/// One `(type, value)` pair of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    segment_type: String,
    value: String,
}

impl Segment {
    /// Create a new segment.
    pub fn new(segment_type: impl Into<String>, value: impl Into<String>) -> Self {
        Segment {
            segment_type: segment_type.into(),
            value: value.into(),
        }
    }

    /// The segment type, e.g. `class` or `method`.
    pub fn segment_type(&self) -> &str {
        &self.segment_type
    }

    /// The segment value, e.g. a container name or member signature.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Segment [type = '{}', value = '{}']",
            self.segment_type, self.value
        )
    }
}

// ============================================================================
// Identifier
// ============================================================================

/// Immutable, hierarchical node identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    segments: Vec<Segment>,
}

impl Identifier {
    /// The root identifier (zero segments).
    pub fn root() -> Self {
        Identifier::default()
    }

    /// Build an identifier from a list of segments.
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        Identifier {
            segments: segments.into_iter().collect(),
        }
    }

    /// Return a new identifier with one more segment. `self` is unchanged.
    pub fn append(&self, segment_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_segment(Segment::new(segment_type, value))
    }

    /// Return a new identifier with `segment` appended.
    pub fn append_segment(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Identifier { segments }
    }

    /// Ordered segments, root to leaf.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root identifier.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment, if any.
    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The identifier with the last segment removed, or `None` for the root.
    pub fn parent(&self) -> Option<Identifier> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Identifier {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The first `len` segments as a new identifier.
    pub fn prefix(&self, len: usize) -> Identifier {
        Identifier {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// True if `self` starts with every segment of `prefix`, in order.
    ///
    /// An identifier has itself as a prefix.
    pub fn has_prefix(&self, prefix: &Identifier) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// True if `self` lies strictly beneath `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Identifier) -> bool {
        self.segments.len() > ancestor.segments.len() && self.has_prefix(ancestor)
    }

    /// Parse the `[type:value]...` string form.
    ///
    /// The empty string parses to the root identifier.
    pub fn parse(input: &str) -> Result<Identifier, IdentifierError> {
        let mut segments = Vec::new();
        let mut rest = input;

        while !rest.is_empty() {
            let Some(body) = rest.strip_prefix('[') else {
                return Err(IdentifierError::malformed(
                    input,
                    rest,
                    "expected '[' to open a segment",
                ));
            };
            let Some(close) = body.find(']') else {
                return Err(IdentifierError::malformed(
                    input,
                    rest,
                    "segment is missing its closing ']'",
                ));
            };
            let raw = &body[..close];
            let Some((raw_type, raw_value)) = raw.split_once(':') else {
                return Err(IdentifierError::malformed(
                    input,
                    &rest[..close + 2],
                    "segment is missing the ':' separator",
                ));
            };
            if raw_type.contains('[') || raw_value.contains('[') || raw_value.contains(':') {
                return Err(IdentifierError::malformed(
                    input,
                    &rest[..close + 2],
                    "unescaped delimiter inside segment",
                ));
            }
            let segment_type = decode(raw_type)
                .ok_or_else(|| IdentifierError::malformed(input, raw_type, "invalid escape"))?;
            let value = decode(raw_value)
                .ok_or_else(|| IdentifierError::malformed(input, raw_value, "invalid escape"))?;
            segments.push(Segment {
                segment_type,
                value,
            });
            rest = &body[close + 1..];
        }

        Ok(Identifier { segments })
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(
                f,
                "[{}:{}]",
                encode(&segment.segment_type),
                encode(&segment.value)
            )?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::parse(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Identifier::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Escaping
// ============================================================================

fn encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '[' => out.push_str("%5B"),
            ']' => out.push_str("%5D"),
            ':' => out.push_str("%3A"),
            _ => out.push(c),
        }
    }
    out
}

fn decode(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let hi = chars.next()?;
        let lo = chars.next()?;
        let decoded = match (hi.to_ascii_uppercase(), lo.to_ascii_uppercase()) {
            ('2', '5') => '%',
            ('5', 'B') => '[',
            ('5', 'D') => ']',
            ('3', 'A') => ':',
            _ => return None,
        };
        out.push(decoded);
    }
    Some(out)
}

// ============================================================================
// Tests
// ============================================================================
