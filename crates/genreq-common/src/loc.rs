use std::fmt;

use rowan::{TextRange, TextSize};
use serde::{Serialize, Serializer};

/// A location in source text, or no location at all.
///
/// Requirements synthesized by the engine (conditional requirements of a
/// conformance, inherited-typealias equalities, ...) have no diagnosable
/// origin and carry [`SourceLoc::INVALID`]. Diagnostics are never emitted
/// at an invalid location.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourceLoc(Option<TextRange>);

impl SourceLoc {
    /// The location of something that has no source.
    pub const INVALID: SourceLoc = SourceLoc(None);

    /// A location covering `start..end` (byte offsets).
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "location start ({start}) must be <= end ({end})");
        SourceLoc(Some(TextRange::new(TextSize::from(start), TextSize::from(end))))
    }

    /// A zero-width location at `offset`.
    pub fn at(offset: u32) -> Self {
        SourceLoc(Some(TextRange::empty(TextSize::from(offset))))
    }

    pub fn from_range(range: TextRange) -> Self {
        SourceLoc(Some(range))
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn range(&self) -> Option<TextRange> {
        self.0
    }

    /// Start offset, if valid.
    pub fn start(&self) -> Option<u32> {
        self.0.map(|r| r.start().into())
    }

    /// Zero-width location at the end of this one.
    pub fn end_loc(&self) -> SourceLoc {
        SourceLoc(self.0.map(|r| TextRange::empty(r.end())))
    }

    /// Smallest location covering both. An invalid side is ignored.
    pub fn cover(self, other: SourceLoc) -> SourceLoc {
        match (self.0, other.0) {
            (Some(a), Some(b)) => SourceLoc(Some(a.cover(b))),
            (Some(a), None) | (None, Some(a)) => SourceLoc(Some(a)),
            (None, None) => SourceLoc::INVALID,
        }
    }
}

impl From<TextRange> for SourceLoc {
    fn from(range: TextRange) -> Self {
        SourceLoc(Some(range))
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(r) => write!(f, "{}..{}", u32::from(r.start()), u32::from(r.end())),
            None => write!(f, "<invalid>"),
        }
    }
}

// Serialized as `[start, end]` or `null`.
impl Serialize for SourceLoc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0
            .map(|r| (u32::from(r.start()), u32::from(r.end())))
            .serialize(serializer)
    }
}
