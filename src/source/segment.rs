// Segment descriptors: a contiguous byte range in a source, plus the
// position the range occupies in a composed logical stream.
//
// Descriptors share their source (reference-counted) and never close it.
// Equality deliberately ignores the mapped position so that two
// descriptors over the same range of the same source are interchangeable.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::VirtualSource;

/// Sentinel for a descriptor that has not been placed in a composition.
pub const UNMAPPED: i64 = -1;

/// A contiguous byte range `[start_in_source, end_in_source]` (inclusive)
/// within one [`VirtualSource`], optionally mapped to a position in a
/// composed logical output stream.
#[derive(Debug, Clone)]
pub struct SegmentDescriptor {
    source: Arc<VirtualSource>,
    start_in_source: i64,
    end_in_source: i64,
    mapped_position: i64,
}

impl SegmentDescriptor {
    /// Create a free-standing descriptor, not yet placed in any
    /// composition (`mapped_position` = [`UNMAPPED`]).
    pub fn new(source: Arc<VirtualSource>, start_in_source: i64, end_in_source: i64) -> Self {
        Self {
            source,
            start_in_source,
            end_in_source,
            mapped_position: UNMAPPED,
        }
    }

    /// Create a descriptor already placed at `mapped_position` in a
    /// logical output stream.
    pub fn placed(
        source: Arc<VirtualSource>,
        start_in_source: i64,
        end_in_source: i64,
        mapped_position: i64,
    ) -> Self {
        Self {
            source,
            start_in_source,
            end_in_source,
            mapped_position,
        }
    }

    /// The source this range points into.
    pub fn source(&self) -> &Arc<VirtualSource> {
        &self.source
    }

    /// Inclusive lower bound within the source.
    pub fn start_in_source(&self) -> i64 {
        self.start_in_source
    }

    /// Inclusive upper bound within the source.
    pub fn end_in_source(&self) -> i64 {
        self.end_in_source
    }

    /// Position in the composed logical stream, or [`UNMAPPED`] for a
    /// free-standing descriptor.
    pub fn mapped_position(&self) -> i64 {
        self.mapped_position
    }

    /// Byte length of the range. Invalid ranges (negative start, or end
    /// before start) have length zero rather than being an error.
    pub fn len(&self) -> i64 {
        if self.start_in_source >= 0 && self.start_in_source <= self.end_in_source {
            self.end_in_source - self.start_in_source + 1
        } else {
            0
        }
    }

    /// Whether the range contains no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn set_mapped_position(&mut self, mapped: i64) {
        self.mapped_position = mapped;
    }
}

impl PartialEq for SegmentDescriptor {
    fn eq(&self, other: &Self) -> bool {
        if self.start_in_source != other.start_in_source
            || self.end_in_source != other.end_in_source
        {
            return false;
        }
        // Identical allocation short-circuits the content comparison.
        Arc::ptr_eq(&self.source, &other.source) || self.source == other.source
    }
}

impl Eq for SegmentDescriptor {}

impl Hash for SegmentDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.start_in_source.hash(state);
        self.end_in_source.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
