// Composed-segments strategy: presents an ordered collection of segment
// descriptors, each pointing at an arbitrary source, as one contiguous
// logical byte stream.
//
// Mapped positions are assigned cumulatively at construction; a segment
// arriving with a preset mapped position that disagrees with the running
// total is a construction error (the composition would have a gap or an
// overlap). Cycle prevention is reference-identity at construction and
// append time only; there is no cycle detection at read time.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::trace;

use crate::error::{Error, Result};

use super::backing::{ReadWindow, READ_WINDOW};
use super::segment::{SegmentDescriptor, UNMAPPED};
use super::VirtualSource;

pub(crate) struct ComposedBacking {
    segments: Vec<SegmentDescriptor>,
    length: i64,
    position: i64,
    window: ReadWindow,
}

impl ComposedBacking {
    /// Build a composition from an ordered, non-empty segment list.
    /// List order defines the logical stream.
    pub(crate) fn new(segments: Vec<SegmentDescriptor>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::InvalidArgument("empty segment list"));
        }
        let mut composed = Self {
            segments: Vec::with_capacity(segments.len()),
            length: 0,
            position: 0,
            window: ReadWindow::new(),
        };
        composed.place(segments)?;
        Ok(composed)
    }

    /// Append further segments, extending the logical stream.
    pub(crate) fn append(&mut self, segments: Vec<SegmentDescriptor>) -> Result<()> {
        self.place(segments)
    }

    fn place(&mut self, segments: Vec<SegmentDescriptor>) -> Result<()> {
        for mut seg in segments {
            if seg.is_empty() {
                return Err(Error::InvalidArgument("zero-length segment in composition"));
            }
            if seg.end_in_source() >= seg.source().len() {
                return Err(Error::InvalidArgument("segment exceeds source bounds"));
            }
            let mapped = seg.mapped_position();
            if mapped != UNMAPPED && mapped != self.length {
                return Err(Error::InvalidArgument(
                    "segment map is not contiguous from zero",
                ));
            }
            seg.set_mapped_position(self.length);
            self.length += seg.len();
            self.segments.push(seg);
        }
        Ok(())
    }

    pub(crate) fn len(&self) -> i64 {
        self.length
    }

    pub(crate) fn position(&self) -> i64 {
        self.position
    }

    /// Bounds are validated by the caller.
    pub(crate) fn seek(&mut self, position: i64) {
        self.position = position;
    }

    pub(crate) fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// True if any segment's source is reference-identical to `candidate`.
    /// Used to reject compositions that would loop back into themselves.
    pub(crate) fn uses_source(&self, candidate: &Arc<VirtualSource>) -> bool {
        self.segments
            .iter()
            .any(|seg| Arc::ptr_eq(seg.source(), candidate))
    }

    /// Read into `buf` across segment boundaries: locate the segment
    /// covering the current logical position, seek its source, read as
    /// many bytes as fit both the buffer and the segment remainder, and
    /// repeat until the buffer is full or the stream ends.
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut written = 0usize;
        while written < buf.len() && self.position < self.length {
            let seg = self.covering_segment();
            let within = self.position - seg.mapped_position();
            let remaining = seg.len() - within;
            let want = (buf.len() - written).min(remaining as usize);

            let source = seg.source().clone();
            let offset = seg.start_in_source() + within;
            source.set_position(offset)?;
            let n = source.read(&mut buf[written..written + want])?;
            if n == 0 {
                return Err(Error::InvalidState(
                    "backing source ended before segment bounds",
                ));
            }
            written += n;
            self.position += n as i64;
        }
        Ok(written)
    }

    /// Single-byte reads are buffered through a fixed window refilled via
    /// the segment-read path, amortizing the per-segment lookup.
    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        if self.position >= self.length {
            return Err(Error::EndOfData);
        }
        if let Some(byte) = self.window.get(self.position) {
            self.position += 1;
            return Ok(byte);
        }
        let start = self.position;
        let want = READ_WINDOW.min((self.length - start) as usize);
        let mut fill = vec![0u8; want];
        let n = self.read(&mut fill)?;
        if n == 0 {
            return Err(Error::EndOfData);
        }
        fill.truncate(n);
        trace!("composed window refill at {start} ({n} bytes)");
        self.window.refill(start, fill);
        self.position = start + 1;
        Ok(self.window.get(start).unwrap_or_default())
    }

    /// The segment whose mapped range contains the current position.
    /// Segments are sorted by mapped position and contiguous, so a
    /// partition point lookup always lands on a covering segment.
    fn covering_segment(&self) -> SegmentDescriptor {
        let idx = self
            .segments
            .partition_point(|seg| seg.mapped_position() <= self.position);
        self.segments[idx - 1].clone()
    }
}

// Ordered combination of segment equality/hashes: two independently built
// compositions over equal descriptor sequences compare equal.
impl std::fmt::Debug for ComposedBacking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedBacking")
            .field("segments", &self.segments.len())
            .field("len", &self.length)
            .field("position", &self.position)
            .finish()
    }
}

impl PartialEq for ComposedBacking {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for ComposedBacking {}

impl Hash for ComposedBacking {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for seg in &self.segments {
            seg.hash(state);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
