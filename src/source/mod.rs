// Virtual byte sources.
//
// A `VirtualSource` is a uniform byte-stream façade over exactly one
// backing strategy, chosen at construction: an in-memory buffer, a
// seekable file, an ordered segment composition, or the canonical empty
// source. All operations take `&self`; per-call cursor state lives behind
// an internal mutex so one source can be shared by many segment
// descriptors and threads. Multi-call atomicity (save/read/restore over a
// shared cursor) is the concurrency proxy's job, see `crate::shared`.

mod backing;
mod composed;
mod segment;

use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};

use backing::{Backing, MemoryBacking, StreamBacking};
use composed::ComposedBacking;

pub use segment::{SegmentDescriptor, UNMAPPED};

// ---------------------------------------------------------------------------
// VirtualSource
// ---------------------------------------------------------------------------

/// A logical byte stream stitched over one backing store.
///
/// The strategy is immutable for the source's lifetime; the only
/// post-construction mutation is appending segments to a composed source.
pub struct VirtualSource {
    state: Mutex<Backing>,
}

impl VirtualSource {
    /// The canonical "no data" source: length 0, position sentinel `-1`,
    /// every read fails with `InvalidState`.
    pub fn empty() -> Self {
        Self::with_backing(Backing::Empty)
    }

    /// Wrap an in-memory buffer. Fails with `InvalidArgument` if the
    /// buffer is empty; the empty source is [`VirtualSource::empty`].
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::InvalidArgument("empty buffer"));
        }
        Ok(Self::with_backing(Backing::Memory(MemoryBacking::new(data))))
    }

    /// Open a file as a seekable source. A zero-length file degrades to
    /// the empty strategy.
    pub fn from_file(path: &Path) -> Result<Self> {
        let length = std::fs::metadata(path)?.len() as i64;
        if length == 0 {
            return Ok(Self::empty());
        }
        Ok(Self::with_backing(Backing::Stream(StreamBacking::open(
            path, length,
        )?)))
    }

    /// Stitch an ordered, non-empty segment list into one logical stream.
    /// List order defines the stream; mapped positions are assigned
    /// cumulatively, and a preset mapped position that would leave a gap
    /// fails with `InvalidArgument`.
    pub fn from_segments(segments: Vec<SegmentDescriptor>) -> Result<Self> {
        Ok(Self::with_backing(Backing::Composed(ComposedBacking::new(
            segments,
        )?)))
    }

    fn with_backing(backing: Backing) -> Self {
        Self {
            state: Mutex::new(backing),
        }
    }

    /// Total length in bytes.
    pub fn len(&self) -> i64 {
        self.guard().len()
    }

    /// Whether the source holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current read position, or `-1` for a source with no data.
    pub fn position(&self) -> i64 {
        self.guard().position()
    }

    /// Move the read position. Fails with `OutOfRange` outside
    /// `[0, len)`; on the empty source every position is out of range.
    pub fn set_position(&self, position: i64) -> Result<()> {
        self.guard().set_position(position)
    }

    /// Read up to `buf.len()` bytes from the current position, advancing
    /// it by the number of bytes actually transferred. Returns 0 at the
    /// end of the stream.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.guard().read(buf)
    }

    /// Read one byte, advancing the position. Fails with `EndOfData` past
    /// the end, or `InvalidState` on the empty source. Seek-backed
    /// strategies amortize this through an internal read window.
    pub fn read_byte(&self) -> Result<u8> {
        self.guard().read_byte()
    }

    /// Restore a previously observed cursor value, including the
    /// one-past-end position left behind by a read that consumed the
    /// whole source. `crate::shared` uses this to put the physical
    /// cursor back exactly where it was before a proxied read.
    pub(crate) fn restore_position(&self, position: i64) {
        self.guard().restore_position(position);
    }

    /// Append segments to a composed source, extending its logical
    /// stream. Rejects a segment whose source is this composition itself
    /// (reference identity): that is the cycle-prevention point — there
    /// is no cycle detection at read time. Fails with `InvalidState` on
    /// non-composed sources.
    pub fn append_segments(
        self: &Arc<Self>,
        segments: Vec<SegmentDescriptor>,
    ) -> Result<()> {
        if segments.iter().any(|seg| Arc::ptr_eq(seg.source(), self)) {
            return Err(Error::InvalidArgument(
                "composition cannot reference itself",
            ));
        }
        match &mut *self.guard() {
            Backing::Composed(c) => c.append(segments),
            _ => Err(Error::InvalidState("not a composed source")),
        }
    }

    /// True if this is a composed source and any of its segments points
    /// at `candidate` (reference identity, not content equality).
    pub fn is_source_used(&self, candidate: &Arc<VirtualSource>) -> bool {
        match &*self.guard() {
            Backing::Composed(c) => c.uses_source(candidate),
            _ => false,
        }
    }

    /// Adapter implementing [`std::io::Read`] over this source, reading
    /// from its current position.
    pub fn reader(&self) -> SourceReader<'_> {
        SourceReader { source: self }
    }

    /// Pull-based sequential byte iterator from the current position.
    /// The hook for line-oriented consumers layered above this crate.
    pub fn bytes(self: &Arc<Self>) -> Bytes {
        Bytes {
            source: Arc::clone(self),
            finished: false,
        }
    }

    fn guard(&self) -> MutexGuard<'_, Backing> {
        // A panicked reader cannot leave the backing in a broken state
        // (buffers are immutable, positions are plain integers).
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for VirtualSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("VirtualSource").field(&*self.guard()).finish()
    }
}

// Equality is "same strategy, same content/identity"; it never performs
// byte-stream I/O. Guards are taken in address order so that concurrent
// `a == b` and `b == a` cannot deadlock.
impl PartialEq for VirtualSource {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let (first, second) = if (self as *const Self) < (other as *const Self) {
            (self, other)
        } else {
            (other, self)
        };
        let a = first.guard();
        let b = second.guard();
        *a == *b
    }
}

impl Eq for VirtualSource {}

impl Hash for VirtualSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.guard().hash(state);
    }
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// [`std::io::Read`] view over a `VirtualSource`.
pub struct SourceReader<'a> {
    source: &'a VirtualSource,
}

impl std::io::Read for SourceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.source.read(buf) {
            Ok(n) => Ok(n),
            // The empty source reports InvalidState; as an io::Read it is
            // simply an exhausted stream.
            Err(Error::InvalidState(_)) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sequential byte iterator returned by [`VirtualSource::bytes`].
pub struct Bytes {
    source: Arc<VirtualSource>,
    finished: bool,
}

impl Iterator for Bytes {
    type Item = Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.source.read_byte() {
            Ok(byte) => Some(Ok(byte)),
            Err(Error::EndOfData) | Err(Error::InvalidState(_)) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
