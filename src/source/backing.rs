// Single-store source strategies: Empty, Memory, Stream (file-backed).
//
// Each strategy gives uniform {length, position, read} semantics over one
// physical backing store. The composed strategy lives in `composed.rs`;
// the `Backing` enum here is the closed dispatch point over all four.

use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::composed::ComposedBacking;

/// Position sentinel for a source that holds no data.
pub(crate) const NO_POSITION: i64 = -1;

/// Window size for amortizing single-byte reads on seek-backed strategies.
pub(crate) const READ_WINDOW: usize = 4096;

// ---------------------------------------------------------------------------
// Backing dispatch
// ---------------------------------------------------------------------------

/// The closed set of source strategies. No open extension point: every
/// virtual source is exactly one of these for its whole lifetime.
pub(crate) enum Backing {
    Empty,
    Memory(MemoryBacking),
    Stream(StreamBacking),
    Composed(ComposedBacking),
}

impl Backing {
    pub(crate) fn len(&self) -> i64 {
        match self {
            Backing::Empty => 0,
            Backing::Memory(m) => m.len(),
            Backing::Stream(s) => s.len(),
            Backing::Composed(c) => c.len(),
        }
    }

    pub(crate) fn position(&self) -> i64 {
        match self {
            Backing::Empty => NO_POSITION,
            Backing::Memory(m) => m.position,
            Backing::Stream(s) => s.position,
            Backing::Composed(c) => c.position(),
        }
    }

    pub(crate) fn set_position(&mut self, position: i64) -> Result<()> {
        let length = self.len();
        if position < 0 || position >= length {
            return Err(Error::OutOfRange { position, length });
        }
        match self {
            Backing::Empty => unreachable!("empty source has no valid position"),
            Backing::Memory(m) => m.position = position,
            Backing::Stream(s) => s.position = position,
            Backing::Composed(c) => c.seek(position),
        }
        Ok(())
    }

    /// Raw cursor restore for the concurrency proxy. Unlike
    /// `set_position`, accepts the one-past-end position a fully
    /// consumed source reports; the caller restores only positions it
    /// previously observed.
    pub(crate) fn restore_position(&mut self, position: i64) {
        debug_assert!(position >= 0 && position <= self.len());
        match self {
            Backing::Empty => {}
            Backing::Memory(m) => m.position = position,
            Backing::Stream(s) => s.position = position,
            Backing::Composed(c) => c.seek(position),
        }
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Backing::Empty => Err(Error::InvalidState("read from empty source")),
            Backing::Memory(m) => Ok(m.read(buf)),
            Backing::Stream(s) => s.read(buf),
            Backing::Composed(c) => c.read(buf),
        }
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        match self {
            Backing::Empty => Err(Error::InvalidState("read from empty source")),
            Backing::Memory(m) => m.read_byte(),
            Backing::Stream(s) => s.read_byte(),
            Backing::Composed(c) => c.read_byte(),
        }
    }
}

// Equality is "same strategy kind, same content/identity"; it never
// performs I/O and never fails. Cross-strategy comparisons are not equal.
impl PartialEq for Backing {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Backing::Empty, Backing::Empty) => true,
            (Backing::Memory(a), Backing::Memory(b)) => a.data == b.data,
            (Backing::Stream(a), Backing::Stream(b)) => a.path == b.path,
            (Backing::Composed(a), Backing::Composed(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Backing {}

impl Hash for Backing {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Backing::Empty => 0u8.hash(state),
            Backing::Memory(m) => {
                1u8.hash(state);
                m.data.hash(state);
            }
            Backing::Stream(s) => {
                2u8.hash(state);
                s.path.hash(state);
            }
            Backing::Composed(c) => {
                3u8.hash(state);
                c.hash(state);
            }
        }
    }
}

impl std::fmt::Debug for Backing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backing::Empty => f.write_str("Empty"),
            Backing::Memory(m) => f
                .debug_struct("Memory")
                .field("len", &m.len())
                .field("position", &m.position)
                .finish(),
            Backing::Stream(s) => f
                .debug_struct("Stream")
                .field("path", &s.path)
                .field("len", &s.length)
                .field("position", &s.position)
                .finish(),
            Backing::Composed(c) => f
                .debug_struct("Composed")
                .field("segments", &c.segment_count())
                .field("len", &c.len())
                .field("position", &c.position())
                .finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Memory strategy
// ---------------------------------------------------------------------------

/// Wraps an in-memory buffer. Equality and hashing use the buffer content
/// so identical buffers compare equal regardless of allocation identity.
pub(crate) struct MemoryBacking {
    pub(crate) data: Vec<u8>,
    pub(crate) position: i64,
}

impl MemoryBacking {
    /// `data` must be non-empty; an empty buffer is represented by the
    /// Empty strategy instead.
    pub(crate) fn new(data: Vec<u8>) -> Self {
        debug_assert!(!data.is_empty());
        Self { data, position: 0 }
    }

    fn len(&self) -> i64 {
        self.data.len() as i64
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let pos = self.position as usize;
        if pos >= self.data.len() {
            return 0;
        }
        let n = buf.len().min(self.data.len() - pos);
        buf[..n].copy_from_slice(&self.data[pos..pos + n]);
        self.position += n as i64;
        n
    }

    fn read_byte(&mut self) -> Result<u8> {
        let pos = self.position as usize;
        if pos >= self.data.len() {
            return Err(Error::EndOfData);
        }
        let byte = self.data[pos];
        self.position += 1;
        Ok(byte)
    }
}

// ---------------------------------------------------------------------------
// Stream (file) strategy
// ---------------------------------------------------------------------------

/// Wraps a seekable file handle. Equality compares the opening path, not
/// the content, to avoid re-reading the file.
pub(crate) struct StreamBacking {
    pub(crate) path: PathBuf,
    file: File,
    length: i64,
    pub(crate) position: i64,
    window: ReadWindow,
}

impl StreamBacking {
    /// Open `path` for reading. The caller has already ruled out
    /// zero-length files (those degrade to the Empty strategy).
    pub(crate) fn open(path: &Path, length: i64) -> Result<Self> {
        debug_assert!(length > 0);
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            length,
            position: 0,
            window: ReadWindow::new(),
        })
    }

    fn len(&self) -> i64 {
        self.length
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.position >= self.length {
            return Ok(0);
        }
        self.file.seek(SeekFrom::Start(self.position as u64))?;
        let n = self.file.read(buf)?;
        self.position += n as i64;
        Ok(n)
    }

    fn read_byte(&mut self) -> Result<u8> {
        if self.position >= self.length {
            return Err(Error::EndOfData);
        }
        if let Some(byte) = self.window.get(self.position) {
            self.position += 1;
            return Ok(byte);
        }
        // Refill the window from the current position.
        let start = self.position;
        self.file.seek(SeekFrom::Start(start as u64))?;
        let want = READ_WINDOW.min((self.length - start) as usize);
        let mut fill = vec![0u8; want];
        let mut filled = 0;
        while filled < want {
            let n = self.file.read(&mut fill[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Err(Error::EndOfData);
        }
        fill.truncate(filled);
        self.window.refill(start, fill);
        let byte = self.window.get(start).unwrap_or_default();
        self.position += 1;
        Ok(byte)
    }
}

// ---------------------------------------------------------------------------
// Read window
// ---------------------------------------------------------------------------

/// Fixed-size window over an immutable byte store, keyed by absolute
/// offsets. Sources are read-only, so a filled window never goes stale.
pub(crate) struct ReadWindow {
    start: i64,
    data: Vec<u8>,
}

impl ReadWindow {
    pub(crate) fn new() -> Self {
        Self {
            start: 0,
            data: Vec::new(),
        }
    }

    pub(crate) fn get(&self, position: i64) -> Option<u8> {
        if position >= self.start && position < self.start + self.data.len() as i64 {
            Some(self.data[(position - self.start) as usize])
        } else {
            None
        }
    }

    pub(crate) fn refill(&mut self, start: i64, data: Vec<u8>) {
        self.start = start;
        self.data = data;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
