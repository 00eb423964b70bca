// Concurrency proxy: many logical cursors over one physical source.
//
// A physically backed source has exactly one position cursor. To let
// several readers address it from independent logical offsets, every
// proxied read is wrapped in: acquire the gate, save the shared cursor,
// move it to the view's position, read, restore the saved cursor on every
// exit path, release the gate. The save/read/restore sequence is atomic
// with respect to other views; acquisition order between competing views
// is whatever the gate's wakeup order provides.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::diff::progress::CancellationToken;
use crate::error::{Error, Result};
use crate::source::VirtualSource;

/// How long a cancellable acquisition sleeps between cancellation checks
/// while the gate is held by another view.
const ACQUIRE_WAIT: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// SharedSource
// ---------------------------------------------------------------------------

/// One physically shared source plus the gate serializing access to its
/// cursor. Create views with [`SharedSource::view`].
pub struct SharedSource {
    source: Arc<VirtualSource>,
    gate: Mutex<bool>,
    unlocked: Condvar,
}

impl SharedSource {
    pub fn new(source: Arc<VirtualSource>) -> Arc<Self> {
        Arc::new(Self {
            source,
            gate: Mutex::new(false),
            unlocked: Condvar::new(),
        })
    }

    /// Length of the underlying source.
    pub fn len(&self) -> i64 {
        self.source.len()
    }

    /// Whether the underlying source holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// The wrapped source. Reading it directly bypasses the gate; use
    /// views for anything concurrent.
    pub fn source(&self) -> &Arc<VirtualSource> {
        &self.source
    }

    /// A new logical cursor over the shared source, starting at 0 (or the
    /// no-data sentinel for an empty source).
    pub fn view(self: &Arc<Self>) -> SourceView {
        let position = if self.source.is_empty() { -1 } else { 0 };
        SourceView {
            shared: Arc::clone(self),
            position,
        }
    }

    fn acquire(&self) -> GateGuard<'_> {
        let mut held = self.lock_flag();
        while *held {
            held = self
                .unlocked
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *held = true;
        GateGuard { shared: self }
    }

    /// Acquire the gate unless `token` fires first. Cancellation while
    /// waiting returns `Cancelled` without acquiring; the wait sleeps on
    /// a condvar rather than spinning.
    fn acquire_cancellable(&self, token: &CancellationToken) -> Result<GateGuard<'_>> {
        let mut held = self.lock_flag();
        loop {
            token.checkpoint()?;
            if !*held {
                *held = true;
                return Ok(GateGuard { shared: self });
            }
            let (guard, _) = self
                .unlocked
                .wait_timeout(held, ACQUIRE_WAIT)
                .unwrap_or_else(PoisonError::into_inner);
            held = guard;
        }
    }

    fn lock_flag(&self) -> MutexGuard<'_, bool> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SharedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSource")
            .field("source", &self.source)
            .finish()
    }
}

/// Holds the gate until dropped; the release wakes one waiting view.
struct GateGuard<'a> {
    shared: &'a SharedSource,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        *self.shared.lock_flag() = false;
        self.shared.unlocked.notify_one();
    }
}

// ---------------------------------------------------------------------------
// SourceView
// ---------------------------------------------------------------------------

/// A logical cursor over a [`SharedSource`]. Behaves like any other
/// source: its own position, validated against the shared length.
pub struct SourceView {
    shared: Arc<SharedSource>,
    position: i64,
}

impl SourceView {
    pub fn len(&self) -> i64 {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// This view's private position.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Move this view's position. Fails with `OutOfRange` outside
    /// `[0, len)`, exactly like a direct source.
    pub fn set_position(&mut self, position: i64) -> Result<()> {
        let length = self.len();
        if position < 0 || position >= length {
            return Err(Error::OutOfRange { position, length });
        }
        self.position = position;
        Ok(())
    }

    /// Read up to `buf.len()` bytes at this view's position. Returns 0 at
    /// the end of the shared source.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let shared = Arc::clone(&self.shared);
        let _gate = shared.acquire();
        self.read_under_gate(buf)
    }

    /// Like [`SourceView::read`], but gives up with `Cancelled` if the
    /// token fires while waiting for the gate.
    pub fn read_with_cancel(
        &mut self,
        buf: &mut [u8],
        token: &CancellationToken,
    ) -> Result<usize> {
        let shared = Arc::clone(&self.shared);
        let _gate = shared.acquire_cancellable(token)?;
        self.read_under_gate(buf)
    }

    /// Read one byte at this view's position.
    pub fn read_byte(&mut self) -> Result<u8> {
        let shared = Arc::clone(&self.shared);
        let _gate = shared.acquire();
        self.read_byte_under_gate()
    }

    /// Like [`SourceView::read_byte`], but cancellable while waiting.
    pub fn read_byte_with_cancel(&mut self, token: &CancellationToken) -> Result<u8> {
        let shared = Arc::clone(&self.shared);
        let _gate = shared.acquire_cancellable(token)?;
        self.read_byte_under_gate()
    }

    fn read_under_gate(&mut self, buf: &mut [u8]) -> Result<usize> {
        let source = self.shared.source();
        if source.is_empty() {
            return Err(Error::InvalidState("read from empty source"));
        }
        if self.position >= source.len() {
            return Ok(0);
        }
        let _restore = RestorePosition::capture(source);
        source.set_position(self.position)?;
        let n = source.read(buf)?;
        self.position += n as i64;
        Ok(n)
    }

    fn read_byte_under_gate(&mut self) -> Result<u8> {
        let source = self.shared.source();
        if source.is_empty() {
            return Err(Error::InvalidState("read from empty source"));
        }
        if self.position >= source.len() {
            return Err(Error::EndOfData);
        }
        let _restore = RestorePosition::capture(source);
        source.set_position(self.position)?;
        let byte = source.read_byte()?;
        self.position += 1;
        Ok(byte)
    }
}

impl std::fmt::Debug for SourceView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceView")
            .field("position", &self.position)
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Scoped position restore
// ---------------------------------------------------------------------------

/// Restores the shared cursor on every exit path, including errors and
/// cancellation unwinds. A fully consumed source reports the one-past-end
/// position, so the restore goes through the internal raw setter rather
/// than the bounds-checked `set_position`.
struct RestorePosition<'a> {
    source: &'a VirtualSource,
    saved: i64,
}

impl<'a> RestorePosition<'a> {
    fn capture(source: &'a VirtualSource) -> Self {
        Self {
            source,
            saved: source.position(),
        }
    }
}

impl Drop for RestorePosition<'_> {
    fn drop(&mut self) {
        if self.saved >= 0 {
            self.source.restore_position(self.saved);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
