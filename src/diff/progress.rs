// Progress reporting and cooperative cancellation for the difference
// engine. The engine consumes a `ProgressSink`; it never produces one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Process state
// ---------------------------------------------------------------------------

/// Terminal-state sequence observed by a sink is always
/// `Started → … → Completed` or `Started → … → Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Started,
    Completed,
    Cancelled,
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Cursor snapshot reported after each byte comparison: the raw cursor
/// pair at the start of the open run, and the offset-adjusted positions
/// of the byte just compared. Enables live progress over inputs of
/// unbounded size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPositions {
    pub old_raw: i64,
    pub new_raw: i64,
    pub old_adjusted: i64,
    pub new_adjusted: i64,
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Receiver for engine progress. Both methods have empty defaults so a
/// sink can subscribe to only what it renders.
pub trait ProgressSink {
    /// Process-state transition.
    fn process_state(&mut self, _state: ProcessState) {}

    /// Cursor positions after one byte comparison.
    fn positions(&mut self, _positions: ProgressPositions) {}
}

// ---------------------------------------------------------------------------
// Cancellation token
// ---------------------------------------------------------------------------

/// Cooperative cancellation signal, checked by every long-running loop at
/// each iteration boundary and by cancellable lock acquisition.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent; observed by all clones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Loop-boundary check: `Cancelled` once the signal has fired.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
