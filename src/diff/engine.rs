// Difference engine: lockstep positional comparison of two versions.
//
// Reads old and new virtual sources byte-by-byte in lockstep, emitting
// segment descriptors that describe how to build the new version's
// logical stream from pieces of old (retained runs) plus new (inserted
// runs). This is intentionally a positional scan, not a content-addressed
// alignment search: it never looks ahead in one stream to resynchronize
// with the other, so structurally shifted content is attributed as
// insertion. Adequate for in-place edits and localized insert/delete.

use std::sync::Arc;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::source::{SegmentDescriptor, VirtualSource};

use super::collection::{CollectionObserver, SegmentCollection};
use super::progress::{CancellationToken, ProcessState, ProgressPositions, ProgressSink};
use super::removed::removed_ranges;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Computes the segment map transforming an old version into a new one.
///
/// Holds two observable collections: `result` (how to build the new
/// version) and `removed` (old-version ranges no longer referenced). Both
/// are cleared at the start of each calculation. One engine runs one
/// calculation at a time (`calculate` takes `&mut self`).
#[derive(Debug, Default)]
pub struct DifferenceEngine {
    result: SegmentCollection,
    removed: SegmentCollection,
}

impl DifferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered segment map of the new version. Concatenating the mapped
    /// ranges in order reproduces the new version exactly.
    pub fn result(&self) -> &SegmentCollection {
        &self.result
    }

    /// Old-version byte ranges absent from the new version.
    pub fn removed(&self) -> &SegmentCollection {
        &self.removed
    }

    /// Observe appends/clears on the result collection (live progress).
    pub fn observe_result(&mut self, observer: CollectionObserver) {
        self.result.subscribe(observer);
    }

    /// Observe appends/clears on the removed collection.
    pub fn observe_removed(&mut self, observer: CollectionObserver) {
        self.removed.subscribe(observer);
    }

    /// Compute the segment map from `old` to `new`.
    ///
    /// `old` is optional: absent means the file did not exist before.
    /// Progress is reported to `progress` after every byte comparison;
    /// the process-state sequence is always `Started → … → Completed` or
    /// `Started → … → Cancelled`. Cancellation leaves already-committed
    /// descriptors visible but fails the operation with `Cancelled`.
    pub fn calculate(
        &mut self,
        old: Option<&Arc<VirtualSource>>,
        new: &Arc<VirtualSource>,
        mut progress: Option<&mut dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.result.clear();
        self.removed.clear();
        report_state(&mut progress, ProcessState::Started);

        match self.run(old, new, &mut progress, cancel) {
            Ok(()) => {
                report_state(&mut progress, ProcessState::Completed);
                Ok(())
            }
            Err(Error::Cancelled) => {
                // Observers see a definitive end state before the error
                // reaches the caller.
                report_state(&mut progress, ProcessState::Cancelled);
                Err(Error::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    fn run(
        &mut self,
        old: Option<&Arc<VirtualSource>>,
        new: &Arc<VirtualSource>,
        progress: &mut Option<&mut dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let new_len = new.len();

        let old_src = match old {
            Some(src) if !src.is_empty() => src,
            // Absent or empty old: the whole new version is one insert.
            _ => {
                debug!("old version absent/empty, new={new_len}");
                if new_len > 0 {
                    self.result
                        .push(SegmentDescriptor::placed(new.clone(), 0, new_len - 1, 0));
                }
                return Ok(());
            }
        };

        // Old and new sharing one allocation share one physical cursor,
        // so the lockstep scan cannot read the two sides independently.
        // One source compared against itself is by definition identical.
        if Arc::ptr_eq(old_src, new) {
            debug!("old and new are the same source, fully retained");
            self.result
                .push(SegmentDescriptor::placed(old_src.clone(), 0, new_len - 1, 0));
            return Ok(());
        }

        let old_len = old_src.len();
        debug!("calculating segment map: old={old_len} new={new_len}");

        if new_len > 0 {
            self.scan(old_src, new, old_len, new_len, progress, cancel)?;
        }

        // Total deletion (new empty) falls out of gap detection too: no
        // result descriptor references old, so the whole range is removed.
        for seg in removed_ranges(self.result.as_slice(), old_src, Some(new))? {
            self.removed.push(seg);
        }

        debug!(
            "segment map complete: {} result, {} removed",
            self.result.len(),
            self.removed.len()
        );
        Ok(())
    }

    /// The lockstep scan over `[0, min(old_len, new_len))`, plus the
    /// inserted tail of the new version beyond that limit.
    fn scan(
        &mut self,
        old_src: &Arc<VirtualSource>,
        new_src: &Arc<VirtualSource>,
        old_len: i64,
        new_len: i64,
        progress: &mut Option<&mut dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        old_src.set_position(0)?;
        new_src.set_position(0)?;

        let limit = old_len.min(new_len);
        let mut cursor = 0i64; // start of the open run, in both versions
        let mut offset = 0i64; // scan distance past the cursor
        let mut last_matched_offset = 0i64;
        let mut open_run: Option<RunKind> = None;

        while cursor + offset < limit {
            cancel.checkpoint()?;

            let old_byte = old_src.read_byte()?;
            let new_byte = new_src.read_byte()?;
            if let Some(sink) = progress.as_deref_mut() {
                sink.positions(ProgressPositions {
                    old_raw: cursor,
                    new_raw: cursor,
                    old_adjusted: cursor + offset,
                    new_adjusted: cursor + offset,
                });
            }

            let kind = if old_byte == new_byte {
                RunKind::Retained
            } else {
                RunKind::Inserted
            };

            match open_run {
                None => {
                    open_run = Some(kind);
                    last_matched_offset = 0;
                    offset = 1;
                }
                Some(open) if open == kind => {
                    last_matched_offset = offset;
                    offset += 1;
                }
                Some(open) => {
                    // Byte class changed: close the run at the last
                    // matched offset and restart scanning from the byte
                    // just consumed, which opens the next run.
                    self.close_run(open, cursor, cursor + last_matched_offset, old_src, new_src);
                    cursor += last_matched_offset + 1;
                    open_run = Some(kind);
                    last_matched_offset = 0;
                    offset = 1;
                }
            }
        }

        // Either source exhausted: close the open run at the limit.
        if let Some(open) = open_run {
            self.close_run(open, cursor, limit - 1, old_src, new_src);
        }

        // Tail of the new version beyond the lockstep limit is one final
        // inserted run.
        if new_len > limit {
            cancel.checkpoint()?;
            self.result.push(SegmentDescriptor::placed(
                new_src.clone(),
                limit,
                new_len - 1,
                limit,
            ));
        }
        Ok(())
    }

    /// Append a closed run `[start, end]` to the result. Old and new
    /// cursors coincide in the lockstep scan, so the range is valid in
    /// either source and the mapped position equals the run start.
    fn close_run(
        &mut self,
        kind: RunKind,
        start: i64,
        end: i64,
        old_src: &Arc<VirtualSource>,
        new_src: &Arc<VirtualSource>,
    ) {
        trace!("close {kind:?} run [{start}, {end}]");
        let source = match kind {
            RunKind::Retained => old_src.clone(),
            RunKind::Inserted => new_src.clone(),
        };
        self.result
            .push(SegmentDescriptor::placed(source, start, end, start));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunKind {
    /// Bytes equal: content retained from the old version.
    Retained,
    /// Bytes differ: content inserted from the new version.
    Inserted,
}

fn report_state(progress: &mut Option<&mut dyn ProgressSink>, state: ProcessState) {
    if let Some(sink) = progress.as_deref_mut() {
        sink.process_state(state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
