// Removed-range detection: the byte ranges of the old version that the
// new version's segment map no longer references, i.e. truly deleted
// content. Derived by walking the old-version coverage of a finished
// result collection and emitting the gaps.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::source::{SegmentDescriptor, VirtualSource};

/// Compute the uncovered ranges of `old` given the result descriptors of
/// a calculation.
///
/// Descriptors attributed to `new` are skipped; a descriptor referencing
/// any other source fails with `InconsistentSegment` (a construction bug,
/// not a data condition). Emitted ranges reference `old` and leave the
/// mapped position unset, since a deletion has no place in the new
/// logical stream.
pub fn removed_ranges(
    result: &[SegmentDescriptor],
    old: &Arc<VirtualSource>,
    new: Option<&Arc<VirtualSource>>,
) -> Result<Vec<SegmentDescriptor>> {
    let old_len = old.len();
    if old_len == 0 {
        return Ok(Vec::new());
    }

    let mut retained: Vec<&SegmentDescriptor> = Vec::new();
    for seg in result {
        if Arc::ptr_eq(seg.source(), old) {
            retained.push(seg);
        } else if !new.is_some_and(|n| Arc::ptr_eq(seg.source(), n)) {
            return Err(Error::InconsistentSegment);
        }
    }

    if retained.is_empty() {
        // Nothing of the old version survives.
        return Ok(vec![SegmentDescriptor::new(old.clone(), 0, old_len - 1)]);
    }

    retained.sort_by_key(|seg| seg.start_in_source());

    let mut removed = Vec::new();
    let mut covered_to = -1i64; // highest old offset referenced so far
    for seg in retained {
        if seg.start_in_source() - covered_to > 1 {
            removed.push(SegmentDescriptor::new(
                old.clone(),
                covered_to + 1,
                seg.start_in_source() - 1,
            ));
        }
        covered_to = covered_to.max(seg.end_in_source());
    }
    if covered_to < old_len - 1 {
        removed.push(SegmentDescriptor::new(old.clone(), covered_to + 1, old_len - 1));
    }

    Ok(removed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
