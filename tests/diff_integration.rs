// End-to-end difference engine scenarios: segment-map computation,
// removed-range detection, and materialization of the new version by
// stitching the result back into a composed source.

use std::sync::Arc;

use segdelta::diff::{CancellationToken, DifferenceEngine, ProcessState, ProgressPositions, ProgressSink};
use segdelta::source::{SegmentDescriptor, VirtualSource};
use segdelta::Error;

fn memory(data: &[u8]) -> Arc<VirtualSource> {
    Arc::new(VirtualSource::from_bytes(data.to_vec()).unwrap())
}

fn diff(old: Option<&Arc<VirtualSource>>, new: &Arc<VirtualSource>) -> DifferenceEngine {
    let mut engine = DifferenceEngine::new();
    engine
        .calculate(old, new, None, &CancellationToken::new())
        .unwrap();
    engine
}

fn materialize(segments: Vec<SegmentDescriptor>) -> Vec<u8> {
    let stitched = VirtualSource::from_segments(segments).unwrap();
    let mut bytes = vec![0u8; stitched.len() as usize];
    let mut read = 0;
    while read < bytes.len() {
        let n = stitched.read(&mut bytes[read..]).unwrap();
        assert!(n > 0, "stitched source ended early");
        read += n;
    }
    bytes
}

#[test]
fn roundtrip_small_edit() {
    let old = memory(b"Hello, world! This is a test of the delta engine.");
    let new = memory(b"Hello, earth! This is a test of the delta engine.");
    let engine = diff(Some(&old), &new);
    assert_eq!(materialize(engine.result().to_vec()), b"Hello, earth! This is a test of the delta engine.");
}

#[test]
fn roundtrip_identical() {
    let data = b"The quick brown fox jumps over the lazy dog.";
    let old = memory(data);
    let new = memory(data);
    let engine = diff(Some(&old), &new);
    assert_eq!(materialize(engine.result().to_vec()), data);
    assert!(engine.removed().is_empty());
    // Every result descriptor is attributed to the old version.
    for seg in engine.result() {
        assert!(Arc::ptr_eq(seg.source(), &old));
    }
}

#[test]
fn roundtrip_binary_data() {
    let source: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let mut target = source.clone();
    target[100] = 0xFF;
    target[200] = 0x00;
    target[1000] = 0x42;
    let old = memory(&source);
    let new = memory(&target);
    let engine = diff(Some(&old), &new);
    assert_eq!(materialize(engine.result().to_vec()), target);
}

#[test]
fn roundtrip_append_and_truncate() {
    let old = memory(b"prefix");
    let grown = memory(b"prefix plus a tail");
    let engine = diff(Some(&old), &grown);
    assert_eq!(materialize(engine.result().to_vec()), b"prefix plus a tail");
    assert!(engine.removed().is_empty());

    let shrunk = memory(b"pre");
    let engine = diff(Some(&old), &shrunk);
    assert_eq!(materialize(engine.result().to_vec()), b"pre");
    let removed: Vec<_> = engine
        .removed()
        .iter()
        .map(|seg| (seg.start_in_source(), seg.end_in_source()))
        .collect();
    assert_eq!(removed, vec![(3, 5)]);
}

#[test]
fn old_absent_is_one_insert() {
    let new = memory(b"created from nothing");
    let engine = diff(None, &new);
    assert_eq!(engine.result().len(), 1);
    let seg = engine.result().get(0).unwrap();
    assert_eq!(seg.start_in_source(), 0);
    assert_eq!(seg.end_in_source(), new.len() - 1);
    assert_eq!(seg.mapped_position(), 0);
    assert!(engine.removed().is_empty());
}

#[test]
fn new_empty_is_total_deletion() {
    let old = memory(b"all of this goes away");
    let new = Arc::new(VirtualSource::empty());
    let engine = diff(Some(&old), &new);
    assert!(engine.result().is_empty());
    assert_eq!(engine.removed().len(), 1);
    let seg = engine.removed().get(0).unwrap();
    assert_eq!((seg.start_in_source(), seg.end_in_source()), (0, old.len() - 1));
}

#[test]
fn coverage_has_no_gaps_or_overlaps() {
    let old = memory(b"aaaa bbbb cccc dddd eeee");
    let new = memory(b"aaaa XXXX cccc dd ffff gg");
    let engine = diff(Some(&old), &new);

    let mut next_mapped = 0i64;
    for seg in engine.result() {
        assert_eq!(seg.mapped_position(), next_mapped);
        next_mapped += seg.len();
    }
    assert_eq!(next_mapped, new.len());
}

#[test]
fn file_backed_versions_diff_like_memory() {
    let dir = tempfile::tempdir().unwrap();
    let old_path = dir.path().join("v1.bin");
    let new_path = dir.path().join("v2.bin");

    let old_data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let mut new_data = old_data.clone();
    for i in (0..new_data.len()).step_by(1024) {
        new_data[i] = new_data[i].wrapping_add(7);
    }
    std::fs::write(&old_path, &old_data).unwrap();
    std::fs::write(&new_path, &new_data).unwrap();

    let old = Arc::new(VirtualSource::from_file(&old_path).unwrap());
    let new = Arc::new(VirtualSource::from_file(&new_path).unwrap());
    let engine = diff(Some(&old), &new);
    assert_eq!(materialize(engine.result().to_vec()), new_data);
}

#[test]
fn rediffing_a_materialized_version_is_fully_retained() {
    let old = memory(b"version one of the file");
    let new = memory(b"version two of the file!");
    let engine = diff(Some(&old), &new);

    // The packaging layer stitches the result into a new virtual source
    // and may later re-diff against it.
    let stitched = Arc::new(VirtualSource::from_segments(engine.result().to_vec()).unwrap());
    let same = memory(b"version two of the file!");
    let engine = diff(Some(&stitched), &same);
    assert!(engine.removed().is_empty());
    for seg in engine.result() {
        assert!(Arc::ptr_eq(seg.source(), &stitched));
    }
}

#[test]
fn progress_positions_are_monotonic() {
    #[derive(Default)]
    struct Monotonic {
        last: i64,
        states: Vec<ProcessState>,
    }
    impl ProgressSink for Monotonic {
        fn process_state(&mut self, state: ProcessState) {
            self.states.push(state);
        }
        fn positions(&mut self, positions: ProgressPositions) {
            assert!(positions.new_adjusted >= self.last);
            assert!(positions.new_raw <= positions.new_adjusted);
            self.last = positions.new_adjusted;
        }
    }

    let old = memory(&[7u8; 2000]);
    let mut target = vec![7u8; 2000];
    target[500] = 9;
    target[1500] = 9;
    let new = memory(&target);

    let mut sink = Monotonic::default();
    let mut engine = DifferenceEngine::new();
    engine
        .calculate(Some(&old), &new, Some(&mut sink), &CancellationToken::new())
        .unwrap();
    assert_eq!(sink.states, vec![ProcessState::Started, ProcessState::Completed]);
}

#[test]
fn pre_cancelled_token_fails_before_any_comparison() {
    let old = memory(b"abcdef");
    let new = memory(b"abcdef");
    let token = CancellationToken::new();
    token.cancel();
    let mut engine = DifferenceEngine::new();
    let err = engine.calculate(Some(&old), &new, None, &token).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(engine.result().is_empty());
}
