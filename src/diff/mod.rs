// Difference calculation: lockstep positional diff over virtual sources,
// observable result collections, progress/cancellation plumbing, and
// removed-range detection.

pub mod collection;
pub mod engine;
pub mod progress;
pub mod removed;

pub use collection::{CollectionEvent, CollectionObserver, SegmentCollection};
pub use engine::DifferenceEngine;
pub use progress::{CancellationToken, ProcessState, ProgressPositions, ProgressSink};
pub use removed::removed_ranges;
