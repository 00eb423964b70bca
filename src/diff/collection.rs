// Observable segment collections.
//
// Append-only, insertion-ordered sequences of segment descriptors with
// explicit observer callbacks for append and clear, so a caller can
// render live progress while a calculation runs. No global event bus;
// observers are registered directly on the collection.

use crate::source::SegmentDescriptor;

/// Notification delivered to collection observers.
#[derive(Debug)]
pub enum CollectionEvent<'a> {
    /// A descriptor was appended at `index`.
    Appended {
        index: usize,
        segment: &'a SegmentDescriptor,
    },
    /// All descriptors were removed (start of a new calculation).
    Cleared,
}

/// Observer callback registered with [`SegmentCollection::subscribe`].
pub type CollectionObserver = Box<dyn FnMut(CollectionEvent<'_>) + Send>;

/// Insertion-ordered, observable sequence of segment descriptors.
#[derive(Default)]
pub struct SegmentCollection {
    items: Vec<SegmentDescriptor>,
    observers: Vec<CollectionObserver>,
}

impl SegmentCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; it receives every subsequent append/clear.
    pub fn subscribe(&mut self, observer: CollectionObserver) {
        self.observers.push(observer);
    }

    pub fn push(&mut self, segment: SegmentDescriptor) {
        let index = self.items.len();
        self.items.push(segment);
        let segment = &self.items[index];
        for observer in &mut self.observers {
            observer(CollectionEvent::Appended { index, segment });
        }
    }

    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        for observer in &mut self.observers {
            observer(CollectionEvent::Cleared);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SegmentDescriptor> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SegmentDescriptor> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[SegmentDescriptor] {
        &self.items
    }

    /// Clone the descriptors out, e.g. to stitch them into a composed
    /// source.
    pub fn to_vec(&self) -> Vec<SegmentDescriptor> {
        self.items.clone()
    }
}

impl std::fmt::Debug for SegmentCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentCollection")
            .field("items", &self.items)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a SegmentCollection {
    type Item = &'a SegmentDescriptor;
    type IntoIter = std::slice::Iter<'a, SegmentDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
