//! Fixed-capacity frame history.

use crate::params::MAX_DARTS;
use crate::state::FrameDart;

/// Up to [`MAX_DARTS`] sightings from one frame; unused entries are `None`.
pub type FrameSlots = [Option<FrameDart>; MAX_DARTS];

/// Ring of the most recent frames, overwriting the oldest once full.
///
/// Storage is allocated once at construction and indexed modulo capacity.
#[derive(Clone, Debug)]
pub struct FrameRing {
    slots: Box<[FrameSlots]>,
    /// Index the next frame is written to.
    head: usize,
    len: usize,
}

impl FrameRing {
    /// A ring holding `capacity` frames (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![[None; MAX_DARTS]; capacity.max(1)].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, frame: FrameSlots) {
        let cap = self.capacity();
        self.slots[self.head] = frame;
        self.head = (self.head + 1) % cap;
        self.len = (self.len + 1).min(cap);
    }

    pub fn clear(&mut self) {
        self.slots.fill([None; MAX_DARTS]);
        self.head = 0;
        self.len = 0;
    }

    /// Buffered frames, oldest first.
    pub fn frames(&self) -> impl Iterator<Item = &FrameSlots> + '_ {
        let cap = self.capacity();
        let start = (self.head + cap - self.len) % cap;
        (0..self.len).map(move |k| &self.slots[(start + k) % cap])
    }

    /// Every buffered sighting, oldest frame first.
    pub fn sightings(&self) -> impl Iterator<Item = &FrameDart> + '_ {
        self.frames().flat_map(|f| f.iter().flatten())
    }

    /// The most recent frame, if any.
    pub fn latest(&self) -> Option<&FrameSlots> {
        if self.len == 0 {
            return None;
        }
        let cap = self.capacity();
        Some(&self.slots[(self.head + cap - 1) % cap])
    }
}
