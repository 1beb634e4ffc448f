//! FIFO (First-In-First-Out) replacement policy.

use std::collections::{HashSet, VecDeque};

use crate::common::FrameId;

/// Evicts frames in the order they were first loaded, skipping pinned ones.
///
/// Index traversals touch the root on every operation; under FIFO it still
/// ages out like any other page.
#[derive(Debug, Default)]
pub struct FifoReplacer {
    /// Frames in load order (front = oldest). May contain stale ids for
    /// removed frames; `in_queue` is authoritative.
    queue: VecDeque<FrameId>,
    in_queue: HashSet<FrameId>,
    /// Frames whose pin count is 0.
    evictable: HashSet<FrameId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an access. Only the first access positions a frame.
    pub fn record_access(&mut self, frame_id: FrameId) {
        if self.in_queue.insert(frame_id) {
            self.queue.push_back(frame_id);
        }
    }

    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    /// Pick the oldest evictable frame, or `None` if every frame is pinned.
    ///
    /// Pinned frames popped while searching are re-queued at the back.
    pub fn evict(&mut self) -> Option<FrameId> {
        let mut skipped = Vec::new();
        let mut victim = None;

        while let Some(frame_id) = self.queue.pop_front() {
            if !self.in_queue.contains(&frame_id) {
                continue;
            }
            if self.evictable.remove(&frame_id) {
                self.in_queue.remove(&frame_id);
                victim = Some(frame_id);
                break;
            }
            skipped.push(frame_id);
        }

        self.queue.extend(skipped);
        victim
    }

    /// Forget a frame entirely (its page was released).
    pub fn remove(&mut self, frame_id: FrameId) {
        self.in_queue.remove(&frame_id);
        self.evictable.remove(&frame_id);
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }
}
