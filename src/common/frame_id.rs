//! Frame identifier type.

use std::fmt;

/// Identifies a frame slot in the buffer pool.
///
/// Frames live in a `Vec<Frame>`, so the id is a plain `usize` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }

    /// Position of this frame in the pool's frame vector.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}
