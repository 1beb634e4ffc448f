//! Eviction policy for the buffer pool.
//!
//! - [`FifoReplacer`] - evicts the oldest unpinned frame

mod fifo;

pub use fifo::FifoReplacer;
