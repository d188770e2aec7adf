// Copyright (c) 2024 Mike Tsao

use crate::traits::OutputQueue;
use crossbeam::queue::ArrayQueue;
use delegate::delegate;
use std::sync::Arc;

/// A fixed-depth FIFO of pulse words, standing in for the hardware replay
/// queue. Clones share the same queue, so one clone can be handed to the
/// session while another is drained at the tick rate.
#[derive(Debug)]
pub struct ReplayQueue(Arc<ArrayQueue<u32>>);
impl ReplayQueue {
    /// The depth of a typical hardware transmit FIFO.
    pub const DEFAULT_CAPACITY: usize = 8;

    /// `capacity` must be nonzero.
    pub fn new(capacity: usize) -> Self {
        Self(Arc::new(ArrayQueue::new(capacity.max(1))))
    }

    delegate! {
        to self.0 {
            /// Words waiting to be replayed.
            pub fn len(&self) -> usize;
            #[allow(missing_docs)]
            pub fn is_empty(&self) -> bool;
            /// The fixed depth of the queue.
            pub fn capacity(&self) -> usize;
            /// Takes the oldest word. This is the hardware's side of the
            /// queue.
            pub fn pop(&self) -> Option<u32>;
        }
    }
}
impl Default for ReplayQueue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
impl Clone for ReplayQueue {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}
impl OutputQueue for ReplayQueue {
    fn try_put(&self, word: u32) -> bool {
        self.0.push(word).is_ok()
    }
}
