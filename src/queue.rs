mod blocking;
pub use blocking::BoundedBlockingQueue;

pub mod error;
pub use error::{CapacityError, PutTimeoutError, TakeTimeoutError};

mod future;
pub use future::{PutFuture, TakeFuture};
#[cfg(feature = "stream")]
pub use future::Takes;

mod ring;

mod waiters;

/// Non-blocking access to a bounded queue.
pub trait Queue<T> {
    /// Return `Err(value)` if the queue is full.
    fn push(&self, value: T) -> Result<(), T>;
    /// Return `None` if the queue is empty.
    fn pop(&self) -> Option<T>;
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
    /// The remaining capacity.
    fn slack(&self) -> usize {
        self.capacity() - self.len()
    }
}
