use std::fmt;

use thiserror::Error;

/// Returned by [`BoundedBlockingQueue::try_new`](super::BoundedBlockingQueue::try_new)
/// for a zero capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("capacity must be positive")]
pub struct CapacityError;

/// A `put_timeout` that found no free slot in time. Carries the rejected item.
#[derive(Clone, PartialEq, Eq, Error)]
#[error("timed out waiting for a free slot")]
pub struct PutTimeoutError<T>(pub T);

impl<T> PutTimeoutError<T> {
    /// Gives back the item that could not be enqueued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for PutTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("PutTimeoutError(..)")
    }
}

/// A `take_timeout` that saw no element in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out waiting for an element")]
pub struct TakeTimeoutError;
