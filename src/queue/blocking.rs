use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::task::Waker;
use std::time::{Duration, Instant};

use super::error::{CapacityError, PutTimeoutError, TakeTimeoutError};
use super::future::{PutFuture, TakeFuture};
use super::ring::Ring;
use super::waiters::Waiters;
use super::Queue;
use crate::trace::trace;

/// A fixed-capacity FIFO queue shared by any number of producers and consumers.
///
/// [`put`](Self::put) blocks while the queue is full and [`take`](Self::take)
/// blocks while it is empty. Every operation holds one lock for its whole
/// duration. Waiters are woken one at a time and re-check their condition
/// after waking.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use syncx::BoundedBlockingQueue;
///
/// let q = Arc::new(BoundedBlockingQueue::new(2));
///
/// let producer = {
///     let q = q.clone();
///     thread::spawn(move || {
///         for i in 0..10 {
///             q.put(i);
///         }
///     })
/// };
///
/// for i in 0..10 {
///     assert_eq!(q.take(), i);
/// }
/// producer.join().unwrap();
/// ```
pub struct BoundedBlockingQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

pub(super) struct Inner<T> {
    pub(super) ring: Ring<T>,
    /// Pending `TakeFuture`s.
    pub(super) takers: Waiters,
    /// Pending `PutFuture`s.
    pub(super) putters: Waiters,
}

impl<T> BoundedBlockingQueue<T> {
    /// Creates a queue holding at most `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be positive");

        Self {
            inner: Mutex::new(Inner {
                ring: Ring::new(capacity),
                takers: Waiters::new(),
                putters: Waiters::new(),
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Like [`new`](Self::new), but rejects a zero capacity with an error.
    pub fn try_new(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError);
        }
        Ok(Self::new(capacity))
    }

    /// Enqueues `item`, blocking while the queue is full.
    pub fn put(&self, item: T) {
        let mut inner = self.lock();

        while inner.ring.is_full() {
            trace!(capacity = inner.ring.capacity(), "put: full, waiting");
            inner = self
                .not_full
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }

        self.enqueue(inner, item);
    }

    /// Dequeues the front element, blocking while the queue is empty.
    pub fn take(&self) -> T {
        let mut inner = self.lock();

        while inner.ring.is_empty() {
            trace!("take: empty, waiting");
            inner = self
                .not_empty
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }

        self.dequeue(inner)
    }

    /// Enqueues `item` if there is a free slot, otherwise gives it back.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        let inner = self.lock();

        if inner.ring.is_full() {
            return Err(item);
        }

        self.enqueue(inner, item);
        Ok(())
    }

    /// Dequeues the front element, or returns `None` at once if there is none.
    pub fn poll(&self) -> Option<T> {
        let inner = self.lock();

        if inner.ring.is_empty() {
            return None;
        }
        Some(self.dequeue(inner))
    }

    /// Dequeues the front element only if `predicate` accepts it.
    ///
    /// Returns `None` when the queue is empty or the predicate says no; in
    /// both cases the queue is left untouched. Only the front element is
    /// ever looked at.
    ///
    /// The predicate runs under the queue lock. It must be quick, and must
    /// not touch this queue again or it will deadlock.
    pub fn compare_and_poll<F>(&self, predicate: F) -> Option<T>
    where
        F: FnOnce(&T) -> bool,
    {
        let inner = self.lock();

        if !inner.ring.front().map_or(false, predicate) {
            return None;
        }
        Some(self.dequeue(inner))
    }

    /// Enqueues `item`, waiting at most `timeout` for a free slot.
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutTimeoutError<T>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.put(item);
            return Ok(());
        };

        let mut inner = self.lock();

        while inner.ring.is_full() {
            let now = Instant::now();
            if now >= deadline {
                trace!(?timeout, "put: timed out");
                return Err(PutTimeoutError(item));
            }

            inner = self
                .not_full
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        self.enqueue(inner, item);
        Ok(())
    }

    /// Dequeues the front element, waiting at most `timeout` for one.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeTimeoutError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Ok(self.take());
        };

        let mut inner = self.lock();

        while inner.ring.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                trace!(?timeout, "take: timed out");
                return Err(TakeTimeoutError);
            }

            inner = self
                .not_empty
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        Ok(self.dequeue(inner))
    }

    /// Returns a future that enqueues `item` once a slot is free.
    ///
    /// Dropping the future before it completes cancels the put; the item is
    /// dropped with it.
    pub fn put_async(&self, item: T) -> PutFuture<'_, T> {
        PutFuture::new(self, item)
    }

    /// Returns a future that resolves to the front element once there is one.
    ///
    /// Dropping the future before it completes cancels the take without
    /// consuming anything.
    pub fn take_async(&self) -> TakeFuture<'_, T> {
        TakeFuture::new(self)
    }

    /// Returns the number of elements at the moment the lock was taken.
    ///
    /// Stale as soon as it returns if other threads use the queue.
    pub fn len(&self) -> usize {
        self.lock().ring.len()
    }

    /// The fixed maximum number of elements.
    pub fn capacity(&self) -> usize {
        self.lock().ring.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().ring.is_full()
    }

    #[inline]
    pub(super) fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item` to a ring that has room, then wakes one taker of each kind.
    pub(super) fn enqueue(&self, mut inner: MutexGuard<'_, Inner<T>>, item: T) {
        if inner.ring.push(item).is_err() {
            unreachable!("enqueue on a full ring");
        }

        let waker = inner.takers.notify_one();
        drop(inner);

        self.not_empty.notify_one();
        wake(waker);
    }

    /// Removes the front element of a non-empty ring, then wakes one putter
    /// of each kind.
    pub(super) fn dequeue(&self, mut inner: MutexGuard<'_, Inner<T>>) -> T {
        let Some(item) = inner.ring.pop() else {
            unreachable!("dequeue on an empty ring");
        };

        let waker = inner.putters.notify_one();
        drop(inner);

        self.not_full.notify_one();
        wake(waker);
        item
    }
}

impl<T: Clone> BoundedBlockingQueue<T> {
    /// Returns a copy of the front element without removing it.
    pub fn peek(&self) -> Option<T> {
        self.lock().ring.front().cloned()
    }

    /// Returns a copy of the most recently enqueued element without removing it.
    pub fn peek_last(&self) -> Option<T> {
        self.lock().ring.back().cloned()
    }

    /// Copies the current contents, front to back.
    ///
    /// The returned `Vec` shares nothing with the queue, so later puts and
    /// takes do not change it.
    pub fn readable_slice(&self) -> Vec<T> {
        let inner = self.lock();

        let mut items = Vec::with_capacity(inner.ring.len());
        items.extend(inner.ring.iter().cloned());
        items
    }
}

impl<T> Queue<T> for BoundedBlockingQueue<T> {
    #[inline]
    fn push(&self, value: T) -> Result<(), T> {
        self.try_put(value)
    }

    #[inline]
    fn pop(&self) -> Option<T> {
        self.poll()
    }

    #[inline]
    fn len(&self) -> usize {
        BoundedBlockingQueue::len(self)
    }

    #[inline]
    fn capacity(&self) -> usize {
        BoundedBlockingQueue::capacity(self)
    }
}

impl<T> fmt::Debug for BoundedBlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("BoundedBlockingQueue")
            .field("len", &inner.ring.len())
            .field("capacity", &inner.ring.capacity())
            .field("pending_takes", &inner.takers.len())
            .field("pending_puts", &inner.putters.len())
            .finish()
    }
}

#[inline]
pub(super) fn wake(waker: Option<Waker>) {
    if let Some(waker) = waker {
        waker.wake();
    }
}
