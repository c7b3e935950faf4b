use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::blocking::wake;
use super::BoundedBlockingQueue;
use crate::trace::trace;

/// Future returned by [`BoundedBlockingQueue::put_async`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct PutFuture<'a, T> {
    queue: &'a BoundedBlockingQueue<T>,
    item: Option<T>,
    /// Waiter key, set while registered in `putters`.
    key: Option<usize>,
}

// `item` is never pinned.
impl<T> Unpin for PutFuture<'_, T> {}

impl<'a, T> PutFuture<'a, T> {
    pub(super) fn new(queue: &'a BoundedBlockingQueue<T>, item: T) -> Self {
        Self {
            queue,
            item: Some(item),
            key: None,
        }
    }
}

impl<T> Future for PutFuture<'_, T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let Some(item) = this.item.take() else {
            panic!("`PutFuture` polled after completion");
        };

        let mut inner = this.queue.lock();

        if inner.ring.is_full() {
            if this.key.is_none() {
                trace!("put_async: full, registering waiter");
            }
            this.key = Some(inner.putters.register(this.key, cx.waker()));
            this.item = Some(item);
            return Poll::Pending;
        }

        if let Some(key) = this.key.take() {
            inner.putters.remove(key);
        }
        this.queue.enqueue(inner, item);
        Poll::Ready(())
    }
}

impl<T> Drop for PutFuture<'_, T> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        let mut inner = self.queue.lock();

        // Woken but never completed: hand the free slot to the next putter.
        if !inner.putters.remove(key) && !inner.ring.is_full() {
            trace!("put_async: dropped after wake-up, passing it on");
            let waker = inner.putters.notify_one();
            drop(inner);
            wake(waker);
        }
    }
}

impl<T> fmt::Debug for PutFuture<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutFuture")
            .field("done", &self.item.is_none())
            .field("waiting", &self.key.is_some())
            .finish()
    }
}

/// Future returned by [`BoundedBlockingQueue::take_async`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct TakeFuture<'a, T> {
    queue: &'a BoundedBlockingQueue<T>,
    /// Waiter key, set while registered in `takers`.
    key: Option<usize>,
}

impl<'a, T> TakeFuture<'a, T> {
    pub(super) fn new(queue: &'a BoundedBlockingQueue<T>) -> Self {
        Self { queue, key: None }
    }

    fn poll_take(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        let mut inner = self.queue.lock();

        if inner.ring.is_empty() {
            if self.key.is_none() {
                trace!("take_async: empty, registering waiter");
            }
            self.key = Some(inner.takers.register(self.key, cx.waker()));
            return Poll::Pending;
        }

        if let Some(key) = self.key.take() {
            inner.takers.remove(key);
        }
        Poll::Ready(self.queue.dequeue(inner))
    }
}

impl<T> Future for TakeFuture<'_, T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().poll_take(cx)
    }
}

impl<T> Drop for TakeFuture<'_, T> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        let mut inner = self.queue.lock();

        // Woken but never completed: hand the element to the next taker.
        if !inner.takers.remove(key) && !inner.ring.is_empty() {
            trace!("take_async: dropped after wake-up, passing it on");
            let waker = inner.takers.notify_one();
            drop(inner);
            wake(waker);
        }
    }
}

impl<T> fmt::Debug for TakeFuture<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TakeFuture")
            .field("waiting", &self.key.is_some())
            .finish()
    }
}

#[cfg(feature = "stream")]
pub use stream::Takes;

#[cfg(feature = "stream")]
mod stream {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures_core::Stream;

    use super::TakeFuture;
    use crate::BoundedBlockingQueue;

    impl<T> BoundedBlockingQueue<T> {
        /// An endless stream of taken elements.
        pub fn stream(&self) -> Takes<'_, T> {
            Takes {
                next: TakeFuture::new(self),
            }
        }
    }

    /// Stream returned by [`BoundedBlockingQueue::stream`]. Never ends.
    #[derive(Debug)]
    #[must_use = "streams do nothing unless polled"]
    pub struct Takes<'a, T> {
        next: TakeFuture<'a, T>,
    }

    impl<T> Stream for Takes<'_, T> {
        type Item = T;

        fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.get_mut().next.poll_take(cx).map(Some)
        }

        fn size_hint(&self) -> (usize, Option<usize>) {
            (usize::MAX, None)
        }
    }
}
