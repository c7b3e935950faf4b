use std::collections::VecDeque;
use std::fmt;
use std::task::Waker;

/// Pending futures waiting on one side of the queue, oldest first.
///
/// Lives under the queue lock. A notified entry is removed from the list, so
/// a future can tell from [`Waiters::remove`] whether it still holds a
/// wake-up that it has to pass on.
pub struct Waiters {
    next_key: usize,
    entries: VecDeque<(usize, Waker)>,
}

impl Waiters {
    pub const fn new() -> Self {
        Self {
            next_key: 0,
            entries: VecDeque::new(),
        }
    }

    /// Registers `waker`, or refreshes it if `key` is still queued.
    /// Returns the key the caller has to keep.
    pub fn register(&mut self, key: Option<usize>, waker: &Waker) -> usize {
        if let Some(key) = key {
            if let Some((_, w)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
                if !w.will_wake(waker) {
                    *w = waker.clone();
                }
                return key;
            }
        }

        let key = self.next_key;
        self.next_key = self.next_key.wrapping_add(1);
        self.entries.push_back((key, waker.clone()));
        key
    }

    /// Returns `false` if the entry was already notified.
    pub fn remove(&mut self, key: usize) -> bool {
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Dequeues the oldest waiter. The caller wakes it after unlocking.
    #[inline]
    pub fn notify_one(&mut self) -> Option<Waker> {
        self.entries.pop_front().map(|(_, waker)| waker)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for Waiters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiters")
            .field("len", &self.entries.len())
            .finish()
    }
}
