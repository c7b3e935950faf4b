use std::env;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use easy_parallel::Parallel;

use syncx::queue::{CapacityError, TakeTimeoutError};
use syncx::prelude::*;

/// Scales a stress count by `SYNCX_STRESS` (default 1), shrinking it under miri.
fn stress(count: usize) -> usize {
    if cfg!(miri) {
        return count / 1000;
    }
    let scale = env::var("SYNCX_STRESS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    count * scale
}

/// Waits long enough for a blocked thread to have parked.
fn settle() {
    thread::sleep(Duration::from_millis(100));
}

#[test]
fn smoke() {
    syncx::init_tracing();

    let q = BoundedBlockingQueue::new(1);

    assert_eq!(q.poll(), None);
    assert_eq!(q.len(), 0);

    q.put(7);
    assert_eq!(q.peek(), Some(7));
    assert_eq!(q.len(), 1);
    assert_eq!(q.peek_last(), Some(7));

    assert_eq!(q.take(), 7);
    assert_eq!(q.len(), 0);
}

#[test]
fn capacity() {
    let q = BoundedBlockingQueue::<usize>::new(3);
    assert_eq!(q.capacity(), 3);
    assert_eq!(Queue::slack(&q), 3);
}

#[test]
#[should_panic(expected = "capacity must be positive")]
fn zero_capacity_panics() {
    let _ = BoundedBlockingQueue::<u8>::new(0);
}

#[test]
fn try_new() {
    assert_eq!(
        BoundedBlockingQueue::<u8>::try_new(0).unwrap_err(),
        CapacityError
    );
    assert_eq!(BoundedBlockingQueue::<u8>::try_new(2).unwrap().capacity(), 2);
}

#[test]
fn len_empty_full() {
    let q = BoundedBlockingQueue::new(2);

    assert!(q.is_empty());
    assert!(!q.is_full());

    q.put(());
    assert_eq!(q.len(), 1);
    assert!(!q.is_empty());
    assert!(!q.is_full());
    assert_eq!(Queue::slack(&q), 1);

    q.put(());
    assert!(q.is_full());
    assert_eq!(Queue::slack(&q), 0);

    q.take();
    q.take();
    assert!(q.is_empty());
}

#[test]
fn fifo() {
    let q = BoundedBlockingQueue::new(5);

    for i in 1..=5 {
        q.put(i);
    }
    for i in 1..=5 {
        assert_eq!(q.take(), i);
    }
}

#[test]
fn fifo_across_wraparound() {
    let q = BoundedBlockingQueue::new(3);

    for round in 0..10 {
        q.put(round * 2);
        q.put(round * 2 + 1);
        assert_eq!(q.take(), round * 2);
        assert_eq!(q.take(), round * 2 + 1);
    }
    assert!(q.is_empty());
}

#[test]
fn put_blocks_when_full() {
    let q = Arc::new(BoundedBlockingQueue::new(3));
    let done = Arc::new(AtomicBool::new(false));

    q.put(1);
    q.put(2);
    q.put(3);

    let producer = {
        let q = q.clone();
        let done = done.clone();
        thread::spawn(move || {
            q.put(4);
            done.store(true, Ordering::SeqCst);
        })
    };

    settle();
    assert!(!done.load(Ordering::SeqCst));
    assert_eq!(q.len(), 3);

    assert_eq!(q.take(), 1);
    producer.join().unwrap();

    assert!(done.load(Ordering::SeqCst));
    assert_eq!(q.readable_slice(), vec![2, 3, 4]);
}

#[test]
fn take_wakes_on_put() {
    let q = Arc::new(BoundedBlockingQueue::new(2));

    let consumer = {
        let q = q.clone();
        thread::spawn(move || q.take())
    };

    settle();
    q.put(42);

    assert_eq!(consumer.join().unwrap(), 42);
    assert!(q.is_empty());
}

#[test]
fn poll_empty() {
    let q = BoundedBlockingQueue::<String>::new(4);

    let start = Instant::now();
    assert_eq!(q.poll(), None);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(q.len(), 0);
}

#[test]
fn poll_returns_zero_values() {
    let q = BoundedBlockingQueue::new(2);

    q.put(0);
    assert_eq!(q.poll(), Some(0));
    assert_eq!(q.poll(), None);
}

#[test]
fn try_put_full() {
    let q = BoundedBlockingQueue::new(1);

    assert_eq!(q.try_put(1), Ok(()));
    assert_eq!(q.try_put(2), Err(2));
    assert_eq!(q.readable_slice(), vec![1]);

    assert_eq!(Queue::pop(&q), Some(1));
    assert_eq!(Queue::push(&q, 3), Ok(()));
    assert_eq!(q.take(), 3);
}

#[test]
fn compare_and_poll() {
    let q = BoundedBlockingQueue::new(4);

    assert_eq!(q.compare_and_poll(|_| true), None);

    q.put(1);
    q.put(2);
    q.put(3);

    let calls = AtomicUsize::new(0);
    let rejected = q.compare_and_poll(|&x| {
        calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(x, 1);
        x == 2
    });
    assert_eq!(rejected, None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(q.len(), 3);
    assert_eq!(q.readable_slice(), vec![1, 2, 3]);

    assert_eq!(q.compare_and_poll(|&x| x == 1), Some(1));
    assert_eq!(q.readable_slice(), vec![2, 3]);
}

#[test]
fn compare_and_poll_wakes_putter() {
    let q = Arc::new(BoundedBlockingQueue::new(1));
    q.put("a");

    let producer = {
        let q = q.clone();
        thread::spawn(move || q.put("b"))
    };

    settle();
    assert_eq!(q.compare_and_poll(|s| *s == "a"), Some("a"));
    producer.join().unwrap();
    assert_eq!(q.peek(), Some("b"));
}

#[test]
fn panicking_predicate_leaves_queue_usable() {
    let q = BoundedBlockingQueue::new(2);
    q.put(1);

    let res = panic::catch_unwind(AssertUnwindSafe(|| {
        q.compare_and_poll(|_| panic!("predicate failed"));
    }));
    assert!(res.is_err());

    assert_eq!(q.len(), 1);
    q.put(2);
    assert_eq!(q.take(), 1);
    assert_eq!(q.take(), 2);
}

#[test]
fn peek_does_not_mutate() {
    let q = BoundedBlockingQueue::new(3);

    assert_eq!(q.peek(), None);
    assert_eq!(q.peek_last(), None);

    q.put('a');
    q.put('b');
    q.put('c');
    q.take();
    q.put('d');

    for _ in 0..10 {
        assert_eq!(q.peek(), Some('b'));
        assert_eq!(q.peek_last(), Some('d'));
    }
    assert_eq!(q.len(), 3);
    assert_eq!(q.readable_slice(), vec!['b', 'c', 'd']);
}

#[test]
fn snapshot_isolation() {
    let q = BoundedBlockingQueue::new(3);
    q.put(1);
    q.put(2);

    let snapshot = q.readable_slice();

    q.take();
    q.put(3);
    q.put(4);

    assert_eq!(snapshot, vec![1, 2]);
    assert_eq!(q.readable_slice(), vec![2, 3, 4]);
}

#[test]
fn put_timeout() {
    let q = BoundedBlockingQueue::new(1);
    let timeout = Duration::from_millis(50);

    assert!(q.put_timeout(1, timeout).is_ok());

    let start = Instant::now();
    let err = q.put_timeout(2, timeout).unwrap_err();
    assert!(start.elapsed() >= timeout);
    assert_eq!(err.to_string(), "timed out waiting for a free slot");
    assert_eq!(err.into_inner(), 2);

    assert_eq!(q.readable_slice(), vec![1]);
}

#[test]
fn take_timeout() {
    let q = Arc::new(BoundedBlockingQueue::<u32>::new(1));
    let timeout = Duration::from_millis(50);

    let start = Instant::now();
    assert_eq!(q.take_timeout(timeout), Err(TakeTimeoutError));
    assert!(start.elapsed() >= timeout);

    let producer = {
        let q = q.clone();
        thread::spawn(move || {
            settle();
            q.put(9);
        })
    };

    assert_eq!(q.take_timeout(Duration::from_secs(10)), Ok(9));
    producer.join().unwrap();
}

#[test]
fn dequeued_items_are_not_retained() {
    let q = BoundedBlockingQueue::new(2);
    let item = Arc::new(());

    q.put(item.clone());
    q.put(item.clone());
    assert_eq!(Arc::strong_count(&item), 3);

    drop(q.take());
    drop(q.poll());
    assert_eq!(Arc::strong_count(&item), 1);

    q.put(item.clone());
    drop(q);
    assert_eq!(Arc::strong_count(&item), 1);
}

#[test]
fn debug() {
    let q = BoundedBlockingQueue::new(4);
    q.put(1);

    let s = format!("{:?}", q);
    assert!(s.contains("len: 1"));
    assert!(s.contains("capacity: 4"));
}

#[test]
fn spsc() {
    let count = stress(100_000);

    let q = BoundedBlockingQueue::new(3);

    Parallel::new()
        .add(|| {
            for i in 0..count {
                assert_eq!(q.take(), i);
            }
            assert!(q.poll().is_none());
        })
        .add(|| {
            for i in 0..count {
                q.put(i);
            }
        })
        .run();
}

#[test]
fn mpmc() {
    const THREADS: usize = 4;

    let count = stress(25_000);

    let q = BoundedBlockingQueue::<usize>::new(3);
    let v = (0..count).map(|_| AtomicUsize::new(0)).collect::<Vec<_>>();

    Parallel::new()
        .each(0..THREADS, |_| {
            for _ in 0..count {
                let n = q.take();
                v[n].fetch_add(1, Ordering::SeqCst);
            }
        })
        .each(0..THREADS, |_| {
            for i in 0..count {
                q.put(i);
            }
        })
        .run();

    assert!(q.is_empty());
    for c in v {
        assert_eq!(c.load(Ordering::SeqCst), THREADS);
    }
}

#[test]
fn per_producer_order() {
    const THREADS: usize = 3;

    let count = stress(10_000);

    let q = BoundedBlockingQueue::<(usize, usize)>::new(4);

    Parallel::new()
        .each(0..THREADS, |t| {
            for i in 0..count {
                q.put((t, i));
            }
        })
        .add(|| {
            let mut next = [0; THREADS];
            for _ in 0..THREADS * count {
                let (t, i) = q.take();
                assert_eq!(next[t], i);
                next[t] += 1;
            }
        })
        .run();
}

#[test]
fn drops() {
    const RUNS: usize = if cfg!(miri) { 20 } else { 100 };
    const STEPS: usize = if cfg!(miri) { 100 } else { 10_000 };
    const CAPACITY: usize = 4;

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, PartialEq)]
    struct DropCounter;

    impl Drop for DropCounter {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    for _ in 0..RUNS {
        let steps = fastrand::usize(..STEPS);
        let additional = fastrand::usize(0..=CAPACITY);

        DROPS.store(0, Ordering::SeqCst);
        let q = BoundedBlockingQueue::new(CAPACITY);

        Parallel::new()
            .add(|| {
                for _ in 0..steps {
                    q.take();
                }
            })
            .add(|| {
                for _ in 0..steps {
                    q.put(DropCounter);
                }
            })
            .run();

        for _ in 0..additional {
            q.put(DropCounter);
        }

        assert_eq!(DROPS.load(Ordering::SeqCst), steps);
        drop(q);
        assert_eq!(DROPS.load(Ordering::SeqCst), steps + additional);
    }
}

#[test]
fn linearizable() {
    const THREADS: usize = 4;

    let count = stress(25_000);

    let q = BoundedBlockingQueue::new(THREADS);

    Parallel::new()
        .each(0..THREADS, |_| {
            for _ in 0..count {
                q.put(0);
                q.poll().unwrap();
            }
        })
        .run();
}
