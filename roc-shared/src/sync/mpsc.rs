//! Many-producer, single-consumer intrusive queue (spec §5 "Lock-free
//! structures"), after Dmitry Vyukov's non-intrusive MPSC queue algorithm.
//! Used to hand packets from every network-reader thread to the single
//! audio/pipeline-pump thread without blocking either side.
//!
//! Wait-free for producers on architectures with an atomic exchange
//! instruction; the consumer's `pop` is lock-free (it may spin once across a
//! producer's in-flight push, per the algorithm's documented behavior).

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

struct Node<T> {
    next: AtomicPtr<Node<T>>,
    value: Option<T>,
}

/// An MPSC queue of `T`. `T: Send` because values cross thread boundaries.
pub struct MpscQueue<T> {
    head: AtomicPtr<Node<T>>,
    tail: *mut Node<T>,
}

unsafe impl<T: Send> Send for MpscQueue<T> {}
unsafe impl<T: Send> Sync for MpscQueue<T> {}

impl<T> MpscQueue<T> {
    pub fn new() -> Self {
        let stub = Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(ptr::null_mut()),
            value: None,
        }));
        Self {
            head: AtomicPtr::new(stub),
            tail: stub,
        }
    }

    /// Pushes a value. Never blocks; producers only contend with each other
    /// on a single `AtomicPtr::swap`.
    pub fn push(&self, value: T) {
        let node = Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(ptr::null_mut()),
            value: Some(value),
        }));
        let prev = self.head.swap(node, Ordering::AcqRel);
        unsafe {
            (*prev).next.store(node, Ordering::Release);
        }
    }

    /// Pops the oldest value, in push order, for the single consumer.
    ///
    /// # Safety
    /// Must only be called from one thread at a time (the queue is
    /// single-consumer; this is enforced by API convention, not the type
    /// system, matching the teacher's sans-io style of documenting rather
    /// than wrapping every invariant in a marker type).
    pub fn pop(&mut self) -> Option<T> {
        let tail = self.tail;
        let next = unsafe { (*tail).next.load(Ordering::Acquire) };
        if next.is_null() {
            return None;
        }
        let value = unsafe { (*next).value.take() };
        self.tail = next;
        unsafe {
            drop(Box::from_raw(tail));
        }
        value
    }
}

impl<T> Default for MpscQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for MpscQueue<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
        unsafe {
            drop(Box::from_raw(self.tail));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn single_producer_preserves_fifo_order() {
        let queue = Arc::new(MpscQueue::new());
        {
            let queue = queue.clone();
            let handle = thread::spawn(move || {
                for i in 0..1000 {
                    queue.push(i);
                }
            });
            handle.join().unwrap();
        }
        let mut queue = Arc::try_unwrap(queue).unwrap_or_else(|_| unreachable!());
        let mut expected = 0;
        while let Some(v) = queue.pop() {
            assert_eq!(v, expected);
            expected += 1;
        }
        assert_eq!(expected, 1000);
    }

    #[test]
    fn many_producers_preserve_each_producer_order() {
        let queue = Arc::new(MpscQueue::new());
        let mut handles = Vec::new();
        for p in 0..4 {
            let queue = queue.clone();
            handles.push(thread::spawn(move || {
                for i in 0..256 {
                    queue.push((p, i));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let mut queue = Arc::try_unwrap(queue).unwrap_or_else(|_| unreachable!());
        let mut last_seen = [-1i32; 4];
        let mut count = 0;
        while let Some((p, i)) = queue.pop() {
            assert!(i as i32 > last_seen[p]);
            last_seen[p] = i as i32;
            count += 1;
        }
        assert_eq!(count, 4 * 256);
    }
}
