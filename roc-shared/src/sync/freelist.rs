//! CAS-based lock-free stack used as the per-pool free list (spec §5, §9
//! "Lock-free free list").
//!
//! Each node carries a reference count so a popping thread's read of
//! `node.next` stays valid even if concurrent pushers touch the head; a
//! `SHOULD_BE_ON_FREELIST` sentinel bit guards the classic ABA problem on the
//! ref count itself. Contention causes benign retries, never torn state.

use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// High bit of the refcount word: set while the node is logically owned by
/// the free list (as opposed to in use by a popper that has not yet
/// committed).
const SHOULD_BE_ON_FREELIST: usize = 1 << (usize::BITS - 1);

struct Node<T> {
    next: AtomicPtr<Node<T>>,
    refcount: AtomicUsize,
    value: T,
}

/// A lock-free LIFO free list of boxed `T` nodes.
pub struct FreeList<T> {
    head: AtomicPtr<Node<T>>,
}

unsafe impl<T: Send> Send for FreeList<T> {}
unsafe impl<T: Send> Sync for FreeList<T> {}

impl<T> FreeList<T> {
    pub fn new() -> Self {
        Self {
            head: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    /// Returns `value` to the list, to be handed out by a future `pop`.
    pub fn push(&self, value: T) {
        let node = Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(std::ptr::null_mut()),
            refcount: AtomicUsize::new(SHOULD_BE_ON_FREELIST),
            value,
        }));
        loop {
            let head = self.head.load(Ordering::Acquire);
            unsafe {
                (*node).next.store(head, Ordering::Relaxed);
            }
            if self
                .head
                .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Removes and returns a value, or `None` if the list is empty.
    pub fn pop(&self) -> Option<T> {
        loop {
            let head = self.head.load(Ordering::Acquire);
            if head.is_null() {
                return None;
            }
            // Pin the node by bumping its refcount before we dereference it,
            // so a concurrent popper that wins the CAS below can't cause us
            // to read freed memory.
            let prev_rc = unsafe { (*head).refcount.fetch_add(1, Ordering::AcqRel) };
            if prev_rc & SHOULD_BE_ON_FREELIST == 0 {
                // Lost the race: another popper already claimed this node
                // and it may already be reused. Undo our speculative pin and
                // retry from the current head.
                unsafe {
                    (*head).refcount.fetch_sub(1, Ordering::AcqRel);
                }
                continue;
            }
            let next = unsafe { (*head).next.load(Ordering::Acquire) };
            if self
                .head
                .compare_exchange_weak(head, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                unsafe {
                    (*head)
                        .refcount
                        .fetch_sub(SHOULD_BE_ON_FREELIST + 1, Ordering::AcqRel);
                    let node = Box::from_raw(head);
                    return Some(node.value);
                }
            }
            unsafe {
                (*head).refcount.fetch_sub(1, Ordering::AcqRel);
            }
        }
    }
}

impl<T> Default for FreeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for FreeList<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_then_pop_roundtrips() {
        let list = FreeList::new();
        list.push(42);
        assert_eq!(list.pop(), Some(42));
        assert_eq!(list.pop(), None);
    }

    #[test]
    fn concurrent_push_pop_preserves_all_values() {
        let list = Arc::new(FreeList::new());
        for i in 0..100 {
            list.push(i);
        }
        let mut handles = Vec::new();
        for _ in 0..4 {
            let list = list.clone();
            handles.push(thread::spawn(move || {
                let mut popped = Vec::new();
                while let Some(v) = list.pop() {
                    popped.push(v);
                }
                popped
            }));
        }
        let mut all = Vec::new();
        for h in handles {
            all.extend(h.join().unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }
}
