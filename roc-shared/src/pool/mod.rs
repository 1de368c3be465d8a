//! Fixed-size slab pool and size-tracking decorator (spec §2 component 3,
//! §5 "Resource policy"). All hot-path allocations — packets, frames,
//! buffers — go through a [`Pool`] instead of the system allocator.

mod memory_limiter;

pub use memory_limiter::MemoryLimiter;

use crate::error::{Error, Result};
use crate::sync::FreeList;
use std::mem::size_of;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Types recyclable by a [`Pool`]. Implement `reset` to clear buffers in
/// place and retain their capacity (e.g. `self.data.clear()`), so the pool
/// never re-allocates once warmed up; the default just drops and
/// reconstructs, which is fine for plain-old-data objects.
pub trait Poolable: Default {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

struct PoolShared<T> {
    free: FreeList<T>,
    limiter: Option<Arc<MemoryLimiter>>,
    object_size: usize,
}

/// A slab pool of `T`. Cloning a `Pool` is cheap (it's a handle around a
/// shared [`FreeList`]); every clone recycles into the same underlying list.
#[derive(Clone)]
pub struct Pool<T> {
    shared: Arc<PoolShared<T>>,
}

impl<T: Poolable> Pool<T> {
    pub fn new() -> Self {
        Self::with_limiter(None)
    }

    pub fn with_limiter(limiter: Option<Arc<MemoryLimiter>>) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                free: FreeList::new(),
                limiter,
                object_size: size_of::<T>(),
            }),
        }
    }

    /// Pre-populates the free list with `n` freshly constructed objects, so
    /// that the first `n` [`Pool::allocate`] calls never touch the system
    /// allocator even on first use.
    pub fn reserve(&self, n: usize) -> Result<()> {
        for _ in 0..n {
            if let Some(limiter) = &self.shared.limiter {
                if !limiter.acquire(self.shared.object_size) {
                    return Err(Error::NoMem);
                }
            }
            self.shared.free.push(T::default());
        }
        Ok(())
    }

    /// Takes an object from the free list, resetting it in place, or
    /// constructs a new one if the list is empty and the memory limiter (if
    /// any) allows it.
    pub fn allocate(&self) -> Result<Pooled<T>> {
        if let Some(mut value) = self.shared.free.pop() {
            value.reset();
            return Ok(Pooled {
                value: Some(value),
                pool: self.clone(),
            });
        }
        if let Some(limiter) = &self.shared.limiter {
            if !limiter.acquire(self.shared.object_size) {
                return Err(Error::NoMem);
            }
        }
        Ok(Pooled {
            value: Some(T::default()),
            pool: self.clone(),
        })
    }

    fn recycle(&self, value: T) {
        self.shared.free.push(value);
    }
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle to a pooled `T`. Returns its value to the owning [`Pool`]'s free
/// list on drop instead of deallocating, per spec §3 "Ownership".
pub struct Pooled<T: Poolable> {
    value: Option<T>,
    pool: Pool<T>,
}

impl<T: Poolable> Deref for Pooled<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.value.as_ref().expect("Pooled value taken before drop")
    }
}

impl<T: Poolable> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("Pooled value taken before drop")
    }
}

impl<T: Poolable> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.recycle(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Buf {
        data: Vec<u8>,
    }

    impl Poolable for Buf {
        fn reset(&mut self) {
            self.data.clear();
        }
    }

    #[test]
    fn recycles_and_retains_capacity() {
        let pool = Pool::<Buf>::new();
        let cap = {
            let mut obj = pool.allocate().unwrap();
            obj.data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
            obj.data.capacity()
        };
        let obj = pool.allocate().unwrap();
        assert!(obj.data.is_empty());
        assert!(obj.data.capacity() >= cap);
    }

    #[test]
    fn memory_limiter_denies_when_exhausted() {
        let limiter = Arc::new(MemoryLimiter::new("bufs", size_of::<Buf>()));
        let pool = Pool::<Buf>::with_limiter(Some(limiter));
        let first = pool.allocate();
        assert!(first.is_ok());
        let second = pool.allocate();
        assert!(matches!(second, Err(Error::NoMem)));
    }
}
