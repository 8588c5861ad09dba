//! Debug-only relock detection.
//!
//! `Synced` uses a non-recursive mutex. A thread that already holds the
//! guard and calls a locking operation again would deadlock; in debug
//! builds the owner tag turns that into a panic with a clear message. In
//! release builds this compiles to a zero-cost no-op.

#[cfg(debug_assertions)]
use core::sync::atomic::{AtomicU64, Ordering};

/// Per-lock owner tracker. Check before acquiring, mark after acquiring.
#[derive(Debug)]
pub struct LockOwner {
    #[cfg(debug_assertions)]
    owner: AtomicU64,
}

#[cfg(debug_assertions)]
fn current_thread_tag() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static TAG: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    TAG.with(|t| *t)
}

impl LockOwner {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            owner: AtomicU64::new(0),
        }
    }

    /// In debug builds, panics if the calling thread holds the lock.
    #[inline]
    pub fn check_not_held(&self) {
        #[cfg(debug_assertions)]
        {
            let me = current_thread_tag();
            assert!(
                self.owner.load(Ordering::Acquire) != me,
                "relock detected: this thread already holds the container lock"
            );
        }
    }

    /// Record the calling thread as owner until the mark is dropped.
    #[inline]
    pub fn mark(&self) -> OwnerMark<'_> {
        #[cfg(debug_assertions)]
        {
            self.owner.store(current_thread_tag(), Ordering::Release);
            OwnerMark { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            OwnerMark {
                _z: core::marker::PhantomData,
            }
        }
    }
}

impl Default for LockOwner {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII mark returned by `LockOwner::mark`.
pub struct OwnerMark<'a> {
    #[cfg(debug_assertions)]
    owner: &'a LockOwner,
    #[cfg(not(debug_assertions))]
    _z: core::marker::PhantomData<&'a ()>,
}

impl<'a> Drop for OwnerMark<'a> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.owner.store(0, Ordering::Release);
    }
}
