//! Thread-safe mode for any container.
//!
//! A bare container is single-owner: it is mutated through `&mut self` and
//! needs no lock. Wrapping it in [`Synced`] makes it shareable between
//! threads. Every operation on the wrapper takes the lock for its duration
//! and releases it on all paths. For multi-step work, including iteration,
//! take the guard with [`Synced::lock`] and call the container's own
//! methods through it; those never lock again.
//!
//! ```
//! use kvkit::{Synced, TreeTable};
//!
//! let shared = Synced::new(TreeTable::new());
//! shared.put(b"b", b"2").unwrap();
//! shared.put(b"a", b"1").unwrap();
//!
//! let guard = shared.lock();
//! let keys: Vec<&[u8]> = guard.iter().map(|(k, _)| k).collect();
//! assert_eq!(keys, [b"a".as_slice(), b"b".as_slice()]);
//! ```

use core::fmt;
use core::ops::{Deref, DerefMut};

use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;
use crate::reentrancy::{LockOwner, OwnerMark};
use crate::traits::{Container, Map, Sequence};

/// A container behind a mutex.
pub struct Synced<C> {
    owner: LockOwner,
    inner: Mutex<C>,
}

/// Exclusive access to the wrapped container; unlocks on drop.
pub struct SyncedGuard<'a, C> {
    // Declared first so the owner tag is cleared before the mutex unlocks.
    _mark: OwnerMark<'a>,
    guard: MutexGuard<'a, C>,
}

impl<C> Synced<C> {
    pub fn new(container: C) -> Self {
        Self {
            owner: LockOwner::new(),
            inner: Mutex::new(container),
        }
    }

    /// Block until the lock is free and return the guard.
    ///
    /// Panics in debug builds if the calling thread already holds it.
    pub fn lock(&self) -> SyncedGuard<'_, C> {
        self.owner.check_not_held();
        let guard = self.inner.lock();
        SyncedGuard {
            _mark: self.owner.mark(),
            guard,
        }
    }

    pub fn try_lock(&self) -> Option<SyncedGuard<'_, C>> {
        let guard = self.inner.try_lock()?;
        Some(SyncedGuard {
            _mark: self.owner.mark(),
            guard,
        })
    }

    /// Run `f` with the lock held.
    pub fn with<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        let mut g = self.lock();
        f(&mut g)
    }

    /// No locking needed with `&mut self`.
    pub fn get_mut(&mut self) -> &mut C {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> C {
        self.inner.into_inner()
    }
}

impl<C: Default> Default for Synced<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C> fmt::Debug for Synced<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synced")
            .field("locked", &self.inner.is_locked())
            .finish()
    }
}

impl<'a, C> Deref for SyncedGuard<'a, C> {
    type Target = C;
    fn deref(&self) -> &C {
        &self.guard
    }
}

impl<'a, C> DerefMut for SyncedGuard<'a, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.guard
    }
}

impl<C: Container> Synced<C> {
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear()
    }
}

impl<C: Map> Synced<C> {
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        Map::put(&mut *self.lock(), key, value)
    }

    pub fn put_str(&self, key: &str, value: &str) -> Result<()> {
        Map::put_str(&mut *self.lock(), key, value)
    }

    pub fn put_fmt(&self, key: &str, args: fmt::Arguments<'_>) -> Result<()> {
        Map::put_fmt(&mut *self.lock(), key, args)
    }

    pub fn get_owned(&self, key: &[u8]) -> Result<Vec<u8>> {
        Map::get_owned(&*self.lock(), key)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        Map::get_string(&*self.lock(), key)
    }

    pub fn remove(&self, key: &[u8]) -> Result<()> {
        Map::remove(&mut *self.lock(), key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        Map::contains_key(&*self.lock(), key)
    }
}

impl<C: Sequence> Synced<C> {
    pub fn push_front(&self, value: &[u8]) -> Result<()> {
        Sequence::push_front(&mut *self.lock(), value)
    }

    pub fn push_back(&self, value: &[u8]) -> Result<()> {
        Sequence::push_back(&mut *self.lock(), value)
    }

    pub fn insert_at(&self, index: isize, value: &[u8]) -> Result<()> {
        Sequence::insert_at(&mut *self.lock(), index, value)
    }

    /// Copy of the element at `index`.
    pub fn element(&self, index: isize) -> Result<Vec<u8>> {
        Sequence::get_owned(&*self.lock(), index)
    }

    pub fn pop_front(&self) -> Result<Vec<u8>> {
        Sequence::pop_front(&mut *self.lock())
    }

    pub fn pop_back(&self) -> Result<Vec<u8>> {
        Sequence::pop_back(&mut *self.lock())
    }

    pub fn pop_at(&self, index: isize) -> Result<Vec<u8>> {
        Sequence::pop_at(&mut *self.lock(), index)
    }

    pub fn remove_at(&self, index: isize) -> Result<()> {
        Sequence::remove_at(&mut *self.lock(), index)
    }

    pub fn reverse(&self) {
        Sequence::reverse(&mut *self.lock())
    }
}
