//! kvkit: byte-keyed containers with one error model and one locking
//! story.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small family of containers over opaque byte keys and byte
//!   values, each with a narrow contract that can be checked on its own.
//! - Containers:
//!   - TreeTable: left-leaning red-black tree ordered by a pluggable
//!     comparator; supports min/max/nearest lookups and a cursor that
//!     survives removal of the entry it last returned.
//!   - StaticHash: fixed-capacity hash table whose whole state lives in a
//!     caller-supplied byte region (for example a shared mapping). Slots
//!     have a fixed size; long values chain into continuation slots.
//!   - HashTable: separate chaining over heap storage, growing its bucket
//!     array past a load-factor threshold.
//!   - List, Stack, Queue: a doubly linked list of byte elements and the
//!     two disciplines layered on it.
//!   - ListTable: linked key/value table allowing duplicates, with
//!     optional case-insensitive keys and text save/load.
//!   - Vector: contiguous fixed-size elements with a growth policy.
//!
//! Constraints
//! - Every fallible operation returns [`Result`] with a single [`Error`]
//!   type; callers branch on [`ErrorKind`].
//! - Linked structures keep their nodes in a `slotmap` arena. Links and
//!   cursors are generational keys, so a stale cursor is detected rather
//!   than dereferenced.
//! - StaticHash never allocates and never stores addresses; slot links
//!   are indices, so the region can be mapped at different addresses.
//! - A failed insertion leaves a container unchanged.
//!
//! Concurrency
//! - Bare containers are single-owner and mutated through `&mut self`.
//! - [`Synced`] adds a mutex for shared use. Its lock is not recursive; a
//!   thread that relocks while holding the guard panics in debug builds
//!   instead of deadlocking.
//!
//! Notes and non-goals
//! - No persistence beyond `ListTable::save`/`load`.
//! - StaticHash does no cross-process locking of its own; wrap the view
//!   or coordinate externally.
//! - Hash functions are fixed (FNV-1 for heap tables, MurmurHash3 for the
//!   static hash) so stored layouts stay stable.

pub mod config;
pub mod error;
pub mod hash;
pub mod hash_table;
pub mod list;
pub mod list_table;
pub mod queue;
mod reentrancy;
pub mod stack;
pub mod static_hash;
mod static_hash_proptest;
pub mod sync;
pub mod traits;
pub mod tree_table;
mod util;
pub mod vector;

// Public surface
pub use config::{Growth, HashTableOptions, ListOptions, TableOptions, VectorOptions, DEFAULT_BUCKETS};
pub use error::{Error, ErrorKind, Result};
pub use hash::{fnv1_32, fnv1_64, fnv1a_32, fnv1a_64, md5, md5_hex, murmur3_32};
pub use hash_table::{HashCursor, HashTable};
pub use list::{List, ListCursor};
pub use list_table::{ListTable, TableCursor};
pub use queue::Queue;
pub use stack::Stack;
pub use static_hash::{StaticEntry, StaticHash, StaticHashStats};
pub use sync::{Synced, SyncedGuard};
pub use traits::{Container, Map, OrderedMap, Sequence};
pub use tree_table::{compare_bytes, Comparator, TreeCursor, TreeTable, Violation};
pub use vector::Vector;
