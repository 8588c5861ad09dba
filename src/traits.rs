//! Capability traits shared by the concrete containers.
//!
//! Code that only needs `put`/`get`/`len` can be written once against
//! [`Map`] and run over a tree table, a chaining hash table, a static hash
//! or a linked table. Values cross the trait boundary as owned copies,
//! since not every implementation can lend out a contiguous value (the
//! static hash reassembles long values from several slots).

use core::fmt;

use crate::error::{Error, Result};

/// Operations every container has.
pub trait Container {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

/// Associative container keyed by bytes.
pub trait Map: Container {
    /// Insert or replace.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Copy of the value stored under `key`.
    fn get_owned(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Remove `key`; `NotFound` if absent.
    fn remove(&mut self, key: &[u8]) -> Result<()>;

    fn contains_key(&self, key: &[u8]) -> bool {
        self.get_owned(key).is_ok()
    }

    fn put_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key.as_bytes(), value.as_bytes())
    }

    /// `put_fmt(k, format_args!("{}-{}", a, b))`.
    fn put_fmt(&mut self, key: &str, args: fmt::Arguments<'_>) -> Result<()> {
        self.put(key.as_bytes(), args.to_string().as_bytes())
    }

    /// Stores the decimal text of `value`.
    fn put_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.put(key.as_bytes(), value.to_string().as_bytes())
    }

    fn get_string(&self, key: &str) -> Result<String> {
        String::from_utf8(self.get_owned(key.as_bytes())?)
            .map_err(|_| Error::InvalidArgument("value is not valid UTF-8"))
    }

    /// Parses the stored decimal text back.
    fn get_int(&self, key: &str) -> Result<i64> {
        self.get_string(key)?
            .trim()
            .parse()
            .map_err(|_| Error::InvalidArgument("value is not an integer"))
    }
}

/// Map with key order.
pub trait OrderedMap: Map {
    fn find_min(&self) -> Option<(&[u8], &[u8])>;

    fn find_max(&self) -> Option<(&[u8], &[u8])>;

    /// Smallest key `>= key`, or the greatest key when none is.
    fn find_nearest(&self, key: &[u8]) -> Option<(&[u8], &[u8])>;
}

/// Indexable sequence of byte elements. Negative indices count from the
/// end (`-1` is the last element).
pub trait Sequence: Container {
    fn push_front(&mut self, value: &[u8]) -> Result<()>;

    fn push_back(&mut self, value: &[u8]) -> Result<()>;

    /// Insert so that the new element ends up at `index`; `-1` appends.
    fn insert_at(&mut self, index: isize, value: &[u8]) -> Result<()>;

    fn get_owned(&self, index: isize) -> Result<Vec<u8>>;

    fn pop_front(&mut self) -> Result<Vec<u8>>;

    fn pop_back(&mut self) -> Result<Vec<u8>>;

    fn pop_at(&mut self, index: isize) -> Result<Vec<u8>>;

    fn remove_at(&mut self, index: isize) -> Result<()> {
        self.pop_at(index).map(drop)
    }

    fn reverse(&mut self);

    /// All elements concatenated in order.
    fn to_array(&self) -> Vec<u8>;
}
