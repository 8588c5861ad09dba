//! HashTable: separate-chaining hash map over byte keys.
//!
//! Buckets hold the head of a singly-linked chain. Nodes live in a
//! `SlotMap` and link to each other by generational key, so a cursor that
//! still names a removed node sees it as gone rather than reading whatever
//! took its place.
//!
//! Keys hash with 32-bit FNV-1; the bucket is `hash % buckets`. A miss
//! links the new node at the chain head. Iteration walks buckets in order
//! and each chain head to tail, so it is not ordered by key.

use core::fmt;
use std::io::Write;

use slotmap::{DefaultKey, SlotMap};

use crate::config::HashTableOptions;
use crate::error::{Error, Result};
use crate::hash::fnv1_32;
use crate::traits::{Container, Map};
use crate::util::{try_copy, write_escaped};

struct Node {
    hash: u32,
    key: Box<[u8]>,
    value: Box<[u8]>,
    next: Option<DefaultKey>,
}

/// Position of a [`HashTable::get_next`] traversal.
///
/// The cursor holds the bucket being walked and the key of the next node.
/// If that node is removed between calls the walk resumes at the following
/// bucket, skipping whatever else was left in the old one.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashCursor {
    bucket: usize,
    next: Option<DefaultKey>,
}

impl HashCursor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Chaining hash map.
pub struct HashTable {
    buckets: Vec<Option<DefaultKey>>,
    nodes: SlotMap<DefaultKey, Node>,
    max_load_factor: f32,
}

fn bucket_array(n: usize) -> Result<Vec<Option<DefaultKey>>> {
    let mut v = Vec::new();
    v.try_reserve_exact(n).map_err(|_| Error::OutOfMemory {
        size: n * core::mem::size_of::<Option<DefaultKey>>(),
    })?;
    v.resize(n, None);
    Ok(v)
}

impl Default for HashTable {
    fn default() -> Self {
        Self::new(0)
    }
}

impl HashTable {
    /// Table with `range` buckets (`0` selects 1024). Never grows on its own.
    pub fn new(range: usize) -> Self {
        let range = if range == 0 {
            crate::config::DEFAULT_BUCKETS
        } else {
            range
        };
        Self {
            buckets: vec![None; range],
            nodes: SlotMap::with_key(),
            max_load_factor: 0.0,
        }
    }

    pub fn with_options(opts: HashTableOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            buckets: bucket_array(opts.bucket_count())?,
            nodes: SlotMap::with_key(),
            max_load_factor: opts.max_load_factor,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current bucket count.
    pub fn buckets(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_of(&self, hash: u32) -> usize {
        hash as usize % self.buckets.len()
    }

    fn find(&self, key: &[u8]) -> Option<DefaultKey> {
        let hash = fnv1_32(key);
        let mut cur = self.buckets[self.bucket_of(hash)];
        while let Some(k) = cur {
            let n = &self.nodes[k];
            if n.hash == hash && &*n.key == key {
                return Some(k);
            }
            cur = n.next;
        }
        None
    }

    /// Insert or overwrite. On allocation failure nothing changes.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("empty key"));
        }
        let value = try_copy(value)?;
        if let Some(k) = self.find(key) {
            self.nodes[k].value = value;
            return Ok(());
        }
        let key = try_copy(key)?;
        let hash = fnv1_32(&key);
        let b = self.bucket_of(hash);
        let head = self.buckets[b];
        let k = self.nodes.insert(Node {
            hash,
            key,
            value,
            next: head,
        });
        self.buckets[b] = Some(k);
        self.maybe_grow();
        Ok(())
    }

    pub fn put_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key.as_bytes(), value.as_bytes())
    }

    pub fn put_fmt(&mut self, key: &str, args: fmt::Arguments<'_>) -> Result<()> {
        self.put(key.as_bytes(), args.to_string().as_bytes())
    }

    /// Stores the decimal text of `value`.
    pub fn put_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.put(key.as_bytes(), value.to_string().as_bytes())
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.find(key).map(|k| &*self.nodes[k].value)
    }

    pub fn get_owned(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.get(key).map(<[u8]>::to_vec).ok_or(Error::NotFound)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key.as_bytes())
            .and_then(|v| core::str::from_utf8(v).ok())
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        let text = self.get_str(key).ok_or(Error::NotFound)?;
        text.trim()
            .parse()
            .map_err(|_| Error::InvalidArgument("value is not an integer"))
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        let hash = fnv1_32(key);
        let b = self.bucket_of(hash);
        let mut prev: Option<DefaultKey> = None;
        let mut cur = self.buckets[b];
        while let Some(k) = cur {
            let n = &self.nodes[k];
            if n.hash == hash && &*n.key == key {
                let next = n.next;
                match prev {
                    Some(p) => self.nodes[p].next = next,
                    None => self.buckets[b] = next,
                }
                self.nodes.remove(k);
                return Ok(());
            }
            prev = cur;
            cur = n.next;
        }
        Err(Error::NotFound)
    }

    /// Next entry after the cursor position. Start from
    /// `HashCursor::default()`.
    pub fn get_next(&self, cursor: &mut HashCursor) -> Option<(&[u8], &[u8])> {
        loop {
            match cursor.next {
                Some(k) => match self.nodes.get(k) {
                    Some(n) if self.bucket_of(n.hash) == cursor.bucket => {
                        cursor.next = n.next;
                        if n.next.is_none() {
                            cursor.bucket += 1;
                        }
                        return Some((&n.key[..], &n.value[..]));
                    }
                    // Removed, or moved by a resize.
                    _ => {
                        cursor.next = None;
                        cursor.bucket += 1;
                    }
                },
                None => {
                    let head = *self.buckets.get(cursor.bucket)?;
                    match head {
                        Some(_) => cursor.next = head,
                        None => cursor.bucket += 1,
                    }
                }
            }
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            table: self,
            cursor: HashCursor::default(),
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.buckets.iter_mut().for_each(|b| *b = None);
    }

    /// Rehash every entry into `range` buckets (`0` selects 1024).
    pub fn resize(&mut self, range: usize) -> Result<()> {
        let range = if range == 0 {
            crate::config::DEFAULT_BUCKETS
        } else {
            range
        };
        let mut buckets = bucket_array(range)?;
        for (k, n) in self.nodes.iter_mut() {
            let b = n.hash as usize % range;
            n.next = buckets[b];
            buckets[b] = Some(k);
        }
        log::debug!(
            "hash table: resized {} -> {} buckets ({} entries)",
            self.buckets.len(),
            range,
            self.nodes.len()
        );
        self.buckets = buckets;
        Ok(())
    }

    fn maybe_grow(&mut self) {
        if self.max_load_factor <= 0.0 {
            return;
        }
        let load = self.nodes.len() as f32 / self.buckets.len() as f32;
        if load > self.max_load_factor {
            let target = self.buckets.len().saturating_mul(2);
            // Growth is an optimization; a table that cannot grow still works.
            if let Err(e) = self.resize(target) {
                log::warn!("hash table: growth to {} buckets failed: {}", target, e);
            }
        }
    }

    /// Print each non-empty bucket with its chain.
    pub fn debug<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(
            out,
            "HashTable: {} entries, {} buckets",
            self.len(),
            self.buckets.len()
        )?;
        for (b, head) in self.buckets.iter().enumerate() {
            let mut cur = *head;
            if cur.is_none() {
                continue;
            }
            write!(out, "[{}]", b)?;
            while let Some(k) = cur {
                let n = &self.nodes[k];
                out.write_all(b" ")?;
                write_escaped(out, &n.key)?;
                out.write_all(b"=")?;
                write_escaped(out, &n.value)?;
                cur = n.next;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Iterator over `(key, value)` in bucket order.
pub struct Iter<'a> {
    table: &'a HashTable,
    cursor: HashCursor,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        self.table.get_next(&mut self.cursor)
    }
}

impl<'a> IntoIterator for &'a HashTable {
    type Item = (&'a [u8], &'a [u8]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl fmt::Debug for HashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Container for HashTable {
    fn len(&self) -> usize {
        HashTable::len(self)
    }

    fn clear(&mut self) {
        HashTable::clear(self)
    }
}

impl Map for HashTable {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        HashTable::put(self, key, value)
    }

    fn get_owned(&self, key: &[u8]) -> Result<Vec<u8>> {
        HashTable::get_owned(self, key)
    }

    fn remove(&mut self, key: &[u8]) -> Result<()> {
        HashTable::remove(self, key)
    }

    fn contains_key(&self, key: &[u8]) -> bool {
        HashTable::contains_key(self, key)
    }
}
