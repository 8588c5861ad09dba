//! List: doubly-linked list of byte elements.
//!
//! Nodes live in a `SlotMap` and link to each other by generational key
//! (`LinkedSlots`). The same storage backs [`crate::ListTable`], and the
//! stack and queue adapters wrap a `List`.
//!
//! Indices may be negative and then count from the tail: `-1` is the last
//! element. Reads and removals accept `[-len, len)`; inserts accept
//! `[-(len + 1), len]`, where `-1` (like `len`) appends.

use core::fmt;
use std::io::Write;

use slotmap::{DefaultKey, SlotMap};

use crate::config::ListOptions;
use crate::error::{Error, Result};
use crate::traits::{Container, Sequence};
use crate::util::{element_index, insert_index, try_copy, write_escaped};

struct Link<T> {
    value: T,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

/// Doubly-linked storage over a slot map.
pub(crate) struct LinkedSlots<T> {
    nodes: SlotMap<DefaultKey, Link<T>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<T> LinkedSlots<T> {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn head(&self) -> Option<DefaultKey> {
        self.head
    }

    pub fn tail(&self) -> Option<DefaultKey> {
        self.tail
    }

    pub fn contains(&self, k: DefaultKey) -> bool {
        self.nodes.contains_key(k)
    }

    pub fn get(&self, k: DefaultKey) -> Option<&T> {
        self.nodes.get(k).map(|l| &l.value)
    }

    pub fn next_of(&self, k: DefaultKey) -> Option<DefaultKey> {
        self.nodes.get(k).and_then(|l| l.next)
    }

    pub fn prev_of(&self, k: DefaultKey) -> Option<DefaultKey> {
        self.nodes.get(k).and_then(|l| l.prev)
    }

    pub fn push_front(&mut self, value: T) -> DefaultKey {
        let old = self.head;
        let k = self.nodes.insert(Link {
            value,
            prev: None,
            next: old,
        });
        match old {
            Some(o) => self.nodes[o].prev = Some(k),
            None => self.tail = Some(k),
        }
        self.head = Some(k);
        k
    }

    pub fn push_back(&mut self, value: T) -> DefaultKey {
        let old = self.tail;
        let k = self.nodes.insert(Link {
            value,
            prev: old,
            next: None,
        });
        match old {
            Some(o) => self.nodes[o].next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
        k
    }

    /// Insert `value` so that it precedes `before`.
    pub fn insert_before(&mut self, before: DefaultKey, value: T) -> DefaultKey {
        let prev = self.nodes[before].prev;
        let k = self.nodes.insert(Link {
            value,
            prev,
            next: Some(before),
        });
        self.nodes[before].prev = Some(k);
        match prev {
            Some(p) => self.nodes[p].next = Some(k),
            None => self.head = Some(k),
        }
        k
    }

    pub fn remove(&mut self, k: DefaultKey) -> Option<T> {
        let link = self.nodes.remove(k)?;
        match link.prev {
            Some(p) => self.nodes[p].next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(n) => self.nodes[n].prev = link.prev,
            None => self.tail = link.prev,
        }
        Some(link.value)
    }

    /// Key of the element at position `idx`, walking from the nearer end.
    pub fn key_at(&self, idx: usize) -> Option<DefaultKey> {
        let len = self.len();
        if idx >= len {
            return None;
        }
        if idx <= len / 2 {
            let mut cur = self.head;
            for _ in 0..idx {
                cur = cur.and_then(|k| self.next_of(k));
            }
            cur
        } else {
            let mut cur = self.tail;
            for _ in 0..len - 1 - idx {
                cur = cur.and_then(|k| self.prev_of(k));
            }
            cur
        }
    }

    pub fn iter(&self) -> LinkedIter<'_, T> {
        LinkedIter {
            slots: self,
            cur: self.head,
            forward: true,
        }
    }

    pub fn iter_rev(&self) -> LinkedIter<'_, T> {
        LinkedIter {
            slots: self,
            cur: self.tail,
            forward: false,
        }
    }

    pub fn reverse(&mut self) {
        for (_, l) in self.nodes.iter_mut() {
            core::mem::swap(&mut l.prev, &mut l.next);
        }
        core::mem::swap(&mut self.head, &mut self.tail);
    }

    /// Stable sort by `cmp`; keys stay valid.
    pub fn sort_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> core::cmp::Ordering,
    {
        let mut order: Vec<DefaultKey> = self.iter().map(|(k, _)| k).collect();
        order.sort_by(|a, b| cmp(&self.nodes[*a].value, &self.nodes[*b].value));
        let mut prev = None;
        for &k in &order {
            let l = &mut self.nodes[k];
            l.prev = prev;
            l.next = None;
            if let Some(p) = prev {
                self.nodes[p].next = Some(k);
            }
            prev = Some(k);
        }
        self.head = order.first().copied();
        self.tail = order.last().copied();
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }
}

pub(crate) struct LinkedIter<'a, T> {
    slots: &'a LinkedSlots<T>,
    cur: Option<DefaultKey>,
    forward: bool,
}

impl<'a, T> Iterator for LinkedIter<'a, T> {
    type Item = (DefaultKey, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let l = &self.slots.nodes[k];
        self.cur = if self.forward { l.next } else { l.prev };
        Some((k, &l.value))
    }
}

/// Resumable head-to-tail position over `LinkedSlots`.
///
/// Remembers the element last returned and the one after it. Removing the
/// last-returned element between steps is fine: the walk continues at the
/// remembered successor, if that is still there.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Position {
    started: bool,
    last: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

impl Position {
    pub fn advance<T>(&mut self, slots: &LinkedSlots<T>) -> Option<DefaultKey> {
        let k = if !self.started {
            self.started = true;
            slots.head()
        } else if let Some(last) = self.last.filter(|&k| slots.contains(k)) {
            slots.next_of(last)
        } else {
            self.next.filter(|&k| slots.contains(k))
        };
        self.last = k;
        self.next = k.and_then(|k| slots.next_of(k));
        k
    }

    pub fn last(&self) -> Option<DefaultKey> {
        self.last
    }
}

/// Cursor for [`List::get_next`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListCursor {
    pos: Position,
}

impl ListCursor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Doubly-linked list of byte elements.
pub struct List {
    slots: LinkedSlots<Box<[u8]>>,
    data_size: usize,
    max_len: usize,
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl List {
    pub fn new() -> Self {
        Self {
            slots: LinkedSlots::new(),
            data_size: 0,
            max_len: 0,
        }
    }

    pub fn with_options(opts: ListOptions) -> Result<Self> {
        opts.validate()?;
        let mut list = Self::new();
        list.max_len = opts.max_len;
        Ok(list)
    }

    /// Cap the element count; `0` removes the cap. Existing elements are
    /// kept even when over the new cap.
    pub fn set_max_len(&mut self, max: usize) {
        self.max_len = max;
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() == 0
    }

    /// Total bytes across all elements.
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    fn admit(&self, value: &[u8]) -> Result<Box<[u8]>> {
        if self.max_len > 0 && self.len() >= self.max_len {
            return Err(Error::OutOfSpace("list is full"));
        }
        try_copy(value)
    }

    pub fn push_front(&mut self, value: &[u8]) -> Result<()> {
        let v = self.admit(value)?;
        self.data_size += v.len();
        self.slots.push_front(v);
        Ok(())
    }

    pub fn push_back(&mut self, value: &[u8]) -> Result<()> {
        let v = self.admit(value)?;
        self.data_size += v.len();
        self.slots.push_back(v);
        Ok(())
    }

    /// Insert so that the element ends up at `index`.
    pub fn insert_at(&mut self, index: isize, value: &[u8]) -> Result<()> {
        let pos = insert_index(index, self.len())?;
        let v = self.admit(value)?;
        self.data_size += v.len();
        match self.slots.key_at(pos) {
            Some(before) => {
                self.slots.insert_before(before, v);
            }
            None => {
                self.slots.push_back(v);
            }
        }
        Ok(())
    }

    pub fn front(&self) -> Option<&[u8]> {
        self.slots.head().and_then(|k| self.slots.get(k)).map(|v| &**v)
    }

    pub fn back(&self) -> Option<&[u8]> {
        self.slots.tail().and_then(|k| self.slots.get(k)).map(|v| &**v)
    }

    fn key_for(&self, index: isize) -> Result<DefaultKey> {
        let pos = element_index(index, self.len())?;
        self.slots
            .key_at(pos)
            .ok_or_else(|| Error::out_of_range(index, self.len()))
    }

    /// Borrow the element at `index`.
    pub fn get(&self, index: isize) -> Result<&[u8]> {
        let k = self.key_for(index)?;
        self.slots
            .get(k)
            .map(|v| &**v)
            .ok_or_else(|| Error::out_of_range(index, self.len()))
    }

    pub fn get_owned(&self, index: isize) -> Result<Vec<u8>> {
        self.get(index).map(<[u8]>::to_vec)
    }

    fn take(&mut self, k: DefaultKey) -> Option<Vec<u8>> {
        let v = self.slots.remove(k)?;
        self.data_size -= v.len();
        Some(v.into_vec())
    }

    pub fn pop_front(&mut self) -> Result<Vec<u8>> {
        self.slots
            .head()
            .and_then(|k| self.take(k))
            .ok_or_else(|| Error::out_of_range(0, 0))
    }

    pub fn pop_back(&mut self) -> Result<Vec<u8>> {
        self.slots
            .tail()
            .and_then(|k| self.take(k))
            .ok_or_else(|| Error::out_of_range(-1, 0))
    }

    pub fn pop_at(&mut self, index: isize) -> Result<Vec<u8>> {
        let k = self.key_for(index)?;
        let len = self.len();
        self.take(k).ok_or_else(|| Error::out_of_range(index, len))
    }

    pub fn remove_front(&mut self) -> Result<()> {
        self.pop_front().map(drop)
    }

    pub fn remove_back(&mut self) -> Result<()> {
        self.pop_back().map(drop)
    }

    pub fn remove_at(&mut self, index: isize) -> Result<()> {
        self.pop_at(index).map(drop)
    }

    /// Next element, head to tail. The list may be modified between calls;
    /// removing the element just returned does not end the walk.
    pub fn get_next(&self, cursor: &mut ListCursor) -> Option<&[u8]> {
        let k = cursor.pos.advance(&self.slots)?;
        self.slots.get(k).map(|v| &**v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.slots.iter().map(|(_, v)| &**v)
    }

    pub fn reverse(&mut self) {
        self.slots.reverse();
    }

    /// All elements concatenated head to tail.
    pub fn to_array(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data_size);
        for v in self.iter() {
            out.extend_from_slice(v);
        }
        out
    }

    /// [`List::to_array`] as text, invalid UTF-8 replaced.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_array()).into_owned()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.data_size = 0;
    }

    /// One line per element with its index and size.
    pub fn debug<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(
            out,
            "List: {} elements, {} bytes, max {}",
            self.len(),
            self.data_size,
            self.max_len
        )?;
        for (i, v) in self.iter().enumerate() {
            write!(out, "[{}] ({}) ", i, v.len())?;
            write_escaped(out, v)?;
            writeln!(out)?;
        }
        Ok(())
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl Container for List {
    fn len(&self) -> usize {
        List::len(self)
    }

    fn clear(&mut self) {
        List::clear(self)
    }
}

impl Sequence for List {
    fn push_front(&mut self, value: &[u8]) -> Result<()> {
        List::push_front(self, value)
    }

    fn push_back(&mut self, value: &[u8]) -> Result<()> {
        List::push_back(self, value)
    }

    fn insert_at(&mut self, index: isize, value: &[u8]) -> Result<()> {
        List::insert_at(self, index, value)
    }

    fn get_owned(&self, index: isize) -> Result<Vec<u8>> {
        List::get_owned(self, index)
    }

    fn pop_front(&mut self) -> Result<Vec<u8>> {
        List::pop_front(self)
    }

    fn pop_back(&mut self) -> Result<Vec<u8>> {
        List::pop_back(self)
    }

    fn pop_at(&mut self, index: isize) -> Result<Vec<u8>> {
        List::pop_at(self, index)
    }

    fn reverse(&mut self) {
        List::reverse(self)
    }

    fn to_array(&self) -> Vec<u8> {
        List::to_array(self)
    }
}
