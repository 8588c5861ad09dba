//! StaticHash: a hash map whose whole state lives in caller memory.
//!
//! The region is a header followed by a fixed array of slots (see
//! [`layout`] for the byte format). Nothing is heap-allocated and nothing
//! in the region is a pointer, so the same bytes can be mapped into several
//! processes or written to a file and attached again later.
//!
//! Each key is homed at `murmur3_32(key) % max_slots`:
//! - an empty home slot receives the key directly (a *primary* slot);
//! - an occupied primary home keeps its place and the key goes to the next
//!   empty slot as a *collision* slot pointing back at the home, while the
//!   home's count grows by one;
//! - a home occupied by a slot that belongs elsewhere (a collision or a
//!   continuation) is evicted to the next empty slot first, with the links
//!   around it patched, so the new key can become primary there.
//!
//! Values longer than 32 bytes spill into *continuation* slots linked from
//! the key-bearing slot, 66 bytes each. Keys keep at most 16 bytes in the
//! slot; longer keys are compared by length, prefix and MD5.
//!
//! No locking happens here. When several processes share a region they
//! must serialize access themselves.

pub mod layout;

use core::fmt;
use std::io::Write;

use crate::error::{Error, Result};
use crate::hash::{md5, murmur3_32};
use crate::traits::{Container, Map};
use crate::util::write_escaped;

use layout::{
    region_size, Header, Slot, COUNT_COLLISION, COUNT_CONTINUATION, HEADER_SIZE, KEY_SIZE,
    LINK_END, MD5_SIZE, PAIR_SIZE, SLOT_SIZE, VALUE_SIZE,
};

/// One entry as returned by [`StaticHash::get_next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEntry {
    /// Stored key bytes: the full key, or its first 16 bytes.
    pub key: Vec<u8>,
    /// Length of the full key.
    pub key_len: usize,
    /// MD5 of the full key.
    pub key_md5: [u8; 16],
    pub value: Vec<u8>,
    /// Slot holding the entry; valid for [`StaticHash::remove_by_idx`].
    pub index: usize,
}

impl StaticEntry {
    /// True when `key` holds only a prefix of the full key.
    pub fn is_key_truncated(&self) -> bool {
        self.key_len > self.key.len()
    }
}

/// Header counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHashStats {
    pub num_keys: usize,
    pub max_slots: usize,
    pub used_slots: usize,
}

/// Hash map view over a caller-owned byte region.
pub struct StaticHash<'a> {
    mem: &'a mut [u8],
    max: usize,
}

fn slots_for(value_len: usize) -> usize {
    1 + value_len.saturating_sub(VALUE_SIZE).div_ceil(PAIR_SIZE)
}

impl<'a> StaticHash<'a> {
    /// Bytes needed for a region of `max_slots` slots.
    pub const fn calculate_memsize(max_slots: usize) -> usize {
        region_size(max_slots)
    }

    /// Initialize when `memsize > 0` (using the first `memsize` bytes of
    /// `mem`), attach to an existing region when it is 0.
    pub fn create(mem: &'a mut [u8], memsize: usize) -> Result<Self> {
        if memsize == 0 {
            return Self::attach(mem);
        }
        if memsize > mem.len() {
            return Err(Error::InvalidArgument("memsize exceeds the region"));
        }
        Self::init(&mut mem[..memsize])
    }

    /// Format `mem` as an empty table using as many slots as fit.
    pub fn init(mem: &'a mut [u8]) -> Result<Self> {
        if mem.len() < region_size(1) {
            return Err(Error::InvalidArgument("region too small for one slot"));
        }
        let max = ((mem.len() - HEADER_SIZE) / SLOT_SIZE).min(i32::MAX as usize);
        mem[..region_size(max)].fill(0);
        Header {
            max_slots: max as i32,
            used_slots: 0,
            num_keys: 0,
        }
        .write(mem);
        log::debug!("static hash: initialized {} slots in {} bytes", max, mem.len());
        Ok(Self { mem, max })
    }

    /// Attach to a region formatted earlier by [`StaticHash::init`].
    pub fn attach(mem: &'a mut [u8]) -> Result<Self> {
        if mem.len() < HEADER_SIZE {
            return Err(Error::layout("region shorter than the header"));
        }
        let h = Header::read(mem);
        if h.max_slots <= 0 {
            return Err(Error::layout(format!("bad max_slots {}", h.max_slots)));
        }
        let max = h.max_slots as usize;
        if region_size(max) > mem.len() {
            return Err(Error::layout(format!(
                "{} slots need {} bytes, region has {}",
                max,
                region_size(max),
                mem.len()
            )));
        }
        if h.used_slots < 0 || h.used_slots as usize > max {
            return Err(Error::layout(format!("bad used_slots {}", h.used_slots)));
        }
        if h.num_keys < 0 || h.num_keys > h.used_slots {
            return Err(Error::layout(format!("bad num_keys {}", h.num_keys)));
        }
        log::debug!(
            "static hash: attached, {} keys in {}/{} slots",
            h.num_keys,
            h.used_slots,
            max
        );
        Ok(Self { mem, max })
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        Header::read(self.mem).num_keys as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_slots(&self) -> usize {
        self.max
    }

    pub fn used_slots(&self) -> usize {
        Header::read(self.mem).used_slots as usize
    }

    pub fn stats(&self) -> StaticHashStats {
        let h = Header::read(self.mem);
        StaticHashStats {
            num_keys: h.num_keys as usize,
            max_slots: self.max,
            used_slots: h.used_slots as usize,
        }
    }

    /// Insert or replace. Either the whole entry is stored or the region is
    /// left as it was (`OutOfSpace`).
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        validate_key(key)?;
        let home = self.home(key);
        let existing = self.find_index(key, home);

        let needed = slots_for(value.len());
        let reclaim = existing.map_or(0, |i| self.chain_len(i));
        let free = self.max - self.used_slots();
        if needed > free + reclaim {
            log::debug!(
                "static hash: out of space, need {} slots, {} free",
                needed,
                free + reclaim
            );
            return Err(Error::OutOfSpace("no empty slot"));
        }

        if let Some(idx) = existing {
            self.remove_by_idx(idx)?;
        }
        self.insert_new(home, key, value)
    }

    pub fn put_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key.as_bytes(), value.as_bytes())
    }

    pub fn put_fmt(&mut self, key: &str, args: fmt::Arguments<'_>) -> Result<()> {
        self.put(key.as_bytes(), args.to_string().as_bytes())
    }

    /// Copy of the value under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        validate_key(key)?;
        let idx = self.find_index(key, self.home(key)).ok_or(Error::NotFound)?;
        Ok(self.read_value(idx))
    }

    pub fn get_str(&self, key: &str) -> Result<String> {
        String::from_utf8(self.get(key.as_bytes())?)
            .map_err(|_| Error::InvalidArgument("value is not valid UTF-8"))
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        validate_key(key).is_ok() && self.find_index(key, self.home(key)).is_some()
    }

    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        validate_key(key)?;
        let idx = self.find_index(key, self.home(key)).ok_or(Error::NotFound)?;
        self.remove_by_idx(idx)
    }

    /// Remove the entry whose key-bearing slot is `idx`, as reported by
    /// [`StaticEntry::index`].
    ///
    /// Removing a primary that has collisions promotes one of them into the
    /// primary slot, so a cursor past `idx` may see that entry again or miss
    /// it; rewind the cursor by one after removing during iteration.
    pub fn remove_by_idx(&mut self, idx: usize) -> Result<()> {
        if idx >= self.max {
            return Err(Error::out_of_range(idx as isize, self.max));
        }
        let slot = self.slot(idx);
        match slot.count {
            1 => self.remove_data(idx),
            c if c > 1 => {
                let promoted = self
                    .find_collision(idx)
                    .ok_or_else(|| Error::layout(format!("primary {} has no collision slot", idx)))?;
                self.remove_data(idx);
                let mut moved = self.slot(promoted);
                moved.count = c - 1;
                moved.hash = idx as u32;
                self.set_slot(idx, &moved);
                self.set_slot(promoted, &Slot::EMPTY);
                if let Some(next) = moved.next() {
                    self.set_prev(next, idx);
                }
                log::trace!("static hash: promoted slot {} into {}", promoted, idx);
            }
            COUNT_COLLISION => {
                let home = slot.hash as usize;
                let mut primary = self.slot(home);
                if primary.count <= 1 {
                    return Err(Error::layout(format!(
                        "collision {} points at {} with count {}",
                        idx, home, primary.count
                    )));
                }
                primary.count -= 1;
                self.set_slot(home, &primary);
                self.remove_data(idx);
            }
            _ => return Err(Error::NotFound),
        }
        Ok(())
    }

    /// Entry at or after `*cursor`, advancing the cursor past it. Start
    /// with `0`.
    pub fn get_next(&self, cursor: &mut usize) -> Option<StaticEntry> {
        while *cursor < self.max {
            let idx = *cursor;
            *cursor += 1;
            let slot = self.slot(idx);
            if slot.has_key() {
                return Some(StaticEntry {
                    key: slot.key_prefix().to_vec(),
                    key_len: slot.key_len(),
                    key_md5: slot.key_md5(),
                    value: self.read_value(idx),
                    index: idx,
                });
            }
        }
        None
    }

    /// All entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = StaticEntry> + '_ {
        let mut cursor = 0;
        core::iter::from_fn(move || self.get_next(&mut cursor))
    }

    /// Empty the table, keeping its slot count.
    pub fn clear(&mut self) {
        self.mem[HEADER_SIZE..region_size(self.max)].fill(0);
        Header {
            max_slots: self.max as i32,
            used_slots: 0,
            num_keys: 0,
        }
        .write(self.mem);
    }

    /// Verify the slot protocol: header counters match the slots, every
    /// primary's count matches its collisions, and every continuation
    /// chain is well-linked and reachable from exactly one entry.
    pub fn check(&self) -> Result<()> {
        let h = Header::read(self.mem);
        let mut used = 0usize;
        let mut keys = 0usize;
        let mut continuations = 0usize;
        let mut collisions = vec![0usize; self.max];
        for idx in 0..self.max {
            let s = self.slot(idx);
            match s.count {
                0 => continue,
                c if c >= 1 => {
                    if s.hash as usize != idx {
                        return Err(Error::layout(format!("primary {} homed at {}", idx, s.hash)));
                    }
                    keys += 1;
                }
                COUNT_COLLISION => {
                    let home = s.hash as usize;
                    if home >= self.max || !self.slot(home).is_primary() {
                        return Err(Error::layout(format!(
                            "collision {} points at non-primary {}",
                            idx, home
                        )));
                    }
                    collisions[home] += 1;
                    keys += 1;
                }
                COUNT_CONTINUATION => continuations += 1,
                c => return Err(Error::layout(format!("slot {} has count {}", idx, c))),
            }
            used += 1;
            if s.size as usize > s.capacity() {
                return Err(Error::layout(format!("slot {} size {}", idx, s.size)));
            }
        }
        if used != h.used_slots as usize {
            return Err(Error::layout(format!(
                "used_slots {} but {} slots occupied",
                h.used_slots, used
            )));
        }
        if keys != h.num_keys as usize {
            return Err(Error::layout(format!(
                "num_keys {} but {} key slots",
                h.num_keys, keys
            )));
        }

        let mut reached = 0usize;
        for idx in 0..self.max {
            let s = self.slot(idx);
            if s.is_primary() && collisions[idx] != s.count as usize - 1 {
                return Err(Error::layout(format!(
                    "primary {} count {} with {} collisions",
                    idx, s.count, collisions[idx]
                )));
            }
            if !s.has_key() {
                continue;
            }
            let (mut prev, mut cur) = (idx, s);
            while let Some(next) = cur.next() {
                if (cur.size as usize) < cur.capacity() {
                    return Err(Error::layout(format!("slot {} is partial but linked", prev)));
                }
                if next >= self.max || reached >= continuations {
                    return Err(Error::layout(format!("chain from {} runs away", idx)));
                }
                let n = self.slot(next);
                if !n.is_continuation() || n.hash as usize != prev {
                    return Err(Error::layout(format!(
                        "slot {} is not a continuation of {}",
                        next, prev
                    )));
                }
                reached += 1;
                prev = next;
                cur = n;
            }
        }
        if reached != continuations {
            return Err(Error::layout(format!(
                "{} continuation slots, {} reachable",
                continuations, reached
            )));
        }
        Ok(())
    }

    /// Dump every occupied slot, one per line.
    pub fn debug<W: Write>(&self, out: &mut W) -> Result<()> {
        let s = self.stats();
        writeln!(
            out,
            "StaticHash: {} keys, {}/{} slots used",
            s.num_keys, s.used_slots, s.max_slots
        )?;
        for idx in 0..self.max {
            let slot = self.slot(idx);
            let kind = match slot.count {
                0 => continue,
                c if c >= 1 => "primary",
                COUNT_COLLISION => "collision",
                _ => "continuation",
            };
            write!(
                out,
                "[{}] {} count={} hash={} link={} size={}",
                idx, kind, slot.count, slot.hash, slot.link, slot.size
            )?;
            if slot.has_key() {
                out.write_all(b" key=")?;
                write_escaped(out, slot.key_prefix())?;
                if slot.key_len() > KEY_SIZE {
                    write!(out, "...({})", slot.key_len())?;
                }
            }
            out.write_all(b" value=")?;
            write_escaped(out, slot.value())?;
            writeln!(out)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn raw(&self) -> &[u8] {
        self.mem
    }

    fn slot(&self, idx: usize) -> Slot {
        Slot::read(self.mem, idx)
    }

    fn set_slot(&mut self, idx: usize, slot: &Slot) {
        slot.write(self.mem, idx)
    }

    fn adjust_header(&mut self, used: i32, keys: i32) {
        let mut h = Header::read(self.mem);
        h.used_slots += used;
        h.num_keys += keys;
        h.write(self.mem);
    }

    fn home(&self, key: &[u8]) -> usize {
        murmur3_32(key) as usize % self.max
    }

    fn find_empty(&self, start: usize) -> Option<usize> {
        (0..self.max)
            .map(|i| (start + i) % self.max)
            .find(|&i| Slot::read_count(self.mem, i) == 0)
    }

    /// First collision slot after `home` that belongs to it.
    fn find_collision(&self, home: usize) -> Option<usize> {
        (1..self.max)
            .map(|i| (home + i) % self.max)
            .find(|&i| {
                let s = self.slot(i);
                s.is_collision() && s.hash as usize == home
            })
    }

    /// Key-bearing slot holding `key`, searching the entries homed at
    /// `home`.
    fn find_index(&self, key: &[u8], home: usize) -> Option<usize> {
        let head = self.slot(home);
        if !head.is_primary() || head.hash as usize != home {
            return None;
        }
        let digest = (key.len() > KEY_SIZE).then(|| md5(key));
        let total = head.count as usize;
        let mut seen = 0;
        for i in 0..self.max {
            let idx = (home + i) % self.max;
            let s = if i == 0 { head } else { self.slot(idx) };
            if !s.has_key() || s.hash as usize != home {
                continue;
            }
            if key_matches(&s, key, digest.as_ref()) {
                return Some(idx);
            }
            seen += 1;
            if seen >= total {
                break;
            }
        }
        None
    }

    fn chain_len(&self, idx: usize) -> usize {
        let mut n = 1;
        let mut cur = self.slot(idx);
        while let Some(next) = cur.next() {
            n += 1;
            cur = self.slot(next);
        }
        n
    }

    fn read_value(&self, idx: usize) -> Vec<u8> {
        let mut cur = self.slot(idx);
        let mut out = cur.value().to_vec();
        while let Some(next) = cur.next() {
            cur = self.slot(next);
            out.extend_from_slice(cur.value());
        }
        out
    }

    fn set_prev(&mut self, idx: usize, prev: usize) {
        let mut s = self.slot(idx);
        s.hash = prev as u32;
        self.set_slot(idx, &s);
    }

    fn set_link(&mut self, idx: usize, next: usize) {
        let mut s = self.slot(idx);
        s.link = next as i32;
        self.set_slot(idx, &s);
    }

    fn insert_new(&mut self, home: usize, key: &[u8], value: &[u8]) -> Result<()> {
        let head = self.slot(home);
        if head.is_empty() {
            return self.write_entry(home, home, 1, key, value);
        }
        let idx = self
            .find_empty(home + 1)
            .ok_or(Error::OutOfSpace("no empty slot"))?;
        if head.is_primary() {
            self.write_entry(idx, home, COUNT_COLLISION, key, value)?;
            let mut head = self.slot(home);
            head.count += 1;
            self.set_slot(home, &head);
            Ok(())
        } else {
            self.relocate(home, idx);
            self.write_entry(home, home, 1, key, value)
        }
    }

    /// Move the slot at `from` to the empty slot `to`, patching the links
    /// that name it.
    fn relocate(&mut self, from: usize, to: usize) {
        let moved = self.slot(from);
        self.set_slot(to, &moved);
        self.set_slot(from, &Slot::EMPTY);
        if moved.is_continuation() {
            self.set_link(moved.hash as usize, to);
        }
        if let Some(next) = moved.next() {
            self.set_prev(next, to);
        }
        log::trace!("static hash: relocated slot {} to {}", from, to);
    }

    /// Write a new entry with its key-bearing slot at `idx`. On failure
    /// every slot written is released again.
    fn write_entry(
        &mut self,
        idx: usize,
        home: usize,
        count: i16,
        key: &[u8],
        value: &[u8],
    ) -> Result<()> {
        let digest = md5(key);
        let mut slot = Slot::EMPTY;
        slot.count = count;
        slot.hash = home as u32;
        slot.link = LINK_END;
        slot.set_key(key, &digest);
        let first = value.len().min(VALUE_SIZE);
        slot.set_value(&value[..first]);
        self.set_slot(idx, &slot);
        self.adjust_header(1, 1);

        let (mut prev, mut offset) = (idx, first);
        while offset < value.len() {
            let next = match self.find_empty(prev + 1) {
                Some(n) => n,
                None => {
                    self.remove_data(idx);
                    return Err(Error::OutOfSpace("no empty slot"));
                }
            };
            let n = (value.len() - offset).min(PAIR_SIZE);
            let mut ext = Slot::EMPTY;
            ext.count = COUNT_CONTINUATION;
            ext.hash = prev as u32;
            ext.link = LINK_END;
            ext.set_value(&value[offset..offset + n]);
            self.set_slot(next, &ext);
            self.set_link(prev, next);
            self.adjust_header(1, 0);
            prev = next;
            offset += n;
        }
        Ok(())
    }

    /// Free the key-bearing slot `idx` and its continuation chain.
    fn remove_data(&mut self, idx: usize) {
        let mut freed = 0;
        let mut cur = Some(idx);
        while let Some(i) = cur {
            cur = self.slot(i).next();
            self.set_slot(i, &Slot::EMPTY);
            freed += 1;
        }
        self.adjust_header(-freed, -1);
    }
}

fn validate_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("empty key"));
    }
    if key.len() > u16::MAX as usize {
        return Err(Error::InvalidArgument("key longer than 65535 bytes"));
    }
    Ok(())
}

fn key_matches(slot: &Slot, key: &[u8], digest: Option<&[u8; MD5_SIZE]>) -> bool {
    if slot.key_len() != key.len() {
        return false;
    }
    match digest {
        None => slot.key_prefix() == key,
        Some(d) => slot.key_prefix() == &key[..KEY_SIZE] && slot.key_md5() == *d,
    }
}

impl fmt::Debug for StaticHash<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticHash")
            .field("stats", &self.stats())
            .finish()
    }
}

impl Container for StaticHash<'_> {
    fn len(&self) -> usize {
        StaticHash::len(self)
    }

    fn clear(&mut self) {
        StaticHash::clear(self)
    }
}

impl Map for StaticHash<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        StaticHash::put(self, key, value)
    }

    fn get_owned(&self, key: &[u8]) -> Result<Vec<u8>> {
        StaticHash::get(self, key)
    }

    fn remove(&mut self, key: &[u8]) -> Result<()> {
        StaticHash::remove(self, key)
    }

    fn contains_key(&self, key: &[u8]) -> bool {
        StaticHash::contains_key(self, key)
    }
}
