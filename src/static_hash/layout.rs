//! Byte layout of a static hash region.
//!
//! All integers are little-endian and fields are packed with no padding, so
//! a region can be shared between processes (and builds) that agree on
//! these constants.
//!
//! ```text
//! header  { i32 max_slots, i32 used_slots, i32 num_keys }          12 bytes
//! slot    { i16 count, u32 hash, u8 size, i32 link, [u8; 66] body } 77 bytes
//! body    key-bearing: { value[32], key[16], u16 keylen, keymd5[16] }
//!         continuation: { value[66] }
//! ```
//!
//! `count`: 0 empty, >= 1 primary (number of keys homed here), -1 collision,
//! -2 continuation. `hash`: home index for key-bearing slots, previous chain
//! slot for continuations. `link`: next continuation or -1.

/// Key bytes stored in a slot; longer keys keep this prefix plus an MD5.
pub const KEY_SIZE: usize = 16;
/// Value bytes stored in a key-bearing slot.
pub const VALUE_SIZE: usize = 32;
pub(crate) const MD5_SIZE: usize = 16;
/// Value bytes stored in a continuation slot.
pub const PAIR_SIZE: usize = VALUE_SIZE + KEY_SIZE + 2 + MD5_SIZE;

pub(crate) const SLOT_HEADER_SIZE: usize = 2 + 4 + 1 + 4;
/// Bytes per slot record.
pub const SLOT_SIZE: usize = SLOT_HEADER_SIZE + PAIR_SIZE;
/// Bytes of the region header.
pub const HEADER_SIZE: usize = 12;

const KEY_OFFSET: usize = VALUE_SIZE;
const KEYLEN_OFFSET: usize = KEY_OFFSET + KEY_SIZE;
const MD5_OFFSET: usize = KEYLEN_OFFSET + 2;

pub(crate) const COUNT_EMPTY: i16 = 0;
pub(crate) const COUNT_COLLISION: i16 = -1;
pub(crate) const COUNT_CONTINUATION: i16 = -2;
pub(crate) const LINK_END: i32 = -1;

fn read_i32(mem: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([mem[at], mem[at + 1], mem[at + 2], mem[at + 3]])
}

fn write_i32(mem: &mut [u8], at: usize, v: i32) {
    mem[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

/// Region header, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub max_slots: i32,
    pub used_slots: i32,
    pub num_keys: i32,
}

impl Header {
    pub fn read(mem: &[u8]) -> Self {
        Self {
            max_slots: read_i32(mem, 0),
            used_slots: read_i32(mem, 4),
            num_keys: read_i32(mem, 8),
        }
    }

    pub fn write(&self, mem: &mut [u8]) {
        write_i32(mem, 0, self.max_slots);
        write_i32(mem, 4, self.used_slots);
        write_i32(mem, 8, self.num_keys);
    }
}

#[inline]
fn slot_offset(idx: usize) -> usize {
    HEADER_SIZE + idx * SLOT_SIZE
}

/// One slot record, decoded into native integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub count: i16,
    pub hash: u32,
    pub size: u8,
    pub link: i32,
    pub body: [u8; PAIR_SIZE],
}

impl Slot {
    /// All-zero record; `clear` relies on this encoding to zero-fill.
    pub const EMPTY: Slot = Slot {
        count: COUNT_EMPTY,
        hash: 0,
        size: 0,
        link: 0,
        body: [0; PAIR_SIZE],
    };

    pub fn read(mem: &[u8], idx: usize) -> Self {
        let at = slot_offset(idx);
        let raw = &mem[at..at + SLOT_SIZE];
        let mut body = [0u8; PAIR_SIZE];
        body.copy_from_slice(&raw[SLOT_HEADER_SIZE..]);
        Self {
            count: i16::from_le_bytes([raw[0], raw[1]]),
            hash: u32::from_le_bytes([raw[2], raw[3], raw[4], raw[5]]),
            size: raw[6],
            link: read_i32(raw, 7),
            body,
        }
    }

    pub fn write(&self, mem: &mut [u8], idx: usize) {
        let at = slot_offset(idx);
        let raw = &mut mem[at..at + SLOT_SIZE];
        raw[0..2].copy_from_slice(&self.count.to_le_bytes());
        raw[2..6].copy_from_slice(&self.hash.to_le_bytes());
        raw[6] = self.size;
        write_i32(raw, 7, self.link);
        raw[SLOT_HEADER_SIZE..].copy_from_slice(&self.body);
    }

    /// Read only the `count` field.
    pub fn read_count(mem: &[u8], idx: usize) -> i16 {
        let at = slot_offset(idx);
        i16::from_le_bytes([mem[at], mem[at + 1]])
    }

    pub fn is_empty(&self) -> bool {
        self.count == COUNT_EMPTY
    }

    pub fn is_primary(&self) -> bool {
        self.count >= 1
    }

    pub fn is_collision(&self) -> bool {
        self.count == COUNT_COLLISION
    }

    pub fn is_continuation(&self) -> bool {
        self.count == COUNT_CONTINUATION
    }

    /// Primary or collision: the slot heads an entry.
    pub fn has_key(&self) -> bool {
        self.is_primary() || self.is_collision()
    }

    pub fn next(&self) -> Option<usize> {
        if self.link == LINK_END {
            None
        } else {
            Some(self.link as usize)
        }
    }

    /// Value bytes this slot can hold.
    pub fn capacity(&self) -> usize {
        if self.is_continuation() {
            PAIR_SIZE
        } else {
            VALUE_SIZE
        }
    }

    /// Value bytes held by this slot.
    pub fn value(&self) -> &[u8] {
        &self.body[..self.size as usize]
    }

    pub fn set_value(&mut self, bytes: &[u8]) {
        self.body[..bytes.len()].copy_from_slice(bytes);
        self.size = bytes.len() as u8;
    }

    /// Original key length.
    pub fn key_len(&self) -> usize {
        u16::from_le_bytes([self.body[KEYLEN_OFFSET], self.body[KEYLEN_OFFSET + 1]]) as usize
    }

    /// Stored key bytes: the whole key, or its first `KEY_SIZE` bytes.
    pub fn key_prefix(&self) -> &[u8] {
        let n = self.key_len().min(KEY_SIZE);
        &self.body[KEY_OFFSET..KEY_OFFSET + n]
    }

    pub fn key_md5(&self) -> [u8; MD5_SIZE] {
        let mut out = [0u8; MD5_SIZE];
        out.copy_from_slice(&self.body[MD5_OFFSET..MD5_OFFSET + MD5_SIZE]);
        out
    }

    /// Store `key` (truncated to `KEY_SIZE`), its full length and MD5.
    pub fn set_key(&mut self, key: &[u8], md5: &[u8; MD5_SIZE]) {
        let n = key.len().min(KEY_SIZE);
        self.body[KEY_OFFSET..KEY_OFFSET + KEY_SIZE].fill(0);
        self.body[KEY_OFFSET..KEY_OFFSET + n].copy_from_slice(&key[..n]);
        self.body[KEYLEN_OFFSET..KEYLEN_OFFSET + 2]
            .copy_from_slice(&(key.len() as u16).to_le_bytes());
        self.body[MD5_OFFSET..MD5_OFFSET + MD5_SIZE].copy_from_slice(md5);
    }
}

/// Region size for `max_slots` slots.
pub const fn region_size(max_slots: usize) -> usize {
    HEADER_SIZE + max_slots * SLOT_SIZE
}
