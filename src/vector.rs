//! Vector: contiguous sequence of fixed-size byte elements.
//!
//! Every element is exactly `element_size` bytes. Capacity is counted in
//! elements and grows by the configured [`Growth`] policy when a push finds
//! the vector full; [`Vector::resize`] sets it directly.

use core::fmt;
use std::io::Write;

use crate::config::{Growth, VectorOptions};
use crate::error::{Error, Result};
use crate::traits::{Container, Sequence};
use crate::util::{element_index, insert_index, write_escaped};

/// Fixed-element-size vector.
pub struct Vector {
    data: Vec<u8>,
    element_size: usize,
    capacity: usize,
    initial: usize,
    growth: Growth,
}

impl Vector {
    pub fn new(initial_capacity: usize, element_size: usize, opts: VectorOptions) -> Result<Self> {
        opts.validate()?;
        if element_size == 0 {
            return Err(Error::InvalidArgument("element size must be non-zero"));
        }
        let mut v = Self {
            data: Vec::new(),
            element_size,
            capacity: 0,
            initial: initial_capacity,
            growth: opts.growth,
        };
        v.reserve_to(initial_capacity)?;
        Ok(v)
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.element_size
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Capacity in elements.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    fn bytes_for(&self, elements: usize) -> Result<usize> {
        elements
            .checked_mul(self.element_size)
            .ok_or(Error::OutOfMemory { size: usize::MAX })
    }

    fn reserve_to(&mut self, capacity: usize) -> Result<()> {
        let bytes = self.bytes_for(capacity)?;
        if bytes > self.data.len() {
            self.data
                .try_reserve_exact(bytes - self.data.len())
                .map_err(|_| Error::OutOfMemory { size: bytes })?;
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Set the capacity to `capacity` elements, dropping trailing elements
    /// that no longer fit.
    pub fn resize(&mut self, capacity: usize) -> Result<()> {
        let keep = self.bytes_for(capacity.min(self.len()))?;
        self.reserve_to(capacity)?;
        self.data.truncate(keep);
        self.data.shrink_to(self.capacity * self.element_size);
        Ok(())
    }

    fn check_size(&self, value: &[u8]) -> Result<()> {
        if value.len() != self.element_size {
            return Err(Error::InvalidArgument("element has the wrong size"));
        }
        Ok(())
    }

    fn ensure_room(&mut self) -> Result<()> {
        if self.len() < self.capacity {
            return Ok(());
        }
        let next = self.growth.next_capacity(self.capacity, self.initial);
        log::debug!(
            "vector: growing {} -> {} elements ({:?})",
            self.capacity,
            next,
            self.growth
        );
        self.reserve_to(next)
    }

    fn span(&self, pos: usize) -> core::ops::Range<usize> {
        pos * self.element_size..(pos + 1) * self.element_size
    }

    pub fn push_back(&mut self, value: &[u8]) -> Result<()> {
        self.check_size(value)?;
        self.ensure_room()?;
        self.data.extend_from_slice(value);
        Ok(())
    }

    pub fn push_front(&mut self, value: &[u8]) -> Result<()> {
        self.insert_at(0, value)
    }

    /// Insert so that the element ends up at `index`; `-1` appends.
    pub fn insert_at(&mut self, index: isize, value: &[u8]) -> Result<()> {
        self.check_size(value)?;
        let pos = insert_index(index, self.len())?;
        self.ensure_room()?;
        let at = pos * self.element_size;
        self.data.extend_from_slice(value);
        self.data[at..].rotate_right(value.len());
        Ok(())
    }

    pub fn front(&self) -> Option<&[u8]> {
        self.get(0).ok()
    }

    pub fn back(&self) -> Option<&[u8]> {
        self.get(-1).ok()
    }

    pub fn get(&self, index: isize) -> Result<&[u8]> {
        let pos = element_index(index, self.len())?;
        Ok(&self.data[self.span(pos)])
    }

    pub fn get_owned(&self, index: isize) -> Result<Vec<u8>> {
        self.get(index).map(<[u8]>::to_vec)
    }

    /// Overwrite the element at `index`.
    pub fn set_at(&mut self, index: isize, value: &[u8]) -> Result<()> {
        self.check_size(value)?;
        let pos = element_index(index, self.len())?;
        let span = self.span(pos);
        self.data[span].copy_from_slice(value);
        Ok(())
    }

    pub fn set_front(&mut self, value: &[u8]) -> Result<()> {
        self.set_at(0, value)
    }

    pub fn set_back(&mut self, value: &[u8]) -> Result<()> {
        self.set_at(-1, value)
    }

    pub fn pop_at(&mut self, index: isize) -> Result<Vec<u8>> {
        let pos = element_index(index, self.len())?;
        let span = self.span(pos);
        Ok(self.data.drain(span).collect())
    }

    pub fn pop_front(&mut self) -> Result<Vec<u8>> {
        self.pop_at(0)
    }

    pub fn pop_back(&mut self) -> Result<Vec<u8>> {
        self.pop_at(-1)
    }

    pub fn remove_at(&mut self, index: isize) -> Result<()> {
        self.pop_at(index).map(drop)
    }

    pub fn remove_front(&mut self) -> Result<()> {
        self.remove_at(0)
    }

    pub fn remove_back(&mut self) -> Result<()> {
        self.remove_at(-1)
    }

    /// Copy of the elements, back to back.
    pub fn to_array(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn reverse(&mut self) {
        let (n, es) = (self.len(), self.element_size);
        for i in 0..n / 2 {
            let (a, b) = self.data.split_at_mut((n - 1 - i) * es);
            a[i * es..(i + 1) * es].swap_with_slice(&mut b[..es]);
        }
    }

    /// Element at `*cursor`, advancing it. Start with `0`.
    pub fn get_next(&self, cursor: &mut usize) -> Option<&[u8]> {
        if *cursor >= self.len() {
            return None;
        }
        let span = self.span(*cursor);
        *cursor += 1;
        Some(&self.data[span])
    }

    pub fn iter(&self) -> core::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.element_size)
    }

    /// Drop all elements; capacity is kept.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn debug<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(
            out,
            "Vector: {} of {} elements, {} bytes each, {:?}",
            self.len(),
            self.capacity,
            self.element_size,
            self.growth
        )?;
        for (i, e) in self.iter().enumerate() {
            write!(out, "[{}] ", i)?;
            write_escaped(out, e)?;
            writeln!(out)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl Container for Vector {
    fn len(&self) -> usize {
        Vector::len(self)
    }

    fn clear(&mut self) {
        Vector::clear(self)
    }
}

impl Sequence for Vector {
    fn push_front(&mut self, value: &[u8]) -> Result<()> {
        Vector::push_front(self, value)
    }

    fn push_back(&mut self, value: &[u8]) -> Result<()> {
        Vector::push_back(self, value)
    }

    fn insert_at(&mut self, index: isize, value: &[u8]) -> Result<()> {
        Vector::insert_at(self, index, value)
    }

    fn get_owned(&self, index: isize) -> Result<Vec<u8>> {
        Vector::get_owned(self, index)
    }

    fn pop_front(&mut self) -> Result<Vec<u8>> {
        Vector::pop_front(self)
    }

    fn pop_back(&mut self) -> Result<Vec<u8>> {
        Vector::pop_back(self)
    }

    fn pop_at(&mut self, index: isize) -> Result<Vec<u8>> {
        Vector::pop_at(self, index)
    }

    fn remove_at(&mut self, index: isize) -> Result<()> {
        Vector::remove_at(self, index)
    }

    fn reverse(&mut self) {
        Vector::reverse(self)
    }

    fn to_array(&self) -> Vec<u8> {
        Vector::to_array(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn v4(growth: Growth) -> Vector {
        Vector::new(2, 4, VectorOptions::with_growth(growth)).unwrap()
    }

    fn elems(v: &Vector) -> Vec<&[u8]> {
        v.iter().collect()
    }

    #[test]
    fn growth_policies_apply() {
        let mut exact = v4(Growth::Exact);
        let mut double = v4(Growth::Double);
        let mut linear = v4(Growth::Linear);
        for v in [&mut exact, &mut double, &mut linear] {
            for i in 0..3u32 {
                v.push_back(&i.to_le_bytes()).unwrap();
            }
        }
        assert_eq!(exact.capacity(), 3);
        assert_eq!(double.capacity(), 6);
        assert_eq!(linear.capacity(), 4);
    }

    #[test]
    fn wrong_size_rejected() {
        let mut v = v4(Growth::Exact);
        assert_eq!(v.push_back(b"abc").unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert!(Vector::new(1, 0, VectorOptions::default()).is_err());
    }

    #[test]
    fn insert_get_set_pop() {
        let mut v = v4(Growth::Double);
        v.push_back(b"bbbb").unwrap();
        v.push_front(b"aaaa").unwrap();
        v.insert_at(-1, b"dddd").unwrap();
        v.insert_at(2, b"cccc").unwrap();
        assert_eq!(elems(&v), [b"aaaa", b"bbbb", b"cccc", b"dddd"]);
        assert_eq!(v.get(-1).unwrap(), b"dddd");
        v.set_at(1, b"BBBB").unwrap();
        v.set_front(b"AAAA").unwrap();
        v.set_back(b"DDDD").unwrap();
        assert_eq!(v.pop_at(1).unwrap(), b"BBBB");
        assert_eq!(v.pop_front().unwrap(), b"AAAA");
        assert_eq!(v.pop_back().unwrap(), b"DDDD");
        assert_eq!(v.front(), Some(&b"cccc"[..]));
        assert_eq!(v.get(1).unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn reverse_and_round_trip() {
        let mut v = Vector::new(0, 2, VectorOptions::default()).unwrap();
        for e in [b"ab", b"cd", b"ef", b"gh", b"ij"] {
            v.push_back(e).unwrap();
        }
        let flat = v.to_array();
        v.reverse();
        assert_eq!(elems(&v), [b"ij", b"gh", b"ef", b"cd", b"ab"]);
        v.reverse();
        assert_eq!(v.to_array(), flat);

        let mut copy = Vector::new(0, 2, VectorOptions::default()).unwrap();
        for chunk in flat.chunks(2) {
            copy.push_back(chunk).unwrap();
        }
        assert_eq!(copy.to_array(), flat);
    }

    #[test]
    fn resize_truncates() {
        let mut v = v4(Growth::Exact);
        for i in 0..5u32 {
            v.push_back(&i.to_be_bytes()).unwrap();
        }
        v.resize(2).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.capacity(), 2);
        v.resize(10).unwrap();
        assert_eq!(v.capacity(), 10);
        assert_eq!(v.get(1).unwrap(), 1u32.to_be_bytes());
    }

    #[test]
    fn cursor_walks_in_order() {
        let mut v = v4(Growth::Exact);
        v.push_back(b"1111").unwrap();
        v.push_back(b"2222").unwrap();
        let mut c = 0;
        assert_eq!(v.get_next(&mut c), Some(&b"1111"[..]));
        assert_eq!(v.get_next(&mut c), Some(&b"2222"[..]));
        assert_eq!(v.get_next(&mut c), None);
        v.clear();
        assert!(v.is_empty());
        assert_eq!(v.capacity(), 2);
    }

    #[test]
    fn debug_output() {
        let mut v = v4(Growth::Linear);
        v.push_back(b"wxyz").unwrap();
        let mut out = Vec::new();
        v.debug(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Vector: 1 of 2 elements, 4 bytes each, Linear"));
        assert!(text.contains("[0] wxyz"));
    }
}
