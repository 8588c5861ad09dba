//! FIFO queue over [`List`]: push at the tail, pop from the head.

use core::fmt;
use std::io::Write;

use crate::error::{Error, Result};
use crate::list::List;
use crate::traits::Container;
use crate::util::{parse_int, parse_str};

/// First-in, first-out queue of byte elements.
#[derive(Default)]
pub struct Queue {
    list: List,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue holding at most `max` elements (`0` for no cap).
    pub fn with_max_len(max: usize) -> Self {
        let mut q = Self::new();
        q.set_max_len(max);
        q
    }

    pub fn set_max_len(&mut self, max: usize) {
        self.list.set_max_len(max);
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn push(&mut self, value: &[u8]) -> Result<()> {
        self.list.push_back(value)
    }

    pub fn push_str(&mut self, value: &str) -> Result<()> {
        self.push(value.as_bytes())
    }

    pub fn push_int(&mut self, value: i64) -> Result<()> {
        self.push(value.to_string().as_bytes())
    }

    pub fn pop(&mut self) -> Result<Vec<u8>> {
        self.list.pop_front()
    }

    pub fn pop_str(&mut self) -> Result<String> {
        let s = parse_str(self.peek().ok_or(Error::out_of_range(0, 0))?)?;
        self.list.remove_front()?;
        Ok(s)
    }

    pub fn pop_int(&mut self) -> Result<i64> {
        let n = parse_int(self.peek().ok_or(Error::out_of_range(0, 0))?)?;
        self.list.remove_front()?;
        Ok(n)
    }

    /// Oldest element.
    pub fn peek(&self) -> Option<&[u8]> {
        self.list.front()
    }

    /// `0` is the oldest element, `-1` the newest.
    pub fn peek_at(&self, index: isize) -> Result<&[u8]> {
        self.list.get(index)
    }

    pub fn pop_at(&mut self, index: isize) -> Result<Vec<u8>> {
        self.list.pop_at(index)
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn debug<W: Write>(&self, out: &mut W) -> Result<()> {
        self.list.debug(out)
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue").field("list", &self.list).finish()
    }
}

impl Container for Queue {
    fn len(&self) -> usize {
        Queue::len(self)
    }

    fn clear(&mut self) {
        Queue::clear(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn fifo_order() {
        let mut q = Queue::new();
        q.push_str("first").unwrap();
        q.push_int(-7).unwrap();
        q.push(b"last").unwrap();
        assert_eq!(q.peek(), Some(&b"first"[..]));
        assert_eq!(q.peek_at(-1).unwrap(), b"last");
        assert_eq!(q.pop_str().unwrap(), "first");
        assert_eq!(q.pop_int().unwrap(), -7);
        assert_eq!(q.pop().unwrap(), b"last");
        assert_eq!(q.pop().unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(q.pop_int().unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn pop_at_and_bound() {
        let mut q = Queue::with_max_len(3);
        for e in ["a", "b", "c"] {
            q.push_str(e).unwrap();
        }
        assert_eq!(q.push(b"d").unwrap_err().kind(), ErrorKind::OutOfSpace);
        assert_eq!(q.pop_at(1).unwrap(), b"b");
        q.push(b"d").unwrap();
        let mut out = Vec::new();
        q.debug(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("[2] (1) d"));
    }
}
