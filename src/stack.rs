//! LIFO stack over [`List`]. The top is the list's tail.

use core::fmt;
use std::io::Write;

use crate::error::{Error, Result};
use crate::list::List;
use crate::traits::Container;
use crate::util::{parse_int, parse_str};

/// Last-in, first-out stack of byte elements.
#[derive(Default)]
pub struct Stack {
    list: List,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack holding at most `max` elements (`0` for no cap).
    pub fn with_max_len(max: usize) -> Self {
        let mut s = Self::new();
        s.set_max_len(max);
        s
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

    /// Pushes the decimal text of `value`.
    pub fn push_int(&mut self, value: i64) -> Result<()> {
        self.push(value.to_string().as_bytes())
    }

    pub fn pop(&mut self) -> Result<Vec<u8>> {
        self.list.pop_back()
    }

    /// Pop the top as text; it stays on the stack if it is not UTF-8.
    pub fn pop_str(&mut self) -> Result<String> {
        let s = parse_str(self.peek().ok_or(Error::out_of_range(-1, 0))?)?;
        self.list.remove_back()?;
        Ok(s)
    }

    /// Pop the top as an integer; it stays on the stack if it does not
    /// parse.
    pub fn pop_int(&mut self) -> Result<i64> {
        let n = parse_int(self.peek().ok_or(Error::out_of_range(-1, 0))?)?;
        self.list.remove_back()?;
        Ok(n)
    }

    pub fn peek(&self) -> Option<&[u8]> {
        self.list.back()
    }

    /// Element `depth` below the top (`0` is the top). Negative depths
    /// count from the bottom (`-1` is the bottom).
    pub fn peek_at(&self, depth: isize) -> Result<&[u8]> {
        self.list.get(Self::list_index(depth))
    }

    pub fn pop_at(&mut self, depth: isize) -> Result<Vec<u8>> {
        self.list.pop_at(Self::list_index(depth))
    }

    // Depth 0 is list index -1; depth -1 is list index 0.
    fn list_index(depth: isize) -> isize {
        -1 - depth
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn debug<W: Write>(&self, out: &mut W) -> Result<()> {
        self.list.debug(out)
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack").field("list", &self.list).finish()
    }
}

impl Container for Stack {
    fn len(&self) -> usize {
        Stack::len(self)
    }

    fn clear(&mut self) {
        Stack::clear(self)
    }
}
