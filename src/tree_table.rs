//! TreeTable: ordered byte map on a left-leaning red-black tree.
//!
//! Keys and values are copied in. Order is given by a comparator over key
//! bytes; the default is plain lexicographic byte order.
//!
//! Shape invariants, restored after every `put`/`remove`:
//! - in-order keys are strictly increasing under the comparator;
//! - no red node has a red child, and red links lean left;
//! - every root-to-leaf path crosses the same number of black nodes;
//! - the root is black.
//!
//! [`TreeTable::check`] verifies all of these and reports the first
//! violation found.
//!
//! Traversal
//! - `iter()` / `range_from()` borrow the tree and cannot observe mutation.
//! - `get_next()` drives a [`TreeCursor`] that remembers the last key it
//!   returned rather than a node, so the tree may be modified between calls.
//!   Each call seeks the smallest key strictly greater than the remembered
//!   one. Keys inserted behind the cursor are not visited.

use core::cmp::Ordering;
use core::fmt;
use std::io::Write;

use crate::error::{Error, Result};
use crate::traits::{Container, Map, OrderedMap};
use crate::util::{try_copy, write_escaped};

/// Key comparator. Must be a total order.
pub type Comparator = Box<dyn Fn(&[u8], &[u8]) -> Ordering + Send + Sync>;

/// Default comparator: lexicographic byte order, shorter prefix first.
pub fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

type Link = Option<Box<Node>>;

struct Node {
    key: Box<[u8]>,
    value: Box<[u8]>,
    left: Link,
    right: Link,
    red: bool,
}

impl Node {
    fn new(key: Box<[u8]>, value: Box<[u8]>) -> Self {
        Self {
            key,
            value,
            left: None,
            right: None,
            red: true,
        }
    }
}

/// Broken tree invariant reported by [`TreeTable::check`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Violation {
    RootNotBlack,
    RedWithRedChild,
    ConsecutiveLeftRed,
    BlackHeightMismatch,
    OutOfOrder,
    RightLeaningRed,
}

impl Violation {
    /// Stable nonzero diagnostic code.
    pub fn code(self) -> i32 {
        match self {
            Violation::RootNotBlack => 1,
            Violation::RedWithRedChild => 2,
            Violation::ConsecutiveLeftRed => 3,
            Violation::BlackHeightMismatch => 4,
            Violation::OutOfOrder => 5,
            Violation::RightLeaningRed => 6,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Violation::RootNotBlack => "root is not black",
            Violation::RedWithRedChild => "red node has a red child",
            Violation::ConsecutiveLeftRed => "two consecutive left-leaning red links",
            Violation::BlackHeightMismatch => "black height differs between paths",
            Violation::OutOfOrder => "in-order keys are not strictly increasing",
            Violation::RightLeaningRed => "red link leans right",
        };
        write!(f, "{} (code {})", what, self.code())
    }
}

#[inline]
fn is_red(link: &Link) -> bool {
    link.as_ref().map_or(false, |n| n.red)
}

#[inline]
fn left_left_red(h: &Node) -> bool {
    h.left.as_ref().map_or(false, |l| is_red(&l.left))
}

#[inline]
fn right_left_red(h: &Node) -> bool {
    h.right.as_ref().map_or(false, |r| is_red(&r.left))
}

fn rotate_left(mut h: Box<Node>) -> Box<Node> {
    match h.right.take() {
        Some(mut x) => {
            h.right = x.left.take();
            x.red = h.red;
            h.red = true;
            x.left = Some(h);
            x
        }
        None => h,
    }
}

fn rotate_right(mut h: Box<Node>) -> Box<Node> {
    match h.left.take() {
        Some(mut x) => {
            h.left = x.right.take();
            x.red = h.red;
            h.red = true;
            x.right = Some(h);
            x
        }
        None => h,
    }
}

fn flip_colors(h: &mut Node) {
    h.red = !h.red;
    if let Some(l) = h.left.as_mut() {
        l.red = !l.red;
    }
    if let Some(r) = h.right.as_mut() {
        r.red = !r.red;
    }
}

fn fix_up(mut h: Box<Node>) -> Box<Node> {
    if is_red(&h.right) && !is_red(&h.left) {
        h = rotate_left(h);
    }
    if is_red(&h.left) && left_left_red(&h) {
        h = rotate_right(h);
    }
    if is_red(&h.left) && is_red(&h.right) {
        flip_colors(&mut h);
    }
    h
}

fn move_red_left(mut h: Box<Node>) -> Box<Node> {
    flip_colors(&mut h);
    if right_left_red(&h) {
        h.right = h.right.take().map(rotate_right);
        h = rotate_left(h);
        flip_colors(&mut h);
    }
    h
}

fn move_red_right(mut h: Box<Node>) -> Box<Node> {
    flip_colors(&mut h);
    if left_left_red(&h) {
        h = rotate_right(h);
        flip_colors(&mut h);
    }
    h
}

type Cmp<'a> = &'a (dyn Fn(&[u8], &[u8]) -> Ordering + Send + Sync);

fn insert(cmp: Cmp<'_>, link: Link, key: Box<[u8]>, value: Box<[u8]>, added: &mut bool) -> Box<Node> {
    let mut h = match link {
        Some(h) => h,
        None => {
            *added = true;
            return Box::new(Node::new(key, value));
        }
    };
    match cmp(&key[..], &h.key[..]) {
        Ordering::Less => h.left = Some(insert(cmp, h.left.take(), key, value, added)),
        Ordering::Greater => h.right = Some(insert(cmp, h.right.take(), key, value, added)),
        Ordering::Equal => h.value = value,
    }
    fix_up(h)
}

/// Detach the minimum of `h`. Returns the rebalanced rest and the node.
fn delete_min(mut h: Box<Node>) -> (Link, Box<Node>) {
    if h.left.is_none() {
        let rest = h.right.take();
        return (rest, h);
    }
    if !is_red(&h.left) && !left_left_red(&h) {
        h = move_red_left(h);
    }
    match h.left.take() {
        Some(left) => {
            let (rest, min) = delete_min(left);
            h.left = rest;
            (Some(fix_up(h)), min)
        }
        None => {
            let rest = h.right.take();
            (rest, h)
        }
    }
}

/// Remove `key` below `h`; the caller has checked it is present.
fn delete(
    cmp: Cmp<'_>,
    mut h: Box<Node>,
    key: &[u8],
    removed: &mut Option<(Box<[u8]>, Box<[u8]>)>,
) -> Link {
    if cmp(key, &h.key[..]) == Ordering::Less {
        if h.left.is_none() {
            return Some(h);
        }
        if !is_red(&h.left) && !left_left_red(&h) {
            h = move_red_left(h);
        }
        if let Some(left) = h.left.take() {
            h.left = delete(cmp, left, key, removed);
        }
    } else {
        if is_red(&h.left) {
            h = rotate_right(h);
        }
        if h.right.is_none() {
            if cmp(key, &h.key[..]) == Ordering::Equal {
                let Node { key, value, left, .. } = *h;
                *removed = Some((key, value));
                return left;
            }
            return Some(fix_up(h));
        }
        if !is_red(&h.right) && !right_left_red(&h) {
            h = move_red_right(h);
        }
        if cmp(key, &h.key[..]) == Ordering::Equal {
            if let Some(right) = h.right.take() {
                let (rest, min) = delete_min(right);
                h.right = rest;
                let Node {
                    key: min_key,
                    value: min_value,
                    ..
                } = *min;
                let old_key = core::mem::replace(&mut h.key, min_key);
                let old_value = core::mem::replace(&mut h.value, min_value);
                *removed = Some((old_key, old_value));
            }
        } else if let Some(right) = h.right.take() {
            h.right = delete(cmp, right, key, removed);
        }
    }
    Some(fix_up(h))
}

/// Resumable in-order position for [`TreeTable::get_next`].
#[derive(Debug, Clone, Default)]
pub struct TreeCursor {
    state: CursorState,
}

#[derive(Debug, Clone, Default)]
enum CursorState {
    #[default]
    Start,
    AtOrAfter(Box<[u8]>),
    After(Box<[u8]>),
    Done,
}

impl TreeCursor {
    /// Cursor positioned before the smallest key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor whose first step returns the smallest key `>= key`.
    pub fn at(key: &[u8]) -> Self {
        Self {
            state: CursorState::AtOrAfter(key.into()),
        }
    }

    /// Last key returned, if any.
    pub fn last_key(&self) -> Option<&[u8]> {
        match &self.state {
            CursorState::After(k) => Some(&k[..]),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = CursorState::Start;
    }
}

/// Ordered byte map.
pub struct TreeTable {
    root: Link,
    len: usize,
    cmp: Comparator,
}

impl Default for TreeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeTable {
    pub fn new() -> Self {
        Self {
            root: None,
            len: 0,
            cmp: Box::new(compare_bytes),
        }
    }

    pub fn with_compare<F>(cmp: F) -> Self
    where
        F: Fn(&[u8], &[u8]) -> Ordering + Send + Sync + 'static,
    {
        Self {
            root: None,
            len: 0,
            cmp: Box::new(cmp),
        }
    }

    /// Replace the comparator. Existing entries are re-inserted under the
    /// new order; keys the new order considers equal collapse into one,
    /// the later in old order winning.
    pub fn set_compare<F>(&mut self, cmp: F)
    where
        F: Fn(&[u8], &[u8]) -> Ordering + Send + Sync + 'static,
    {
        let mut entries = Vec::with_capacity(self.len);
        drain_in_order(self.root.take(), &mut entries);
        self.len = 0;
        self.cmp = Box::new(cmp);
        for (k, v) in entries {
            self.insert_owned(k, v);
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert or replace. On allocation failure nothing changes.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("empty key"));
        }
        let key = try_copy(key)?;
        let value = try_copy(value)?;
        self.insert_owned(key, value);
        Ok(())
    }

    pub fn put_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key.as_bytes(), value.as_bytes())
    }

    pub fn put_fmt(&mut self, key: &str, args: fmt::Arguments<'_>) -> Result<()> {
        self.put(key.as_bytes(), args.to_string().as_bytes())
    }

    fn insert_owned(&mut self, key: Box<[u8]>, value: Box<[u8]>) {
        let mut added = false;
        let root = self.root.take();
        let mut root = insert(&*self.cmp, root, key, value, &mut added);
        root.red = false;
        self.root = Some(root);
        if added {
            self.len += 1;
        }
    }

    fn find(&self, key: &[u8]) -> Option<&Node> {
        let mut cur = self.root.as_deref();
        while let Some(n) = cur {
            match (self.cmp)(key, &n.key[..]) {
                Ordering::Less => cur = n.left.as_deref(),
                Ordering::Greater => cur = n.right.as_deref(),
                Ordering::Equal => return Some(n),
            }
        }
        None
    }

    /// Borrow the value under `key`.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.find(key).map(|n| &*n.value)
    }

    /// Copy of the value under `key`.
    pub fn get_owned(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.get(key).map(<[u8]>::to_vec).ok_or(Error::NotFound)
    }

    /// Borrow the value under `key` as text; `None` when absent or not UTF-8.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key.as_bytes())
            .and_then(|v| core::str::from_utf8(v).ok())
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        self.take(key).map(drop)
    }

    /// Remove `key` and hand back its value.
    pub fn take(&mut self, key: &[u8]) -> Result<Box<[u8]>> {
        if !self.contains_key(key) {
            return Err(Error::NotFound);
        }
        let mut root = match self.root.take() {
            Some(root) => root,
            None => return Err(Error::NotFound),
        };
        if !is_red(&root.left) && !is_red(&root.right) {
            root.red = true;
        }
        let mut removed = None;
        self.root = delete(&*self.cmp, root, key, &mut removed);
        if let Some(r) = self.root.as_mut() {
            r.red = false;
        }
        match removed {
            Some((_, value)) => {
                self.len -= 1;
                Ok(value)
            }
            None => Err(Error::NotFound),
        }
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    pub fn find_min(&self) -> Option<(&[u8], &[u8])> {
        let mut cur = self.root.as_deref()?;
        while let Some(l) = cur.left.as_deref() {
            cur = l;
        }
        Some((&cur.key[..], &cur.value[..]))
    }

    pub fn find_max(&self) -> Option<(&[u8], &[u8])> {
        let mut cur = self.root.as_deref()?;
        while let Some(r) = cur.right.as_deref() {
            cur = r;
        }
        Some((&cur.key[..], &cur.value[..]))
    }

    /// Smallest key `>= key`; when every key is smaller, the greatest key.
    pub fn find_nearest(&self, key: &[u8]) -> Option<(&[u8], &[u8])> {
        match self.lower_bound(key) {
            Some(n) => Some((&n.key[..], &n.value[..])),
            None => self.find_max(),
        }
    }

    fn lower_bound(&self, key: &[u8]) -> Option<&Node> {
        let mut cur = self.root.as_deref();
        let mut best = None;
        while let Some(n) = cur {
            if (self.cmp)(key, &n.key[..]) == Ordering::Greater {
                cur = n.right.as_deref();
            } else {
                best = Some(n);
                cur = n.left.as_deref();
            }
        }
        best
    }

    fn successor(&self, key: &[u8]) -> Option<&Node> {
        let mut cur = self.root.as_deref();
        let mut best = None;
        while let Some(n) = cur {
            if (self.cmp)(key, &n.key[..]) == Ordering::Less {
                best = Some(n);
                cur = n.left.as_deref();
            } else {
                cur = n.right.as_deref();
            }
        }
        best
    }

    /// Advance `cursor` and return the entry it lands on.
    pub fn get_next(&self, cursor: &mut TreeCursor) -> Option<(&[u8], &[u8])> {
        let found = match &cursor.state {
            CursorState::Start => self.find_min_node(),
            CursorState::AtOrAfter(k) => self.lower_bound(k),
            CursorState::After(k) => self.successor(k),
            CursorState::Done => None,
        };
        match found {
            Some(n) => {
                cursor.state = CursorState::After(n.key.clone());
                Some((&n.key[..], &n.value[..]))
            }
            None => {
                cursor.state = CursorState::Done;
                None
            }
        }
    }

    fn find_min_node(&self) -> Option<&Node> {
        let mut cur = self.root.as_deref()?;
        while let Some(l) = cur.left.as_deref() {
            cur = l;
        }
        Some(cur)
    }

    /// In-order iterator over all entries.
    pub fn iter(&self) -> Iter<'_> {
        let mut it = Iter { stack: Vec::new() };
        it.push_left(self.root.as_deref());
        it
    }

    /// In-order iterator starting at the smallest key `>= key`.
    pub fn range_from(&self, key: &[u8]) -> Iter<'_> {
        let mut stack = Vec::new();
        let mut cur = self.root.as_deref();
        while let Some(n) = cur {
            if (self.cmp)(key, &n.key[..]) == Ordering::Greater {
                cur = n.right.as_deref();
            } else {
                stack.push(n);
                cur = n.left.as_deref();
            }
        }
        Iter { stack }
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        fn h(link: &Link) -> usize {
            match link {
                None => 0,
                Some(n) => 1 + h(&n.left).max(h(&n.right)),
            }
        }
        h(&self.root)
    }

    /// Verify colour, balance and ordering invariants. A failure is
    /// [`Error::Tree`] carrying the first [`Violation`] found.
    pub fn check(&self) -> Result<()> {
        self.find_violation().map_err(Error::from)
    }

    fn find_violation(&self) -> core::result::Result<(), Violation> {
        if is_red(&self.root) {
            return Err(Violation::RootNotBlack);
        }
        let mut prev: Option<&[u8]> = None;
        self.check_node(&self.root, &mut prev).map(drop)
    }

    fn check_node<'a>(
        &self,
        link: &'a Link,
        prev: &mut Option<&'a [u8]>,
    ) -> core::result::Result<usize, Violation> {
        let n = match link {
            None => return Ok(1),
            Some(n) => n,
        };
        if n.red && (is_red(&n.left) || is_red(&n.right)) {
            return Err(Violation::RedWithRedChild);
        }
        if is_red(&n.left) && left_left_red(n) {
            return Err(Violation::ConsecutiveLeftRed);
        }
        if is_red(&n.right) {
            return Err(Violation::RightLeaningRed);
        }
        let left = self.check_node(&n.left, prev)?;
        if let Some(p) = *prev {
            if (self.cmp)(p, &n.key[..]) != Ordering::Less {
                return Err(Violation::OutOfOrder);
            }
        }
        *prev = Some(&n.key[..]);
        let right = self.check_node(&n.right, prev)?;
        if left != right {
            return Err(Violation::BlackHeightMismatch);
        }
        Ok(left + usize::from(!n.red))
    }

    /// Print the tree sideways (right subtree on top), one node per line.
    pub fn debug<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "TreeTable: {} entries, height {}", self.len, self.height())?;
        fn walk<W: Write>(out: &mut W, link: &Link, depth: usize) -> std::io::Result<()> {
            if let Some(n) = link {
                walk(out, &n.right, depth + 1)?;
                write!(out, "{:width$}{} ", "", if n.red { "R" } else { "B" }, width = depth * 4)?;
                write_escaped(out, &n.key[..])?;
                out.write_all(b" = ")?;
                write_escaped(out, &n.value)?;
                writeln!(out)?;
                walk(out, &n.left, depth + 1)?;
            }
            Ok(())
        }
        walk(out, &self.root, 0)?;
        Ok(())
    }
}

fn drain_in_order(link: Link, out: &mut Vec<(Box<[u8]>, Box<[u8]>)>) {
    if let Some(n) = link {
        let Node {
            key,
            value,
            left,
            right,
            ..
        } = *n;
        drain_in_order(left, out);
        out.push((key, value));
        drain_in_order(right, out);
    }
}

/// In-order iterator over `(key, value)`.
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iter<'a> {
    fn push_left(&mut self, mut cur: Option<&'a Node>) {
        while let Some(n) = cur {
            self.stack.push(n);
            cur = n.left.as_deref();
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        self.push_left(n.right.as_deref());
        Some((&n.key[..], &n.value[..]))
    }
}

impl<'a> IntoIterator for &'a TreeTable {
    type Item = (&'a [u8], &'a [u8]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl fmt::Debug for TreeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Container for TreeTable {
    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        TreeTable::clear(self)
    }
}

impl Map for TreeTable {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        TreeTable::put(self, key, value)
    }

    fn get_owned(&self, key: &[u8]) -> Result<Vec<u8>> {
        TreeTable::get_owned(self, key)
    }

    fn remove(&mut self, key: &[u8]) -> Result<()> {
        TreeTable::remove(self, key)
    }

    fn contains_key(&self, key: &[u8]) -> bool {
        TreeTable::contains_key(self, key)
    }
}

impl OrderedMap for TreeTable {
    fn find_min(&self) -> Option<(&[u8], &[u8])> {
        TreeTable::find_min(self)
    }

    fn find_max(&self) -> Option<(&[u8], &[u8])> {
        TreeTable::find_max(self)
    }

    fn find_nearest(&self, key: &[u8]) -> Option<(&[u8], &[u8])> {
        TreeTable::find_nearest(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    // (key, red) of a node, for shape assertions.
    fn at<'a>(t: &'a TreeTable, path: &str) -> Option<(&'a [u8], bool)> {
        let mut cur = t.root.as_deref();
        for step in path.chars() {
            cur = match step {
                'L' => cur?.left.as_deref(),
                'R' => cur?.right.as_deref(),
                _ => unreachable!(),
            };
        }
        cur.map(|n| (&*n.key, n.red))
    }

    fn black(k: &str) -> Option<(&[u8], bool)> {
        Some((k.as_bytes(), false))
    }

    fn red(k: &str) -> Option<(&[u8], bool)> {
        Some((k.as_bytes(), true))
    }

    fn build(keys: &[&str]) -> TreeTable {
        let mut t = TreeTable::new();
        for k in keys {
            t.put_str(k, k).unwrap();
            assert!(t.check().is_ok(), "after inserting {}", k);
        }
        t
    }

    /// Invariant: the classic "A S E R C D I N B X" sequence yields the
    /// expected left-leaning shape.
    #[test]
    fn growth_shape() {
        let t = build(&["A", "S", "E", "R", "C", "D", "I", "N", "B", "X"]);
        assert_eq!(at(&t, ""), black("E"));
        assert_eq!(at(&t, "L"), black("C"));
        assert_eq!(at(&t, "LL"), black("B"));
        assert_eq!(at(&t, "LLL"), red("A"));
        assert_eq!(at(&t, "LR"), black("D"));
        assert_eq!(at(&t, "R"), black("R"));
        assert_eq!(at(&t, "RL"), black("N"));
        assert_eq!(at(&t, "RLL"), red("I"));
        assert_eq!(at(&t, "RR"), black("X"));
        assert_eq!(at(&t, "RRL"), red("S"));
        for absent in ["LLR", "LRL", "LRR", "RLR", "RRR", "LLLL", "RLLL", "RRLL"] {
            assert_eq!(at(&t, absent), None, "path {}", absent);
        }
        assert_eq!(t.len(), 10);
    }

    /// Invariant: ascending inserts followed by an inner key rotate into a
    /// red left child under the root.
    #[test]
    fn ascending_then_inner_shape() {
        let t = build(&["10", "20", "30", "40", "50", "25"]);
        assert_eq!(at(&t, ""), black("40"));
        assert_eq!(at(&t, "L"), red("20"));
        assert_eq!(at(&t, "LL"), black("10"));
        assert_eq!(at(&t, "LR"), black("30"));
        assert_eq!(at(&t, "LRL"), red("25"));
        assert_eq!(at(&t, "R"), black("50"));
    }

    /// Invariant: equal keys replace the value without changing structure.
    #[test]
    fn duplicate_put_updates_in_place() {
        let mut t = build(&["b", "a", "c"]);
        t.put_str("a", "new").unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get_str("a"), Some("new"));
        assert_eq!(at(&t, "L"), black("a"));
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut t = build(&["a"]);
        let err = t.put(b"", b"v").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(t.len(), 1);
        assert!(t.get(b"").is_none());
    }

    #[test]
    fn remove_keeps_invariants() {
        let keys: Vec<String> = (0..200).map(|i| format!("k{:03}", (i * 37) % 200)).collect();
        let mut t = TreeTable::new();
        for k in &keys {
            t.put_str(k, k).unwrap();
        }
        for (i, k) in keys.iter().enumerate() {
            if i % 3 == 0 {
                t.remove(k.as_bytes()).unwrap();
                assert!(t.check().is_ok(), "after removing {}", k);
                assert!(!t.contains_key(k.as_bytes()));
            }
        }
        assert_eq!(t.len(), 200 - 67);
        assert!(matches!(t.remove(b"nope"), Err(Error::NotFound)));
        assert_eq!(t.len(), 200 - 67);
    }

    #[test]
    fn take_returns_value_and_empties() {
        let mut t = build(&["x"]);
        assert_eq!(&*t.take(b"x").unwrap(), b"x");
        assert!(t.is_empty());
        assert!(t.root.is_none());
        assert!(t.check().is_ok());
    }

    #[test]
    fn check_reports_each_violation() {
        let leaf = |k: &str, red: bool| {
            let mut n = Node::new(k.as_bytes().into(), Box::new([]));
            n.red = red;
            Some(Box::new(n))
        };

        let mut t = TreeTable::new();
        t.root = leaf("m", true);
        assert_eq!(t.find_violation(), Err(Violation::RootNotBlack));

        t.root = leaf("m", false);
        t.root.as_mut().unwrap().right = leaf("z", true);
        assert_eq!(t.find_violation(), Err(Violation::RightLeaningRed));

        t.root = leaf("m", false);
        t.root.as_mut().unwrap().left = leaf("z", true);
        assert_eq!(t.find_violation(), Err(Violation::OutOfOrder));

        t.root = leaf("m", false);
        t.root.as_mut().unwrap().left = leaf("a", false);
        assert_eq!(t.find_violation(), Err(Violation::BlackHeightMismatch));

        t.root = leaf("m", false);
        let mut l = leaf("f", true);
        l.as_mut().unwrap().left = leaf("a", true);
        t.root.as_mut().unwrap().left = l;
        assert_eq!(t.find_violation(), Err(Violation::ConsecutiveLeftRed));
        assert_eq!(Violation::ConsecutiveLeftRed.code(), 3);
        let err = t.check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IntegrityViolation);
        assert!(matches!(err, Error::Tree(Violation::ConsecutiveLeftRed)));
    }

    #[test]
    fn nearest_and_extremes() {
        let t = build(&["b", "d", "f"]);
        assert_eq!(t.find_min().unwrap().0, b"b");
        assert_eq!(t.find_max().unwrap().0, b"f");
        assert_eq!(t.find_nearest(b"a").unwrap().0, b"b");
        assert_eq!(t.find_nearest(b"d").unwrap().0, b"d");
        assert_eq!(t.find_nearest(b"e").unwrap().0, b"f");
        assert_eq!(t.find_nearest(b"z").unwrap().0, b"f");
        assert!(TreeTable::new().find_nearest(b"a").is_none());
    }

    /// Invariant: a cursor resumes after the last returned key even when the
    /// tree was rotated by removals in between.
    #[test]
    fn cursor_survives_mutation() {
        let mut t = build(&["a", "b", "c", "d", "e", "f", "g"]);
        let mut cur = TreeCursor::new();
        let mut seen = Vec::new();
        while let Some((k, _)) = t.get_next(&mut cur) {
            let k = k.to_vec();
            if k == b"c" {
                t.remove(b"c").unwrap();
                t.remove(b"d").unwrap();
            }
            seen.push(k);
        }
        assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"e".to_vec(), b"f".to_vec(), b"g".to_vec()]);
        assert!(t.get_next(&mut cur).is_none());
    }

    #[test]
    fn range_from_and_seeded_cursor_agree() {
        let t = build(&["aa", "ab", "ba", "bb", "ca"]);
        let from_iter: Vec<&[u8]> = t.range_from(b"b").map(|(k, _)| k).collect();
        let mut cur = TreeCursor::at(b"b");
        let mut from_cursor = Vec::new();
        while let Some((k, _)) = t.get_next(&mut cur) {
            from_cursor.push(k);
        }
        assert_eq!(from_iter, vec![&b"ba"[..], b"bb", b"ca"]);
        assert_eq!(from_iter, from_cursor);
    }

    #[test]
    fn custom_compare_orders_descending() {
        let mut t = build(&["a", "b", "c"]);
        t.set_compare(|a, b| b.cmp(a));
        assert!(t.check().is_ok());
        let keys: Vec<&[u8]> = t.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![&b"c"[..], b"b", b"a"]);
        t.put_str("d", "d").unwrap();
        assert_eq!(t.find_min().unwrap().0, b"d");
    }

    #[test]
    fn debug_lists_every_node() {
        let t = build(&["x", "y", "z"]);
        let mut out = Vec::new();
        t.debug(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("TreeTable: 3 entries"));
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("B y = y"));
    }
}
