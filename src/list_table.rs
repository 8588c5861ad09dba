//! ListTable: insertion-ordered key/value table on a linked list.
//!
//! Unlike the hashed containers a list table keeps entries in a
//! caller-visible order and may hold the same key more than once. Mode flags
//! come from [`TableOptions`]:
//! - `unique`: `put` first removes every entry with the same key;
//! - `case_insensitive`: keys compare equal ignoring ASCII case;
//! - `insert_top`: new entries go to the head instead of the tail;
//! - `keep_sorted`: new entries go to their sorted position by key;
//! - `lookup_forward`: lookups scan head to tail instead of tail to head.
//!
//! With the defaults (append, scan backwards) `get` of a duplicated key
//! returns the most recently added value.
//!
//! Each entry carries the FNV-1 hash of its (case-folded) key so scans
//! compare a `u32` before touching key bytes.

use core::cmp::Ordering;
use core::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use slotmap::DefaultKey;

use crate::config::TableOptions;
use crate::error::{Error, Result};
use crate::hash::fnv1_32;
use crate::list::{LinkedSlots, Position};
use crate::traits::{Container, Map};
use crate::util::{percent_decode, percent_encode, try_copy, write_escaped};

struct Entry {
    hash: u32,
    key: Box<[u8]>,
    value: Box<[u8]>,
}

/// Cursor for [`ListTable::get_next`]; also names the entry for
/// [`ListTable::remove_current`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TableCursor {
    pos: Position,
}

impl TableCursor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Ordered multimap over a linked list.
pub struct ListTable {
    entries: LinkedSlots<Entry>,
    opts: TableOptions,
}

impl Default for ListTable {
    fn default() -> Self {
        Self::new(TableOptions::default())
    }
}

impl ListTable {
    pub fn new(opts: TableOptions) -> Self {
        Self {
            entries: LinkedSlots::new(),
            opts,
        }
    }

    pub fn with_options(opts: TableOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self::new(opts))
    }

    pub fn options(&self) -> TableOptions {
        self.opts
    }

    /// Switch lookup direction at runtime.
    pub fn set_lookup_forward(&mut self, on: bool) {
        self.opts.lookup_forward = on;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    fn key_hash(&self, key: &[u8]) -> u32 {
        if self.opts.case_insensitive {
            fnv1_32(&key.to_ascii_lowercase())
        } else {
            fnv1_32(key)
        }
    }

    fn key_eq(&self, a: &[u8], b: &[u8]) -> bool {
        if self.opts.case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }

    fn matches(&self, e: &Entry, hash: u32, key: &[u8]) -> bool {
        e.hash == hash && self.key_eq(&e.key, key)
    }

    /// Entries with `key`, in lookup order.
    fn lookup<'a, 'k>(&'a self, key: &'k [u8]) -> impl Iterator<Item = (DefaultKey, &'a Entry)> + 'k
    where
        'a: 'k,
    {
        let hash = self.key_hash(key);
        let it: Box<dyn Iterator<Item = (DefaultKey, &'a Entry)> + 'k> = if self.opts.lookup_forward {
            Box::new(self.entries.iter())
        } else {
            Box::new(self.entries.iter_rev())
        };
        it.filter(move |(_, e)| self.matches(e, hash, key))
    }

    /// Add an entry. In a unique table, earlier entries with the same key
    /// are removed first. On allocation failure nothing changes.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("empty key"));
        }
        let entry = Entry {
            hash: self.key_hash(key),
            key: try_copy(key)?,
            value: try_copy(value)?,
        };
        if self.opts.unique {
            self.remove(key);
        }
        if self.opts.keep_sorted {
            let after = self
                .entries
                .iter()
                .find(|(_, e)| self.cmp_keys(&e.key, key) == Ordering::Greater)
                .map(|(k, _)| k);
            match after {
                Some(before) => self.entries.insert_before(before, entry),
                None => self.entries.push_back(entry),
            };
        } else if self.opts.insert_top {
            self.entries.push_front(entry);
        } else {
            self.entries.push_back(entry);
        }
        Ok(())
    }

    fn cmp_keys(&self, a: &[u8], b: &[u8]) -> Ordering {
        if self.opts.case_insensitive {
            cmp_ignore_case(a, b)
        } else {
            a.cmp(b)
        }
    }

    pub fn put_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key.as_bytes(), value.as_bytes())
    }

    pub fn put_fmt(&mut self, key: &str, args: fmt::Arguments<'_>) -> Result<()> {
        self.put(key.as_bytes(), args.to_string().as_bytes())
    }

    pub fn put_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.put(key.as_bytes(), value.to_string().as_bytes())
    }

    /// First value for `key` in lookup order.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.lookup(key).next().map(|(_, e)| &*e.value)
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

    /// Copies of every value for `key`, in lookup order.
    pub fn get_multi(&self, key: &[u8]) -> Vec<Vec<u8>> {
        self.lookup(key).map(|(_, e)| e.value.to_vec()).collect()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.lookup(key).next().is_some()
    }

    /// Remove every entry with `key`; returns how many were removed.
    pub fn remove(&mut self, key: &[u8]) -> usize {
        let doomed: Vec<DefaultKey> = self.lookup(key).map(|(k, _)| k).collect();
        for k in &doomed {
            self.entries.remove(*k);
        }
        doomed.len()
    }

    /// Next entry head to tail, optionally only those named `name`.
    pub fn get_next(&self, cursor: &mut TableCursor, name: Option<&str>) -> Option<(&[u8], &[u8])> {
        let want = name.map(|n| (self.key_hash(n.as_bytes()), n.as_bytes()));
        loop {
            let k = cursor.pos.advance(&self.entries)?;
            let e = self.entries.get(k)?;
            match want {
                Some((hash, key)) if !self.matches(e, hash, key) => continue,
                _ => return Some((&e.key[..], &e.value[..])),
            }
        }
    }

    /// Remove the entry `cursor` returned last. The cursor continues with
    /// the entry after it.
    pub fn remove_current(&mut self, cursor: &TableCursor) -> Result<()> {
        let k = cursor.pos.last().ok_or(Error::NotFound)?;
        self.entries.remove(k).map(drop).ok_or(Error::NotFound)
    }

    /// Stable sort by key; ASCII case is ignored in a case-insensitive
    /// table.
    pub fn sort(&mut self) {
        let ci = self.opts.case_insensitive;
        self.entries.sort_by(|a, b| {
            if ci {
                cmp_ignore_case(&a.key, &b.key)
            } else {
                a.key.cmp(&b.key)
            }
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.entries.iter().map(|(_, e)| (&e.key[..], &e.value[..]))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Write a `#` header then `key<sep>value` per line, head to tail.
    /// With `encode`, values are percent-encoded. Returns the number of
    /// entries written.
    pub fn save<P: AsRef<Path>>(&self, path: P, sep: &str, encode: bool) -> Result<usize> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "# {} entries, separator {:?}", self.len(), sep)?;
        for (k, v) in self.iter() {
            out.write_all(k)?;
            out.write_all(sep.as_bytes())?;
            if encode {
                out.write_all(percent_encode(v).as_bytes())?;
            } else {
                out.write_all(v)?;
            }
            out.write_all(b"\n")?;
        }
        out.flush()?;
        log::debug!("list table: saved {} entries to {}", self.len(), path.display());
        Ok(self.len())
    }

    /// Append entries read from `path` via [`ListTable::put`]. Blank lines,
    /// `#` comments and lines without `sep` are skipped; key and value are
    /// trimmed. The whole file is parsed before anything is added, so a
    /// failed load leaves the table unchanged. Returns the number of
    /// entries added.
    pub fn load<P: AsRef<Path>>(&mut self, path: P, sep: &str, decode: bool) -> Result<usize> {
        if sep.is_empty() {
            return Err(Error::InvalidArgument("empty separator"));
        }
        let path = path.as_ref();
        let parsed = parse_lines(BufReader::new(File::open(path)?), sep.as_bytes(), decode)?;
        if parsed.skipped > 0 {
            log::warn!(
                "list table: {} lines without separator skipped in {}",
                parsed.skipped,
                path.display()
            );
        }
        let added = parsed.entries.len();
        for (key, value) in &parsed.entries {
            self.put(key, value)?;
        }
        log::debug!("list table: loaded {} entries from {}", added, path.display());
        Ok(added)
    }

    /// One `key=value` line per entry, head to tail.
    pub fn debug<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "ListTable: {} entries, {:?}", self.len(), self.opts)?;
        for (k, v) in self.iter() {
            write_escaped(out, k)?;
            out.write_all(b"=")?;
            write_escaped(out, v)?;
            writeln!(out)?;
        }
        Ok(())
    }
}

struct Parsed {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    skipped: usize,
}

fn parse_lines<R: BufRead>(mut reader: R, sep: &[u8], decode: bool) -> Result<Parsed> {
    let mut parsed = Parsed {
        entries: Vec::new(),
        skipped: 0,
    };
    let mut line = Vec::new();
    let mut lineno = 0usize;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(parsed);
        }
        lineno += 1;
        let text = line.trim_ascii();
        if text.is_empty() || text[0] == b'#' {
            continue;
        }
        let Some(at) = find_sub(text, sep) else {
            parsed.skipped += 1;
            continue;
        };
        let key = text[..at].trim_ascii();
        let raw = text[at + sep.len()..].trim_ascii();
        if key.is_empty() {
            return Err(Error::Parse {
                line: lineno,
                message: "empty key".into(),
            });
        }
        let value = if decode {
            let s = core::str::from_utf8(raw).map_err(|_| Error::Parse {
                line: lineno,
                message: "encoded value is not ASCII".into(),
            })?;
            percent_decode(s).map_err(|message| Error::Parse {
                line: lineno,
                message,
            })?
        } else {
            raw.to_vec()
        };
        parsed.entries.push((key.to_vec(), value));
    }
}

fn cmp_ignore_case(a: &[u8], b: &[u8]) -> Ordering {
    a.iter()
        .map(u8::to_ascii_lowercase)
        .cmp(b.iter().map(u8::to_ascii_lowercase))
}

fn find_sub(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}

impl fmt::Debug for ListTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl Container for ListTable {
    fn len(&self) -> usize {
        ListTable::len(self)
    }

    fn clear(&mut self) {
        ListTable::clear(self)
    }
}

impl Map for ListTable {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        ListTable::put(self, key, value)
    }

    fn get_owned(&self, key: &[u8]) -> Result<Vec<u8>> {
        ListTable::get_owned(self, key)
    }

    fn remove(&mut self, key: &[u8]) -> Result<()> {
        match ListTable::remove(self, key) {
            0 => Err(Error::NotFound),
            _ => Ok(()),
        }
    }

    fn contains_key(&self, key: &[u8]) -> bool {
        ListTable::contains_key(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn keys(t: &ListTable) -> Vec<String> {
        t.iter()
            .map(|(k, _)| String::from_utf8(k.to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn value_outlives_lookup_key() {
        let mut t = ListTable::default();
        t.put_str("name", "value").unwrap();
        let found = {
            let wanted = String::from("name");
            t.get(wanted.as_bytes())
        };
        assert_eq!(found, Some(&b"value"[..]));
    }

    #[test]
    fn duplicates_follow_lookup_direction() {
        let mut t = ListTable::default();
        t.put_str("e1", "1").unwrap();
        t.put_str("e2", "2").unwrap();
        t.put_str("e2", "3").unwrap();
        t.put_str("e2", "4").unwrap();
        assert_eq!(t.get_str("e2"), Some("4"));
        assert_eq!(t.get_multi(b"e2"), [b"4".to_vec(), b"3".to_vec(), b"2".to_vec()]);
        t.set_lookup_forward(true);
        assert_eq!(t.get_str("e2"), Some("2"));
        assert_eq!(t.get_multi(b"e2"), [b"2".to_vec(), b"3".to_vec(), b"4".to_vec()]);
    }

    #[test]
    fn unique_replaces() {
        let mut t = ListTable::new(TableOptions::new().unique(true));
        t.put_str("a", "1").unwrap();
        t.put_str("b", "2").unwrap();
        t.put_str("a", "3").unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(keys(&t), ["b", "a"]);
        assert_eq!(t.get_str("a"), Some("3"));
    }

    #[test]
    fn insert_top_and_case_insensitive() {
        let mut t = ListTable::new(TableOptions::new().insert_top(true).case_insensitive(true));
        t.put_str("One", "1").unwrap();
        t.put_str("two", "2").unwrap();
        assert_eq!(keys(&t), ["two", "One"]);
        assert_eq!(t.get_str("ONE"), Some("1"));
        assert_eq!(t.remove(b"TWO"), 1);
        assert_eq!(t.remove(b"TWO"), 0);
    }

    #[test]
    fn remove_counts_all_matches() {
        let mut t = ListTable::default();
        for v in ["1", "2", "3"] {
            t.put_str("k", v).unwrap();
        }
        t.put_str("other", "x").unwrap();
        assert_eq!(t.remove(b"k"), 3);
        assert_eq!(keys(&t), ["other"]);
        assert_eq!(Map::remove(&mut t, b"k").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn filtered_cursor_and_remove_current() {
        let mut t = ListTable::default();
        for (k, v) in [("a", "1"), ("b", "2"), ("a", "3"), ("c", "4"), ("a", "5")] {
            t.put_str(k, v).unwrap();
        }
        let mut c = TableCursor::new();
        let mut seen = Vec::new();
        loop {
            let v = match t.get_next(&mut c, Some("a")) {
                Some((_, v)) => v.to_vec(),
                None => break,
            };
            if v == b"3" {
                t.remove_current(&c).unwrap();
            }
            seen.push(v);
        }
        assert_eq!(seen, [b"1", b"3", b"5"]);
        assert_eq!(t.get_multi(b"a"), [b"5".to_vec(), b"1".to_vec()]);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn sort_is_stable() {
        let mut t = ListTable::default();
        for (k, v) in [("b", "1"), ("a", "2"), ("b", "3"), ("a", "4")] {
            t.put_str(k, v).unwrap();
        }
        t.sort();
        let got: Vec<(&[u8], &[u8])> = t.iter().collect();
        assert_eq!(
            got,
            [
                (&b"a"[..], &b"2"[..]),
                (&b"a"[..], &b"4"[..]),
                (&b"b"[..], &b"1"[..]),
                (&b"b"[..], &b"3"[..]),
            ]
        );
    }

    #[test]
    fn keep_sorted_inserts_in_order() {
        let mut t = ListTable::new(TableOptions::new().keep_sorted(true).insert_top(true));
        for (k, v) in [("m", "1"), ("c", "2"), ("x", "3"), ("c", "4"), ("a", "5")] {
            t.put_str(k, v).unwrap();
        }
        assert_eq!(keys(&t), ["a", "c", "c", "m", "x"]);
        // equal keys keep insertion order
        assert_eq!(t.get_multi(b"c"), [b"4".to_vec(), b"2".to_vec()]);
    }

    #[test]
    fn typed_helpers() {
        let mut t = ListTable::default();
        t.put_int("n", 12).unwrap();
        t.put_fmt("f", format_args!("{}+{}", 1, 2)).unwrap();
        assert_eq!(t.get_int("n").unwrap(), 12);
        assert_eq!(t.get_str("f"), Some("1+2"));
        assert_eq!(t.get_owned(b"zz").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(t.put(b"", b"x").unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn find_sub_positions() {
        assert_eq!(find_sub(b"a=b=c", b"="), Some(1));
        assert_eq!(find_sub(b"key::v", b"::"), Some(3));
        assert_eq!(find_sub(b"nothing", b"::"), None);
    }
}
