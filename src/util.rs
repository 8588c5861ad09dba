//! Small helpers shared by several containers.

use std::io::{self, Write};

use crate::error::{Error, Result};

/// Copy `bytes` into a fresh allocation, reporting allocation failure
/// instead of aborting.
pub(crate) fn try_copy(bytes: &[u8]) -> Result<Box<[u8]>> {
    let mut v = Vec::new();
    v.try_reserve_exact(bytes.len())
        .map_err(|_| Error::OutOfMemory { size: bytes.len() })?;
    v.extend_from_slice(bytes);
    Ok(v.into_boxed_slice())
}

/// Decimal text back to an integer.
pub(crate) fn parse_int(bytes: &[u8]) -> Result<i64> {
    core::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or(Error::InvalidArgument("element is not an integer"))
}

pub(crate) fn parse_str(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| Error::InvalidArgument("element is not valid UTF-8"))
}

/// Map an element index in `[-len, len)` to `[0, len)`.
pub(crate) fn element_index(index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        len as isize + index
    } else {
        index
    };
    if resolved < 0 || resolved as usize >= len {
        return Err(Error::out_of_range(index, len));
    }
    Ok(resolved as usize)
}

/// Map an insertion index in `[-(len + 1), len]` to `[0, len]`; `-1`
/// appends.
pub(crate) fn insert_index(index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        len as isize + 1 + index
    } else {
        index
    };
    if resolved < 0 || resolved as usize > len {
        return Err(Error::out_of_range(index, len));
    }
    Ok(resolved as usize)
}

/// Write `bytes` as text, escaping anything that is not printable ASCII.
pub(crate) fn write_escaped<W: Write + ?Sized>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    for &b in bytes {
        match b {
            b'\\' => w.write_all(b"\\\\")?,
            0x20..=0x7e => w.write_all(&[b])?,
            b'\n' => w.write_all(b"\\n")?,
            b'\t' => w.write_all(b"\\t")?,
            _ => write!(w, "\\x{:02x}", b)?,
        }
    }
    Ok(())
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&b)
}

/// Percent-encode everything except ASCII alphanumerics and `-_.!~*'()`.
pub(crate) fn percent_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Reverse [`percent_encode`]; `+` decodes to a space.
pub(crate) fn percent_decode(text: &str) -> core::result::Result<Vec<u8>, String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .ok_or_else(|| format!("truncated escape at byte {}", i))?;
                let hex = core::str::from_utf8(hex).map_err(|_| "non-ASCII escape".to_string())?;
                let b = u8::from_str_radix(hex, 16)
                    .map_err(|_| format!("bad escape %{} at byte {}", hex, i))?;
                out.push(b);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_index_accepts_negative() {
        assert_eq!(element_index(0, 3).unwrap(), 0);
        assert_eq!(element_index(-1, 3).unwrap(), 2);
        assert_eq!(element_index(-3, 3).unwrap(), 0);
        assert!(element_index(3, 3).is_err());
        assert!(element_index(-4, 3).is_err());
        assert!(element_index(0, 0).is_err());
    }

    #[test]
    fn insert_index_allows_end() {
        assert_eq!(insert_index(3, 3).unwrap(), 3);
        assert_eq!(insert_index(-1, 3).unwrap(), 3);
        assert_eq!(insert_index(-4, 3).unwrap(), 0);
        assert_eq!(insert_index(0, 0).unwrap(), 0);
        assert!(insert_index(4, 3).is_err());
        assert!(insert_index(-5, 3).is_err());
    }

    #[test]
    fn percent_codec() {
        let raw = b"a b=c\n\x00%";
        let enc = percent_encode(raw);
        assert_eq!(enc, "a%20b%3Dc%0A%00%25");
        assert_eq!(percent_decode(&enc).unwrap(), raw.to_vec());
        assert_eq!(percent_decode("x+y").unwrap(), b"x y".to_vec());
        assert!(percent_decode("%4").is_err());
        assert!(percent_decode("%zz").is_err());
    }

    #[test]
    fn escaped_output() {
        let mut out = Vec::new();
        write_escaped(&mut out, b"ok\n\x01").unwrap();
        assert_eq!(out, b"ok\\n\\x01".to_vec());
    }
}
