// ListTable persistence and duplicate-key behavior.
//
// Files are written into a fresh temporary directory per test; nothing
// outlives the test.
use std::fs;

use kvkit::{ErrorKind, ListTable, TableCursor, TableOptions};
use tempfile::tempdir;

fn sample() -> ListTable {
    let mut t = ListTable::default();
    t.put_str("host", "example.org").unwrap();
    t.put_str("path", "/a b/c=d").unwrap();
    t.put_str("host", "mirror.example.org").unwrap();
    t
}

// Test: plain save then load into an empty table.
// Verifies: the header line, order and duplicates survive.
#[test]
fn save_and_load_plain() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("table.txt");
    let t = sample();
    assert_eq!(t.save(&path, " = ", false).unwrap(), 3);

    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("# 3 entries"));
    assert_eq!(lines.next(), Some("host = example.org"));

    let mut back = ListTable::default();
    assert_eq!(back.load(&path, " = ", false).unwrap(), 3);
    let entries: Vec<(Vec<u8>, Vec<u8>)> =
        back.iter().map(|(k, v)| (k.to_vec(), v.to_vec())).collect();
    let want: Vec<(Vec<u8>, Vec<u8>)> =
        t.iter().map(|(k, v)| (k.to_vec(), v.to_vec())).collect();
    assert_eq!(entries, want);
}

// Test: values with separators, newlines and non-ASCII bytes.
// Verifies: percent encoding makes them round trip exactly.
#[test]
fn save_and_load_encoded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("encoded.txt");
    let mut t = ListTable::default();
    t.put(b"multi", b"line one\nline two").unwrap();
    t.put(b"sep", b"a=b=c").unwrap();
    t.put(b"bin", &[0u8, 0xff, b'%', b' ']).unwrap();
    t.save(&path, "=", true).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 4);

    let mut back = ListTable::default();
    back.load(&path, "=", true).unwrap();
    assert_eq!(back.get(b"multi"), Some(&b"line one\nline two"[..]));
    assert_eq!(back.get(b"sep"), Some(&b"a=b=c"[..]));
    assert_eq!(back.get(b"bin"), Some(&[0u8, 0xff, b'%', b' '][..]));
}

// Test: hand-written input with comments, blanks and junk lines.
// Verifies: only well-formed lines are added and they are trimmed.
#[test]
fn load_skips_noise() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hand.txt");
    fs::write(
        &path,
        "# settings\n\n  name :  value  \nno separator here\nport: 8080\r\n",
    )
    .unwrap();
    let mut t = ListTable::default();
    assert_eq!(t.load(&path, ":", false).unwrap(), 2);
    assert_eq!(t.get_str("name"), Some("value"));
    assert_eq!(t.get_int("port").unwrap(), 8080);
}

// Test: malformed input.
// Verifies: an empty key or a bad escape fails with the line number.
#[test]
fn load_reports_parse_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.txt");
    fs::write(&path, "ok=1\n=orphan\n").unwrap();
    let err = ListTable::default().load(&path, "=", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);
    assert!(err.to_string().contains("line 2"), "{}", err);

    // Good lines ahead of the bad one are not applied either.
    fs::write(&path, "a=1\nb=2\n=bad\n").unwrap();
    let mut t = ListTable::default();
    t.put_str("keep", "me").unwrap();
    assert!(t.load(&path, "=", false).is_err());
    assert_eq!(t.len(), 1);
    assert!(!t.contains_key(b"a"));

    fs::write(&path, "k=%zz\n").unwrap();
    let err = ListTable::default().load(&path, "=", true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);

    let missing = dir.path().join("missing.txt");
    let err = ListTable::default().load(&missing, "=", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);
}

// Test: loading into a unique, case-insensitive table.
// Verifies: later lines replace earlier ones regardless of case.
#[test]
fn load_respects_table_modes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("modes.txt");
    fs::write(&path, "Color=red\nCOLOR=blue\nshape=round\n").unwrap();
    let mut t = ListTable::new(TableOptions::new().unique(true).case_insensitive(true));
    t.load(&path, "=", false).unwrap();
    assert_eq!(t.len(), 2);
    assert_eq!(t.get_str("color"), Some("blue"));
}

// Test: pruning entries through a filtered cursor.
#[test]
fn prune_by_name() {
    let mut t = sample();
    let mut cursor = TableCursor::new();
    while t.get_next(&mut cursor, Some("host")).is_some() {
        t.remove_current(&cursor).unwrap();
    }
    assert_eq!(t.len(), 1);
    assert!(!t.contains_key(b"host"));
}
