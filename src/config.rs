//! Construction options.
//!
//! Options are plain data: they derive `serde` traits so they can be
//! embedded in an application's own configuration, and each has a
//! `validate()` that constructors call before building anything.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bucket count used when a hash table is created with `0`.
pub const DEFAULT_BUCKETS: usize = 1024;

/// Options for [`crate::List`] and the stack/queue adapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Maximum number of elements; `0` means unbounded.
    pub max_len: usize,
}

impl ListOptions {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Mode flags of a [`crate::ListTable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// `put` replaces every existing entry with the same key.
    pub unique: bool,
    /// Keys compare equal ignoring ASCII case.
    pub case_insensitive: bool,
    /// New entries are prepended instead of appended.
    pub insert_top: bool,
    /// New entries go after the last entry whose key is not greater, so
    /// the table stays sorted by key. Takes precedence over `insert_top`.
    pub keep_sorted: bool,
    /// Lookups walk head to tail instead of tail to head.
    pub lookup_forward: bool,
}

impl TableOptions {
    pub const fn new() -> Self {
        Self {
            unique: false,
            case_insensitive: false,
            insert_top: false,
            keep_sorted: false,
            lookup_forward: false,
        }
    }

    pub const fn unique(mut self, on: bool) -> Self {
        self.unique = on;
        self
    }

    pub const fn case_insensitive(mut self, on: bool) -> Self {
        self.case_insensitive = on;
        self
    }

    pub const fn insert_top(mut self, on: bool) -> Self {
        self.insert_top = on;
        self
    }

    pub const fn keep_sorted(mut self, on: bool) -> Self {
        self.keep_sorted = on;
        self
    }

    pub const fn lookup_forward(mut self, on: bool) -> Self {
        self.lookup_forward = on;
        self
    }

    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Options for [`crate::HashTable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HashTableOptions {
    /// Initial bucket count; `0` selects [`DEFAULT_BUCKETS`].
    pub buckets: usize,
    /// Grow (doubling the buckets) once `len / buckets` exceeds this.
    /// `0.0` disables automatic growth.
    pub max_load_factor: f32,
}

impl Default for HashTableOptions {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS,
            max_load_factor: 0.0,
        }
    }
}

impl HashTableOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.max_load_factor.is_finite() || self.max_load_factor < 0.0 {
            return Err(Error::InvalidArgument(
                "max_load_factor must be finite and non-negative",
            ));
        }
        Ok(())
    }

    pub(crate) fn bucket_count(&self) -> usize {
        if self.buckets == 0 {
            DEFAULT_BUCKETS
        } else {
            self.buckets
        }
    }
}

/// Capacity growth policy of a [`crate::Vector`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Growth {
    /// One more slot per overflow.
    #[default]
    Exact,
    /// `(old + 1) * 2` per overflow.
    Double,
    /// `old + initial_capacity` per overflow.
    Linear,
}

impl Growth {
    /// Capacity after an overflow at `old` slots.
    pub fn next_capacity(self, old: usize, initial: usize) -> usize {
        match self {
            Growth::Exact => old + 1,
            Growth::Double => (old + 1) * 2,
            Growth::Linear => old + initial.max(1),
        }
    }
}

/// Options for [`crate::Vector`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorOptions {
    pub growth: Growth,
}

impl VectorOptions {
    pub const fn with_growth(growth: Growth) -> Self {
        Self { growth }
    }

    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_policies() {
        assert_eq!(Growth::Exact.next_capacity(4, 4), 5);
        assert_eq!(Growth::Double.next_capacity(4, 4), 10);
        assert_eq!(Growth::Double.next_capacity(0, 0), 2);
        assert_eq!(Growth::Linear.next_capacity(4, 3), 7);
        assert_eq!(Growth::Linear.next_capacity(4, 0), 5);
    }

    #[test]
    fn hash_options_validate() {
        assert!(HashTableOptions::default().validate().is_ok());
        let bad = HashTableOptions {
            buckets: 8,
            max_load_factor: f32::NAN,
        };
        assert!(bad.validate().is_err());
        let zero = HashTableOptions {
            buckets: 0,
            max_load_factor: 0.0,
        };
        assert_eq!(zero.bucket_count(), DEFAULT_BUCKETS);
    }

    #[test]
    fn table_options_serde() {
        let opts = TableOptions::new().unique(true).lookup_forward(true);
        let json = serde_json::to_string(&opts).unwrap();
        let back: TableOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);

        let v: VectorOptions = serde_json::from_str(r#"{"growth":"Double"}"#).unwrap();
        assert_eq!(v.growth, Growth::Double);
    }
}
