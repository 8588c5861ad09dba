//! Crate-wide error type.
//!
//! Every fallible operation returns [`Result`]. The variant tells what went
//! wrong; [`Error::kind`] folds variants into the coarse categories callers
//! usually branch on.

use thiserror::Error;

use crate::tree_table::Violation;

/// Main error type for all containers.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty key, wrong element size, inconsistent options and the like.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A fallible allocation failed while copying or growing.
    #[error("memory allocation failed: requested {size} bytes")]
    OutOfMemory {
        /// Number of bytes requested
        size: usize,
    },

    /// A bounded container has no room left.
    #[error("out of space: {0}")]
    OutOfSpace(&'static str),

    /// Lookup or removal of an absent key.
    #[error("key not found")]
    NotFound,

    /// Index outside the valid range of a sequence.
    #[error("index {index} out of range for length {len}")]
    OutOfRange {
        /// The rejected index, as given by the caller
        index: isize,
        /// Length of the sequence at the time of the call
        len: usize,
    },

    /// The LLRB shape or ordering invariants do not hold.
    #[error("tree integrity violation: {0}")]
    Tree(Violation),

    /// The static hash region is inconsistent.
    #[error("static hash integrity violation: {0}")]
    Layout(String),

    /// I/O failure in `debug`, `save` or `load`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed line while loading a linked table.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        message: String,
    },
}

/// Coarse error categories.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    OutOfMemory,
    OutOfSpace,
    NotFound,
    OutOfRange,
    IntegrityViolation,
    IoFailure,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Error::OutOfSpace(_) => ErrorKind::OutOfSpace,
            Error::NotFound => ErrorKind::NotFound,
            Error::OutOfRange { .. } => ErrorKind::OutOfRange,
            Error::Tree(_) | Error::Layout(_) => ErrorKind::IntegrityViolation,
            Error::Io(_) | Error::Parse { .. } => ErrorKind::IoFailure,
        }
    }

    pub(crate) fn layout<S: Into<String>>(message: S) -> Self {
        Error::Layout(message.into())
    }

    pub(crate) fn out_of_range(index: isize, len: usize) -> Self {
        Error::OutOfRange { index, len }
    }
}

impl From<Violation> for Error {
    fn from(v: Violation) -> Self {
        Error::Tree(v)
    }
}

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_fold_variants() {
        assert_eq!(Error::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(Error::out_of_range(-4, 3).kind(), ErrorKind::OutOfRange);
        assert_eq!(
            Error::Tree(Violation::RootNotBlack).kind(),
            ErrorKind::IntegrityViolation
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(Error::from(io).kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn messages_carry_details() {
        let e = Error::out_of_range(7, 2);
        assert_eq!(e.to_string(), "index 7 out of range for length 2");
        let e = Error::OutOfMemory { size: 64 };
        assert!(e.to_string().contains("64"));
    }
}
