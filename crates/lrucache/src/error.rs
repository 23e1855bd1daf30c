//! Error types for lrucache

use std::fmt;

/// Result type alias for fallible cache construction
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Capacity must hold at least one entry
    ZeroCapacity,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZeroCapacity => write!(f, "Cache capacity must be greater than 0"),
        }
    }
}

impl std::error::Error for Error {}
