//! Error types for the paged index.

use thiserror::Error;

use crate::common::config::ConfigError;
use crate::index::KeyType;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the storage layer and the index.
///
/// Storage errors come from the page and object collaborators and are passed
/// through unchanged. Index errors are contract violations detected before any
/// state is mutated.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage configuration is out of range.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Requested page does not exist on disk.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// Attempted to free or unpin a page that is still in use.
    #[error("Page {0} is still pinned")]
    PagePinned(u32),

    /// Stored checksum does not match the page contents.
    #[error("Page {0} failed checksum verification")]
    Corrupted(u32),

    /// The file is not a database created by this crate.
    #[error("Bad database header: {0}")]
    BadHeader(String),

    /// Identifier does not refer to a live object.
    #[error("Object {0} not found")]
    ObjectNotFound(u32),

    /// Encoded object does not fit into a single page.
    #[error("Object of {size} bytes exceeds the {max} byte limit")]
    ObjectTooLarge { size: usize, max: usize },

    /// An object payload could not be decoded.
    #[error("Object {oid} could not be decoded: {reason}")]
    Decode { oid: u32, reason: String },

    /// Key type tag differs from the one the index was created with.
    #[error("Incompatible key type: index holds {expected:?}, got {actual:?}")]
    IncompatibleKeyType { expected: KeyType, actual: KeyType },

    /// A point lookup matched several entries, or a keyed removal was
    /// attempted on a non-unique index.
    #[error("Key is not unique")]
    KeyNotUnique,

    /// The entry to remove is not in the index.
    #[error("Key not found")]
    KeyNotFound,

    /// The key class has no supported type tag.
    #[error("Unsupported index type: {0}")]
    UnsupportedIndexType(String),

    /// String key exceeds the per-key limit.
    #[error("Key too large: {size} bytes (max {max})")]
    KeyTooLarge { size: usize, max: usize },

    /// Mutation attempted through a read-only cursor.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Cursor advanced past its last entry.
    #[error("No such element")]
    NoSuchElement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(42);
        assert_eq!(format!("{}", err), "Page 42 not found");

        let err = Error::NoFreeFrames;
        assert_eq!(format!("{}", err), "No free frames available in buffer pool");

        let err = Error::IncompatibleKeyType {
            expected: KeyType::I32,
            actual: KeyType::String,
        };
        assert_eq!(
            format!("{}", err),
            "Incompatible key type: index holds I32, got String"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
