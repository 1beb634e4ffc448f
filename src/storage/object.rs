//! Objects that can be stored and referenced from an index.

use crate::common::{Oid, Result};

/// A value the object store can persist and materialize.
///
/// The store assigns the identifier on first persist and hands it back
/// through [`bind`](Persistent::bind). [`decode`](Persistent::decode)
/// receives the same identifier when the object is loaded again.
pub trait Persistent: Sized {
    /// Identifier, or `None` if the object has never been stored.
    fn oid(&self) -> Option<Oid>;

    /// Record the identifier assigned by the store.
    fn bind(&mut self, oid: Oid);

    /// Serialized payload.
    fn encode(&self) -> Vec<u8>;

    /// Rebuild an object from its payload.
    fn decode(oid: Oid, bytes: &[u8]) -> Result<Self>;
}

/// An opaque byte payload.
///
/// # Example
/// ```
/// use pagedindex::storage::{Blob, Persistent};
///
/// let blob = Blob::new(b"hello".to_vec());
/// assert!(blob.oid().is_none());
/// assert_eq!(blob.data(), b"hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    oid: Option<Oid>,
    data: Vec<u8>,
}

impl Blob {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            oid: None,
            data: data.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload as UTF-8 text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

impl Persistent for Blob {
    fn oid(&self) -> Option<Oid> {
        self.oid
    }

    fn bind(&mut self, oid: Oid) {
        self.oid = Some(oid);
    }

    fn encode(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn decode(oid: Oid, bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            oid: Some(oid),
            data: bytes.to_vec(),
        })
    }
}
