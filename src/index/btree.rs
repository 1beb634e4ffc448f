//! The index: root bookkeeping on top of the page operations.

use std::marker::PhantomData;

use tracing::{debug, info, trace};

use crate::common::{Error, Oid, PageId, Result};
use crate::storage::{MarkSet, Persistent, Storage};

use super::cursor::Cursor;
use super::key::{Entry, Key, KeyType};
use super::meta::IndexMeta;
use super::node::{item_count, locator, Locator};
use super::outcome::Outcome;
use super::page_ops;

/// How the index reacts to the outcome of a page-level mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reaction {
    /// An entry was added or removed.
    Applied,
    /// An existing entry now refers to another object.
    Replaced,
    /// An equal key blocked the insert.
    Rejected,
}

/// A persistent ordered index from typed keys to stored objects.
///
/// The index owns the tree's root page, height, entry count, key type and
/// uniqueness flag, and writes them to its own 17-byte record at the end of
/// every successful mutation. Everything below the root is delegated to
/// [`page_ops`].
///
/// Mutations take `&mut self`; share an index across threads behind an
/// external lock.
///
/// # Example
/// ```no_run
/// use pagedindex::common::config::StorageConfig;
/// use pagedindex::index::{Index, KeyType};
/// use pagedindex::storage::{Blob, Storage};
///
/// let storage = Storage::create("people.db", &StorageConfig::default())?;
/// let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::String, true)?;
///
/// index.put("ada", &mut Blob::new("Ada Lovelace"))?;
/// let ada = index.get("ada")?;
/// assert_eq!(ada.and_then(|b| b.as_str().map(str::to_owned)).as_deref(), Some("Ada Lovelace"));
/// # Ok::<(), pagedindex::Error>(())
/// ```
pub struct Index<'s, T> {
    storage: &'s Storage,
    oid: Oid,
    meta: IndexMeta,
    locate: Locator,
    _marker: PhantomData<fn() -> T>,
}

impl<'s, T: Persistent> Index<'s, T> {
    /// Create an empty index and store its record.
    pub fn create(storage: &'s Storage, key_type: KeyType, unique: bool) -> Result<Self> {
        let meta = IndexMeta::empty(key_type, unique);
        let oid = storage.store_new_object(&meta.encode())?;
        info!(%oid, ?key_type, unique, "created index");
        Ok(Self::with_meta(storage, oid, meta))
    }

    /// Create an empty index keyed by values of the Rust type `K`.
    ///
    /// # Errors
    /// - `Error::UnsupportedIndexType` if `K` has no key type
    pub fn create_for<K: 'static>(storage: &'s Storage, unique: bool) -> Result<Self> {
        Self::create(storage, KeyType::for_type::<K>()?, unique)
    }

    /// Reopen an index from its stored record.
    pub fn open(storage: &'s Storage, oid: Oid) -> Result<Self> {
        let meta = IndexMeta::decode(oid, &storage.load_bytes(oid)?)?;
        info!(%oid, key_type = ?meta.key_type, count = meta.count, height = meta.height, "opened index");
        Ok(Self::with_meta(storage, oid, meta))
    }

    fn with_meta(storage: &'s Storage, oid: Oid, meta: IndexMeta) -> Self {
        Self {
            storage,
            oid,
            locate: locator(meta.key_type),
            meta,
            _marker: PhantomData,
        }
    }

    /// Identifier of the index's own record.
    pub fn oid(&self) -> Oid {
        self.oid
    }

    /// Type tag all keys of this index must carry.
    pub fn key_type(&self) -> KeyType {
        self.meta.key_type
    }

    /// Whether the index rejects a second entry with an equal key.
    pub fn is_unique(&self) -> bool {
        self.meta.unique
    }

    /// Page levels from root to leaf; 0 for an empty tree.
    pub fn height(&self) -> u32 {
        self.meta.height
    }

    /// Number of entries.
    pub fn size(&self) -> usize {
        self.meta.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.meta.count == 0
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// The object stored under `key`, if any.
    ///
    /// # Errors
    /// - `Error::IncompatibleKeyType` if `key` is not of the index's type
    /// - `Error::KeyNotUnique` if several entries share `key`
    pub fn get(&self, key: impl Into<Key>) -> Result<Option<T>> {
        let key = key.into();
        self.check_key(&key)?;
        let Some(root) = self.meta.root else {
            return Ok(None);
        };

        let mut oids = Vec::new();
        page_ops::find(
            self.storage,
            root,
            Some(&key),
            Some(&key),
            self.meta.key_type,
            self.meta.height,
            &mut oids,
        )?;
        match oids.as_slice() {
            [] => Ok(None),
            [oid] => self.storage.load(*oid).map(Some),
            _ => Err(Error::KeyNotUnique),
        }
    }

    /// Objects with keys in `from..=till`, in key order. `None` leaves a
    /// side open.
    pub fn range(&self, from: Option<Key>, till: Option<Key>) -> Result<Vec<T>> {
        for bound in [&from, &till].into_iter().flatten() {
            self.check_key(bound)?;
        }
        let Some(root) = self.meta.root else {
            return Ok(Vec::new());
        };

        let mut oids = Vec::new();
        page_ops::find(
            self.storage,
            root,
            from.as_ref(),
            till.as_ref(),
            self.meta.key_type,
            self.meta.height,
            &mut oids,
        )?;
        self.load_all(oids)
    }

    /// Objects whose string key starts with `prefix`, in key order.
    ///
    /// # Errors
    /// - `Error::IncompatibleKeyType` if the index does not have string keys
    pub fn prefix_search(&self, prefix: &str) -> Result<Vec<T>> {
        if !self.meta.key_type.is_string() {
            return Err(Error::IncompatibleKeyType {
                expected: self.meta.key_type,
                actual: KeyType::String,
            });
        }
        let Some(root) = self.meta.root else {
            return Ok(Vec::new());
        };

        let mut oids = Vec::new();
        page_ops::find_prefix(self.storage, root, prefix, self.meta.height, &mut oids)?;
        self.load_all(oids)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Add an entry for `obj`, persisting `obj` first if needed.
    ///
    /// Returns `false` without changing anything if the index is unique and
    /// already holds `key`.
    pub fn put(&mut self, key: impl Into<Key>, obj: &mut T) -> Result<bool> {
        self.insert(key.into(), obj, false)
    }

    /// Add an entry for `obj`, replacing the object of an equal key.
    pub fn set(&mut self, key: impl Into<Key>, obj: &mut T) -> Result<()> {
        self.insert(key.into(), obj, true).map(|_| ())
    }

    /// Remove the entry pairing `key` with `obj`.
    ///
    /// # Errors
    /// - `Error::KeyNotFound` if no such entry exists
    pub fn remove(&mut self, key: impl Into<Key>, obj: &T) -> Result<()> {
        let key = key.into();
        self.check_key(&key)?;
        let oid = obj.oid().ok_or(Error::KeyNotFound)?;
        self.remove_entry(Entry::new(key, oid))
    }

    /// Remove the entry for `key` from a unique index and return its object.
    /// The object itself stays in storage.
    ///
    /// # Errors
    /// - `Error::KeyNotUnique` on a non-unique index
    /// - `Error::KeyNotFound` if no entry has `key`
    pub fn remove_key(&mut self, key: impl Into<Key>) -> Result<T> {
        if !self.meta.unique {
            return Err(Error::KeyNotUnique);
        }
        let key = key.into();
        self.check_key(&key)?;
        let Some(root) = self.meta.root else {
            return Err(Error::KeyNotFound);
        };

        let mut oids = Vec::new();
        page_ops::find(
            self.storage,
            root,
            Some(&key),
            Some(&key),
            self.meta.key_type,
            self.meta.height,
            &mut oids,
        )?;
        let oid = *oids.first().ok_or(Error::KeyNotFound)?;
        let obj = self.storage.load(oid)?;
        self.remove_entry(Entry::new(key, oid))?;
        Ok(obj)
    }

    /// Remove every entry and release all tree pages.
    pub fn clear(&mut self) -> Result<()> {
        let Some(root) = self.meta.root else {
            return Ok(());
        };
        page_ops::purge(self.storage, root, self.meta.key_type, self.meta.height)?;
        self.meta.root = None;
        self.meta.height = 0;
        self.meta.count = 0;
        self.persist()?;
        info!(oid = %self.oid, "cleared index");
        Ok(())
    }

    /// Release the tree pages and the index record.
    pub fn deallocate(self) -> Result<()> {
        if let Some(root) = self.meta.root {
            page_ops::purge(self.storage, root, self.meta.key_type, self.meta.height)?;
        }
        self.storage.free_object(self.oid)?;
        debug!(oid = %self.oid, "deallocated index");
        Ok(())
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Lazy ascending iteration over all objects.
    pub fn iter(&self) -> Result<Cursor<'_, T>> {
        Cursor::new(self.storage, self.meta.root, self.meta.height, self.locate)
    }

    /// All objects in key order.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let Some(root) = self.meta.root else {
            return Ok(Vec::new());
        };
        let mut oids = Vec::with_capacity(self.size());
        page_ops::traverse_forward(self.storage, root, self.meta.key_type, self.meta.height, &mut oids)?;
        self.load_all(oids)
    }

    /// Mark every tree page and every indexed object as reachable.
    pub fn mark_tree(&self, marks: &mut MarkSet) -> Result<()> {
        match self.meta.root {
            Some(root) => page_ops::mark_page(self.storage, root, self.meta.key_type, self.meta.height, marks),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn check_key(&self, key: &Key) -> Result<()> {
        if key.key_type() != self.meta.key_type {
            return Err(Error::IncompatibleKeyType {
                expected: self.meta.key_type,
                actual: key.key_type(),
            });
        }
        key.validate()
    }

    fn insert(&mut self, key: Key, obj: &mut T, overwrite: bool) -> Result<bool> {
        self.check_key(&key)?;
        let oid = self.storage.persist(obj)?;
        let entry = Entry::new(key, oid);

        let reaction = match self.meta.root {
            None => {
                let root = page_ops::allocate(self.storage, None, self.meta.key_type, &entry)?;
                self.meta.root = Some(root);
                self.meta.height = 1;
                Reaction::Applied
            }
            Some(root) => {
                let outcome = page_ops::insert(
                    self.storage,
                    root,
                    self.meta.key_type,
                    &entry,
                    self.meta.height,
                    self.meta.unique,
                    overwrite,
                )?;
                trace!(?outcome, "insert");
                self.react(outcome)?
            }
        };

        match reaction {
            Reaction::Rejected => return Ok(false),
            Reaction::Applied => self.meta.count += 1,
            Reaction::Replaced => {}
        }
        self.persist()?;
        Ok(true)
    }

    fn remove_entry(&mut self, entry: Entry) -> Result<()> {
        let Some(root) = self.meta.root else {
            return Err(Error::KeyNotFound);
        };
        let outcome = page_ops::remove(self.storage, root, self.meta.key_type, &entry, self.meta.height)?;
        trace!(?outcome, "remove");

        if self.react(outcome)? == Reaction::Applied {
            self.meta.count = self.meta.count.saturating_sub(1);
        }
        self.persist()
    }

    /// The root-level reaction to a page outcome.
    fn react(&mut self, outcome: Outcome) -> Result<Reaction> {
        Ok(match outcome {
            Outcome::Done => Reaction::Applied,
            Outcome::Overflow(separator) => {
                self.grow(&separator)?;
                Reaction::Applied
            }
            Outcome::Underflow => {
                self.shrink()?;
                Reaction::Applied
            }
            Outcome::Duplicate => Reaction::Rejected,
            Outcome::Overwrite => Reaction::Replaced,
            Outcome::NotFound => return Err(Error::KeyNotFound),
        })
    }

    /// Put a new root above the split old one.
    fn grow(&mut self, separator: &Entry) -> Result<()> {
        let new_root = page_ops::allocate(self.storage, self.meta.root, self.meta.key_type, separator)?;
        self.meta.root = Some(new_root);
        self.meta.height += 1;
        debug!(root = %new_root, height = self.meta.height, "index grew");
        Ok(())
    }

    /// Replace a keyless internal root by its only child.
    fn shrink(&mut self) -> Result<()> {
        let Some(root) = self.meta.root else {
            return Ok(());
        };
        if self.meta.height <= 1 {
            return Ok(());
        }

        let child = {
            let page = self.storage.fetch_page_read(root)?;
            if item_count(&page) != 0 {
                return Ok(());
            }
            PageId::new((self.locate)(&page, 0))
        };
        self.storage.free_page(root)?;
        self.meta.root = Some(child);
        self.meta.height -= 1;
        debug!(root = %child, height = self.meta.height, "index shrank");
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        self.storage.store_object(self.oid, &self.meta.encode())
    }

    fn load_all(&self, oids: Vec<Oid>) -> Result<Vec<T>> {
        oids.into_iter().map(|oid| self.storage.load(oid)).collect()
    }
}
