//! Typed keys and the (key, object) entries stored in an index.

use std::any::{type_name, TypeId};
use std::cmp::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::common::config::MAX_STRING_KEY_LEN;
use crate::common::{Error, Oid, Result};

/// Type tag of an index's keys.
///
/// The numeric value is what the metadata record persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum KeyType {
    Bool = 0,
    I8 = 1,
    Char = 2,
    I16 = 3,
    I32 = 4,
    I64 = 5,
    F32 = 6,
    F64 = 7,
    String = 8,
    /// Milliseconds since the Unix epoch.
    Date = 9,
}

impl KeyType {
    #[inline]
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Decode a persisted tag.
    ///
    /// # Errors
    /// - `Error::UnsupportedIndexType` for tags this crate does not know
    pub fn from_tag(tag: u32) -> Result<Self> {
        Ok(match tag {
            0 => KeyType::Bool,
            1 => KeyType::I8,
            2 => KeyType::Char,
            3 => KeyType::I16,
            4 => KeyType::I32,
            5 => KeyType::I64,
            6 => KeyType::F32,
            7 => KeyType::F64,
            8 => KeyType::String,
            9 => KeyType::Date,
            _ => return Err(Error::UnsupportedIndexType(format!("type tag {tag}"))),
        })
    }

    /// Key type for values of the Rust type `K`.
    ///
    /// `SystemTime` maps to [`KeyType::Date`]; both `String` and `&str`
    /// map to [`KeyType::String`].
    ///
    /// # Errors
    /// - `Error::UnsupportedIndexType` naming `K` if it has no key type
    pub fn for_type<K: 'static>() -> Result<Self> {
        let id = TypeId::of::<K>();
        let candidates = [
            (TypeId::of::<bool>(), KeyType::Bool),
            (TypeId::of::<i8>(), KeyType::I8),
            (TypeId::of::<char>(), KeyType::Char),
            (TypeId::of::<i16>(), KeyType::I16),
            (TypeId::of::<i32>(), KeyType::I32),
            (TypeId::of::<i64>(), KeyType::I64),
            (TypeId::of::<f32>(), KeyType::F32),
            (TypeId::of::<f64>(), KeyType::F64),
            (TypeId::of::<String>(), KeyType::String),
            (TypeId::of::<&'static str>(), KeyType::String),
            (TypeId::of::<SystemTime>(), KeyType::Date),
        ];
        candidates
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|&(_, key_type)| key_type)
            .ok_or_else(|| Error::UnsupportedIndexType(type_name::<K>().to_string()))
    }

    #[inline]
    pub fn is_string(self) -> bool {
        self == KeyType::String
    }
}

/// A typed key value.
///
/// Keys of the same type are totally ordered: floats by IEEE total order,
/// strings bytewise. Keys of different types order by type tag, although an
/// index never compares those.
#[derive(Debug, Clone)]
pub enum Key {
    Bool(bool),
    I8(i8),
    Char(char),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Date(i64),
}

impl Key {
    pub fn key_type(&self) -> KeyType {
        match self {
            Key::Bool(_) => KeyType::Bool,
            Key::I8(_) => KeyType::I8,
            Key::Char(_) => KeyType::Char,
            Key::I16(_) => KeyType::I16,
            Key::I32(_) => KeyType::I32,
            Key::I64(_) => KeyType::I64,
            Key::F32(_) => KeyType::F32,
            Key::F64(_) => KeyType::F64,
            Key::String(_) => KeyType::String,
            Key::Date(_) => KeyType::Date,
        }
    }

    /// Date key from a point in time, truncated to milliseconds.
    pub fn date(time: SystemTime) -> Self {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_millis() as i64,
            Err(before) => -(before.duration().as_millis() as i64),
        };
        Key::Date(millis)
    }

    /// Check that the key may be stored.
    ///
    /// # Errors
    /// - `Error::KeyTooLarge` for strings over `MAX_STRING_KEY_LEN` bytes
    pub fn validate(&self) -> Result<()> {
        if let Key::String(s) = self {
            if s.len() > MAX_STRING_KEY_LEN {
                return Err(Error::KeyTooLarge {
                    size: s.len(),
                    max: MAX_STRING_KEY_LEN,
                });
            }
        }
        Ok(())
    }

    /// Bytes this key occupies in a page, excluding its slot header.
    pub(crate) fn stored_len(&self) -> usize {
        match self {
            Key::String(s) => s.len(),
            _ => SLOT_SIZE,
        }
    }

    /// Fixed-width encoding of a scalar key. Strings have no slot form.
    pub(crate) fn to_slot(&self) -> u64 {
        match *self {
            Key::Bool(v) => v as u64,
            Key::I8(v) => v as i64 as u64,
            Key::Char(v) => v as u64,
            Key::I16(v) => v as i64 as u64,
            Key::I32(v) => v as i64 as u64,
            Key::I64(v) | Key::Date(v) => v as u64,
            Key::F32(v) => v.to_bits() as u64,
            Key::F64(v) => v.to_bits(),
            Key::String(_) => 0,
        }
    }

    /// Inverse of [`to_slot`](Self::to_slot). `None` if the slot holds no
    /// valid value of `key_type`.
    pub(crate) fn from_slot(key_type: KeyType, slot: u64) -> Option<Self> {
        Some(match key_type {
            KeyType::Bool => Key::Bool(slot != 0),
            KeyType::I8 => Key::I8(slot as i64 as i8),
            KeyType::Char => Key::Char(char::from_u32(slot as u32)?),
            KeyType::I16 => Key::I16(slot as i64 as i16),
            KeyType::I32 => Key::I32(slot as i64 as i32),
            KeyType::I64 => Key::I64(slot as i64),
            KeyType::F32 => Key::F32(f32::from_bits(slot as u32)),
            KeyType::F64 => Key::F64(f64::from_bits(slot)),
            KeyType::Date => Key::Date(slot as i64),
            KeyType::String => return None,
        })
    }
}

/// Width of a scalar key slot.
pub(crate) const SLOT_SIZE: usize = 8;

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Bool(a), Key::Bool(b)) => a.cmp(b),
            (Key::I8(a), Key::I8(b)) => a.cmp(b),
            (Key::Char(a), Key::Char(b)) => a.cmp(b),
            (Key::I16(a), Key::I16(b)) => a.cmp(b),
            (Key::I32(a), Key::I32(b)) => a.cmp(b),
            (Key::I64(a), Key::I64(b)) | (Key::Date(a), Key::Date(b)) => a.cmp(b),
            (Key::F32(a), Key::F32(b)) => a.total_cmp(b),
            (Key::F64(a), Key::F64(b)) => a.total_cmp(b),
            (Key::String(a), Key::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            _ => self.key_type().tag().cmp(&other.key_type().tag()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

macro_rules! impl_key_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Key {
                fn from(value: $ty) -> Self {
                    Key::$variant(value)
                }
            }
        )*
    };
}

impl_key_from! {
    bool => Bool,
    i8 => I8,
    char => Char,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => String,
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::String(value.to_string())
    }
}

impl From<SystemTime> for Key {
    fn from(value: SystemTime) -> Self {
        Key::date(value)
    }
}

impl From<Duration> for Key {
    /// Date key at `value` past the epoch.
    fn from(value: Duration) -> Self {
        Key::Date(value.as_millis() as i64)
    }
}

/// A key paired with the identifier of the object it indexes.
///
/// A null identifier matches any object with an equal key on removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub oid: Oid,
}

impl Entry {
    pub fn new(key: Key, oid: Oid) -> Self {
        Self { key, oid }
    }
}
