// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use std::fmt;
use std::str;

#[cfg(test)]
use proptest_derive::Arbitrary;

use super::HexRepr;
use super::Key;
use super::Value;
use crate::proto::kvrpcpb;

/// A key/value pair.
///
/// Many functions which accept a `KvPair` accept an `Into<KvPair>`, so a
/// `(Key, Value)` tuple (or anything convertible into one) can be passed
/// directly.
#[derive(Default, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(test, derive(Arbitrary))]
pub struct KvPair {
    pub key: Key,
    pub value: Value,
}

impl KvPair {
    /// Create a new `KvPair`.
    #[inline]
    pub fn new(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        KvPair {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Immutably borrow the `Key` part of the `KvPair`.
    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Immutably borrow the `Value` part of the `KvPair`.
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume `self` and return the `Key` part.
    #[inline]
    pub fn into_key(self) -> Key {
        self.key
    }

    /// Consume `self` and return the `Value` part.
    #[inline]
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl<K, V> From<(K, V)> for KvPair
where
    K: Into<Key>,
    V: Into<Value>,
{
    fn from((k, v): (K, V)) -> Self {
        KvPair::new(k, v)
    }
}

impl From<KvPair> for (Key, Value) {
    fn from(pair: KvPair) -> Self {
        (pair.key, pair.value)
    }
}

impl From<kvrpcpb::KvPair> for KvPair {
    fn from(pair: kvrpcpb::KvPair) -> Self {
        KvPair::new(Key::from(pair.key), pair.value)
    }
}

impl From<KvPair> for kvrpcpb::KvPair {
    fn from(pair: KvPair) -> Self {
        kvrpcpb::KvPair {
            error: None,
            key: pair.key.into(),
            value: pair.value,
        }
    }
}

impl AsRef<Key> for KvPair {
    fn as_ref(&self) -> &Key {
        &self.key
    }
}

impl fmt::Debug for KvPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match str::from_utf8(&self.value) {
            Ok(s) => write!(f, "KvPair({}, {:?})", HexRepr(&self.key.0), s),
            Err(_) => write!(
                f,
                "KvPair({}, {})",
                HexRepr(&self.key.0),
                HexRepr(&self.value)
            ),
        }
    }
}
