// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.
use std::fmt;

mod cf;
mod key;
mod kvpair;

pub use cf::ColumnFamily;
pub use key::Key;
pub use kvpair::KvPair;

/// The value part of a key/value pair. An empty value stands for "key absent"
/// in read results.
pub type Value = Vec<u8>;

struct HexRepr<'a>(pub &'a [u8]);

impl fmt::Display for HexRepr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}
