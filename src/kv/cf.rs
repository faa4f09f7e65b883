// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A named sub-namespace within the raw key-value store.
///
/// Raw requests carry the column family as an opaque bytes field; the server
/// recognizes the three families below. Not selecting one means `Default`.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnFamily {
    #[default]
    Default,
    Lock,
    Write,
}

impl ColumnFamily {
    /// The wire representation used for the `cf_bytes` request field.
    pub fn to_bytes(self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl FromStr for ColumnFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "default" => Ok(ColumnFamily::Default),
            "lock" => Ok(ColumnFamily::Lock),
            "write" => Ok(ColumnFamily::Write),
            other => Err(Error::ColumnFamilyError(other.to_owned())),
        }
    }
}

impl fmt::Display for ColumnFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnFamily::Default => "default",
            ColumnFamily::Lock => "lock",
            ColumnFamily::Write => "write",
        };
        f.write_str(s)
    }
}
