// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use std::result;

use thiserror::Error;

use crate::backoff::BackoffKind;
use crate::region::RegionVerId;

/// An error originating from the RangeKV client or its dependencies.
#[derive(Debug, Error)]
#[allow(clippy::large_enum_variant)]
pub enum Error {
    /// Wraps a `std::io::Error`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A transport-level gRPC failure (connect, TLS, HTTP/2).
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::transport::Error),
    /// A gRPC call failed with a status (includes per-call deadline expiry).
    #[error("gRPC api error: {0}")]
    GrpcApi(#[from] tonic::Status),
    /// A region-level error returned by a store. When surfaced from an
    /// operation, the caller is expected to re-resolve routing (and, for
    /// batch operations, re-split keys across regions).
    #[error("Region error: {0:?}")]
    RegionError(Box<crate::proto::errorpb::Error>),
    /// A non-lock per-key error on an MVCC operation. The transaction layer
    /// above decides whether to retry the whole transaction.
    #[error("{0:?}")]
    KeyError(Box<crate::proto::kvrpcpb::KeyError>),
    /// A string error returned by a store on a raw operation.
    #[error("Kv error. {}", message)]
    KvError { message: String },
    /// No leader is known for the region.
    #[error("Leader of region {} is not found", region.id)]
    LeaderNotFound { region: RegionVerId },
    /// No region is found for the given key.
    #[error("Region is not found for key: {:?}", key)]
    RegionForKeyNotFound { key: Vec<u8> },
    /// No region is found for the given id.
    #[error("Region {} is not found", region_id)]
    RegionNotFound { region_id: u64 },
    /// No store is found for the given id.
    #[error("Store {} is not found", store_id)]
    StoreNotFound { store_id: u64 },
    /// The backoff budget for one logical call ran out. Timeout class: the
    /// caller may retry the whole call with a fresh budget.
    #[error("backoff budget exhausted on {kind}: {cause}")]
    BackoffExhausted { kind: BackoffKind, cause: String },
    /// Scan limit exceeds the maximum.
    #[error("Limit {} exceeds max scan limit {}", limit, max_limit)]
    MaxScanLimitExceeded { limit: u32, max_limit: u32 },
    /// Invalid column family name.
    #[error("Unsupported column family {}", _0)]
    ColumnFamilyError(String),
    #[error("{}", message)]
    InternalError { message: String },
    #[error("{0}")]
    StringError(String),
}

impl From<crate::proto::errorpb::Error> for Error {
    fn from(e: crate::proto::errorpb::Error) -> Error {
        Error::RegionError(Box::new(e))
    }
}

impl From<crate::proto::kvrpcpb::KeyError> for Error {
    fn from(e: crate::proto::kvrpcpb::KeyError) -> Error {
        Error::KeyError(Box::new(e))
    }
}

/// A result holding an [`Error`](enum@Error).
pub type Result<T> = result::Result<T, Error>;

impl Error {
    /// Whether this error is the region-miss class: stale routing that the
    /// caller recovers from by refreshing from the region manager.
    pub fn is_region_error(&self) -> bool {
        matches!(self, Error::RegionError(_))
    }

    /// Whether the backoff budget ran out (timeout class).
    pub fn is_backoff_exhausted(&self) -> bool {
        matches!(self, Error::BackoffExhausted { .. })
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! internal_err {
    ($e:expr) => ({
        $crate::Error::InternalError {
            message: format!("[{}:{}]: {}", file!(), line!(),  $e)
        }
    });
    ($f:tt, $($arg:expr),+) => ({
        $crate::internal_err!(format!($f, $($arg),+))
    });
}
