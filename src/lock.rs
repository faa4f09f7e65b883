// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use async_trait::async_trait;

use crate::backoff::BackOffer;
use crate::proto::kvrpcpb;
use crate::Key;
use crate::Result;

/// The client-side view of a transaction lock blocking a read.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Lock {
    /// The primary key of the owning transaction; lock state is decided there.
    pub primary: Key,
    /// The owning transaction's start timestamp.
    pub ts: u64,
    /// The locked key the reader stumbled over.
    pub key: Key,
    pub ttl: u64,
}

impl From<kvrpcpb::LockInfo> for Lock {
    fn from(l: kvrpcpb::LockInfo) -> Self {
        Lock {
            primary: l.primary_lock.into(),
            ts: l.lock_version,
            key: l.key.into(),
            ttl: l.lock_ttl,
        }
    }
}

/// Resolves transaction locks by committing or rolling back the owning
/// transactions.
///
/// The resolver holds its own stubs and region-manager handle; it may issue
/// RPCs to the same store or, for cross-region primaries, build short-lived
/// clients of its own. The caller's [`BackOffer`] is passed through so the
/// total wait of the outer call stays bounded.
#[async_trait]
pub trait LockResolver: Send + Sync + 'static {
    /// Attempt to resolve `locks`. Returns `true` when every lock was
    /// resolved, `false` when some remain (the caller then backs off on
    /// `txnLockFast` and retries).
    async fn resolve_locks(&self, bo: &mut BackOffer, locks: Vec<Lock>) -> Result<bool>;
}
