// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

//! The per-region store client for [RangeKV], a distributed, transactional
//! key-value database.
//!
//! RangeKV partitions a sorted keyspace into contiguous *regions*, each
//! replicated by a Raft group across a set of *stores*. This crate is the
//! client-side core that locates the leader replica of the region owning a
//! key and issues KV requests against it:
//!
//! - [`RegionStoreClient`] exposes the transactional (MVCC) and raw operation
//!   surface for one region, and interprets the cluster's typed error
//!   responses — wrong leader, stale epoch, region not found, wrong store,
//!   key locked — each of which dictates a distinct recovery: retry in place,
//!   refresh routing, resolve transaction locks, or surface the error.
//! - [`RegionStoreClientBuilder`] constructs clients for a key, a region id,
//!   or an explicit `(region, store)` pair. Clients are cheap to build
//!   because transport channels are pooled by the [`ChannelFactory`] and
//!   shared process-wide.
//! - [`BackOffer`] carries the caller-owned retry budget with per-category
//!   exponential sleep schedules; when the budget runs out, the call fails
//!   with a timeout-class error.
//!
//! Routing state is served by a [`RegionManager`] implementation backed by
//! the cluster's placement service, and blocked reads are unblocked through
//! a [`LockResolver`]; both are consumed as traits here.
//!
//! A `RegionStoreClient` is deliberately a small, single-owner session: it is
//! built for one logical call (or a short burst against one region), is not
//! safe for concurrent use, and is discarded afterwards. Higher layers own
//! key-range splitting, transaction coordination, and cross-region retries.
//!
//! Since this crate provides an async API, you need an async runtime
//! (Tokio-only).
//!
//! # Examples
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use rangekv_client::{
//! #     BackOffer, ChannelFactory, Config, Key, LockResolver, RegionManager,
//! #     RegionStoreClientBuilder, Result,
//! # };
//! # async fn example<RM, LR>(region_manager: Arc<RM>, lock_resolver: Arc<LR>) -> Result<()>
//! # where
//! #     RM: RegionManager,
//! #     LR: LockResolver + Sized,
//! # {
//! let config = Config::default();
//! let channels = Arc::new(ChannelFactory::from_config(&config)?);
//! let builder = RegionStoreClientBuilder::new(config, channels, region_manager, lock_resolver);
//!
//! let key = Key::from("k1");
//! let mut client = builder.build_for_key(&key).await?;
//! let mut bo = BackOffer::new(20_000);
//! let _value = client.get(&mut bo, key, 100).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [RangeKV]: https://github.com/rangekv/rangekv

pub mod backoff;
pub mod proto;

mod channel;
mod client;
mod common;
mod config;
mod kv;
mod lock;
mod manager;
mod region;
mod store;

#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(feature = "test-util", allow(dead_code))]
mod mock;

/// Test utilities (feature-gated).
#[cfg(feature = "test-util")]
pub mod test_util {
    pub use super::mock::MockConnect;
    pub use super::mock::MockKvClient;
    pub use super::mock::MockLockResolver;
    pub use super::mock::MockRegionManager;
}

#[doc(inline)]
pub use common::security::SecurityManager;
#[doc(inline)]
pub use common::Error;
#[doc(inline)]
pub use common::Result;
#[doc(inline)]
pub use config::Config;

#[doc(inline)]
pub use crate::backoff::BackOffer;
#[doc(inline)]
pub use crate::backoff::BackoffKind;
#[doc(inline)]
pub use crate::channel::ChannelFactory;
#[doc(inline)]
pub use crate::client::RegionStoreClient;
#[doc(inline)]
pub use crate::client::RegionStoreClientBuilder;
#[doc(inline)]
pub use crate::kv::ColumnFamily;
#[doc(inline)]
pub use crate::kv::Key;
#[doc(inline)]
pub use crate::kv::KvPair;
#[doc(inline)]
pub use crate::kv::Value;
#[doc(inline)]
pub use crate::lock::Lock;
#[doc(inline)]
pub use crate::lock::LockResolver;
#[doc(inline)]
pub use crate::manager::RegionManager;
#[doc(inline)]
pub use crate::region::RegionId;
#[doc(inline)]
pub use crate::region::RegionVerId;
#[doc(inline)]
pub use crate::region::RegionWithLeader;
#[doc(inline)]
pub use crate::region::StoreId;
#[doc(inline)]
pub use crate::store::KvClient;
#[doc(inline)]
pub use crate::store::KvConnect;
#[doc(inline)]
pub use crate::store::KvRpcClient;
#[doc(inline)]
pub use crate::store::Request;
#[doc(inline)]
pub use crate::store::StoreConnect;
