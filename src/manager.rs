// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use async_trait::async_trait;

use crate::proto::metapb;
use crate::region::RegionId;
use crate::region::RegionWithLeader;
use crate::region::StoreId;
use crate::Key;
use crate::Result;

/// The process-wide routing cache, shared by every client.
///
/// Implementations back the lookups with the placement service and cache the
/// results; they are responsible for their own synchronization and for the
/// freshness of what they hand out. Returned values are immutable snapshots:
/// a client never writes through them.
#[async_trait]
pub trait RegionManager: Send + Sync + 'static {
    /// The current region owning `key`.
    async fn get_region_by_key(&self, key: &Key) -> Result<RegionWithLeader>;

    /// The current view of a region by id.
    async fn get_region_by_id(&self, id: RegionId) -> Result<RegionWithLeader>;

    /// The store descriptor for a store id.
    async fn get_store_by_id(&self, id: StoreId) -> Result<metapb::Store>;

    /// The region owning `key` together with its leader's store.
    async fn get_region_store_pair_by_key(
        &self,
        key: &Key,
    ) -> Result<(RegionWithLeader, metapb::Store)> {
        let region = self.get_region_by_key(key).await?;
        let store = self.get_store_by_id(region.get_store_id()?).await?;
        Ok((region, store))
    }

    /// A request against `region` failed at the transport level: evict the
    /// routing entry so the next lookup re-resolves it.
    async fn on_request_fail(&self, region: &RegionWithLeader);
}
