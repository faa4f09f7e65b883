// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use derive_new::new;

use crate::proto::kvrpcpb;
use crate::proto::metapb;
use crate::Error;
use crate::Key;
use crate::Result;

pub type RegionId = u64;
pub type StoreId = u64;

/// A region id qualified by its epoch. Two `RegionVerId`s differ if the
/// region has been split, merged or reconfigured in between.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct RegionVerId {
    pub id: RegionId,
    pub conf_ver: u64,
    pub ver: u64,
}

/// An immutable snapshot of a region's routing: the region's metadata plus
/// the peer believed to be the Raft leader.
///
/// Updates never mutate a snapshot; a refreshed view replaces the old value
/// wholesale.
#[derive(new, Debug, Default, Clone, PartialEq)]
pub struct RegionWithLeader {
    pub region: metapb::Region,
    pub leader: Option<metapb::Peer>,
}

impl RegionWithLeader {
    pub fn id(&self) -> RegionId {
        self.region.id
    }

    pub fn start_key(&self) -> Key {
        self.region.start_key.to_vec().into()
    }

    pub fn end_key(&self) -> Key {
        self.region.end_key.to_vec().into()
    }

    /// Whether `key` lies in this region's `[start_key, end_key)` range. An
    /// empty end key is treated as +∞.
    pub fn contains(&self, key: &Key) -> bool {
        let key: &[u8] = key.into();
        let start_key = &self.region.start_key;
        let end_key = &self.region.end_key;
        key >= start_key.as_slice() && (key < end_key.as_slice() || end_key.is_empty())
    }

    /// Whether `other` covers the same `[start_key, end_key)` range. A leader
    /// change within an unchanged range does not require the caller to
    /// re-split its keys.
    pub fn same_range(&self, other: &RegionWithLeader) -> bool {
        self.region.start_key == other.region.start_key
            && self.region.end_key == other.region.end_key
    }

    pub fn ver_id(&self) -> RegionVerId {
        let region = &self.region;
        let epoch = region.region_epoch.as_ref();
        RegionVerId {
            id: region.id,
            conf_ver: epoch.map(|e| e.conf_ver).unwrap_or_default(),
            ver: epoch.map(|e| e.version).unwrap_or_default(),
        }
    }

    /// The store hosting the leader peer.
    pub fn get_store_id(&self) -> Result<StoreId> {
        self.leader
            .as_ref()
            .map(|l| l.store_id)
            .ok_or_else(|| Error::LeaderNotFound {
                region: self.ver_id(),
            })
    }

    /// The routing context attached to every request sent to this region, so
    /// the server can reject stale routing.
    pub fn context(&self) -> Result<kvrpcpb::Context> {
        let leader = self.leader.as_ref().ok_or_else(|| Error::LeaderNotFound {
            region: self.ver_id(),
        })?;
        Ok(kvrpcpb::Context {
            region_id: self.region.id,
            region_epoch: self.region.region_epoch,
            peer: Some(leader.clone()),
        })
    }
}
