// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

//! Various mock versions of the various clients and other objects.
//!
//! The goal is to be able to test functionality independently of the rest of
//! the cluster, in particular without requiring a placement service or any
//! store nodes.

use std::any::Any;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backoff::BackOffer;
use crate::lock::Lock;
use crate::lock::LockResolver;
use crate::manager::RegionManager;
use crate::proto::metapb;
use crate::region::RegionId;
use crate::region::RegionWithLeader;
use crate::region::StoreId;
use crate::store::KvClient;
use crate::store::KvConnect;
use crate::store::Request;
use crate::Error;
use crate::Key;
use crate::Result;

/// An RPC client which answers from a user-provided hook instead of the
/// network.
#[derive(Clone, Default)]
pub struct MockKvClient {
    dispatch: Option<Arc<dyn Fn(&dyn Any) -> Result<Box<dyn Any>> + Send + Sync>>,
}

impl MockKvClient {
    pub fn with_dispatch_hook<F>(dispatch: F) -> MockKvClient
    where
        F: Fn(&dyn Any) -> Result<Box<dyn Any>> + Send + Sync + 'static,
    {
        MockKvClient {
            dispatch: Some(Arc::new(dispatch)),
        }
    }

    /// A client answering with `responses` in order, counting dispatched
    /// requests in `calls`.
    pub fn with_scripted_responses<R>(responses: Vec<R>, calls: Arc<AtomicUsize>) -> MockKvClient
    where
        R: Send + 'static,
    {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::with_dispatch_hook(move |_req| {
            calls.fetch_add(1, Ordering::SeqCst);
            let resp = queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .expect("mock ran out of scripted responses");
            Ok(Box::new(resp) as Box<dyn Any>)
        })
    }
}

#[async_trait]
impl KvClient for MockKvClient {
    async fn dispatch(&self, req: &dyn Request) -> Result<Box<dyn Any>> {
        match &self.dispatch {
            Some(f) => f(req.as_any()),
            None => panic!("no dispatch hook set"),
        }
    }
}

/// Hands out clones of one [`MockKvClient`] for every address, recording the
/// addresses connected to.
#[derive(Clone, Default)]
pub struct MockConnect {
    client: MockKvClient,
    connected: Arc<Mutex<Vec<String>>>,
}

impl MockConnect {
    pub fn new(client: MockKvClient) -> Self {
        Self {
            client,
            connected: Arc::default(),
        }
    }

    pub fn connected_addresses(&self) -> Vec<String> {
        self.connected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl KvConnect for MockConnect {
    type KvClient = MockKvClient;

    async fn connect(&self, address: &str) -> Result<MockKvClient> {
        self.connected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(address.to_owned());
        Ok(self.client.clone())
    }
}

/// An in-memory region manager over a fixed set of regions and stores.
#[derive(Default)]
pub struct MockRegionManager {
    regions: Mutex<HashMap<RegionId, RegionWithLeader>>,
    stores: Mutex<HashMap<StoreId, metapb::Store>>,
    invalidated: Mutex<Vec<RegionId>>,
    key_lookups: AtomicUsize,
}

impl MockRegionManager {
    pub fn with_regions(
        regions: impl IntoIterator<Item = RegionWithLeader>,
        stores: impl IntoIterator<Item = metapb::Store>,
    ) -> Self {
        let mgr = Self::default();
        for region in regions {
            mgr.put_region(region);
        }
        for store in stores {
            mgr.put_store(store);
        }
        mgr
    }

    /// Insert or replace a region, keyed by id.
    pub fn put_region(&self, region: RegionWithLeader) {
        self.regions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(region.id(), region);
    }

    pub fn put_store(&self, store: metapb::Store) {
        self.stores
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(store.id, store);
    }

    /// Region ids evicted via `on_request_fail`, oldest first.
    pub fn invalidated(&self) -> Vec<RegionId> {
        self.invalidated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// How many `get_region_by_key` lookups have been served.
    pub fn key_lookups(&self) -> usize {
        self.key_lookups.load(Ordering::SeqCst)
    }

    /// Region 1: `["a", "m")`, leader peer on store 41.
    pub fn region1() -> RegionWithLeader {
        RegionWithLeader {
            region: metapb::Region {
                id: 1,
                start_key: b"a".to_vec(),
                end_key: b"m".to_vec(),
                region_epoch: Some(metapb::RegionEpoch {
                    conf_ver: 1,
                    version: 1,
                }),
                peers: vec![metapb::Peer { id: 11, store_id: 41 }],
            },
            leader: Some(metapb::Peer { id: 11, store_id: 41 }),
        }
    }

    /// Region 2: `["m", +inf)`, leader peer on store 42.
    pub fn region2() -> RegionWithLeader {
        RegionWithLeader {
            region: metapb::Region {
                id: 2,
                start_key: b"m".to_vec(),
                end_key: vec![],
                region_epoch: Some(metapb::RegionEpoch {
                    conf_ver: 1,
                    version: 1,
                }),
                peers: vec![metapb::Peer { id: 21, store_id: 42 }],
            },
            leader: Some(metapb::Peer { id: 21, store_id: 42 }),
        }
    }

    pub fn store(id: StoreId) -> metapb::Store {
        metapb::Store {
            id,
            address: format!("store{id}:20160"),
        }
    }
}

#[async_trait]
impl RegionManager for MockRegionManager {
    async fn get_region_by_key(&self, key: &Key) -> Result<RegionWithLeader> {
        self.key_lookups.fetch_add(1, Ordering::SeqCst);
        self.regions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .find(|region| region.contains(key))
            .cloned()
            .ok_or_else(|| Error::RegionForKeyNotFound {
                key: Vec::from(key.clone()),
            })
    }

    async fn get_region_by_id(&self, id: RegionId) -> Result<RegionWithLeader> {
        self.regions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(Error::RegionNotFound { region_id: id })
    }

    async fn get_store_by_id(&self, id: StoreId) -> Result<metapb::Store> {
        self.stores
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(Error::StoreNotFound { store_id: id })
    }

    async fn on_request_fail(&self, region: &RegionWithLeader) {
        self.invalidated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(region.id());
    }
}

/// A lock resolver answering from a queue of scripted outcomes (`true` = all
/// resolved). An empty queue answers `true`.
#[derive(Default)]
pub struct MockLockResolver {
    outcomes: Mutex<VecDeque<bool>>,
    calls: AtomicUsize,
    resolved: Mutex<Vec<Vec<Lock>>>,
}

impl MockLockResolver {
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The lock batches passed to `resolve_locks`, oldest first.
    pub fn resolved(&self) -> Vec<Vec<Lock>> {
        self.resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LockResolver for MockLockResolver {
    async fn resolve_locks(&self, _bo: &mut BackOffer, locks: Vec<Lock>) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(locks);
        Ok(self
            .outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(true))
    }
}
