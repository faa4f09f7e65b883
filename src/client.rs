// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

//! The per-region store client.
//!
//! A [`RegionStoreClient`] is a short-lived session against one region's
//! leader store. It owns the session's routing view (region + bound RPC
//! client), drives the retry loop for every operation, and cooperates with
//! the lock resolver when reads hit transaction locks.
//!
//! A client is built for one logical call (or a short burst against one
//! region) and discarded; rebuilding is cheap because transport channels are
//! pooled. One instance serves one caller at a time: operations take
//! `&mut self` and must not be interleaved.

use std::sync::Arc;

use log::debug;

use crate::backoff::BackOffer;
use crate::backoff::BackoffKind;
use crate::channel::ChannelFactory;
use crate::internal_err;
use crate::lock::Lock;
use crate::lock::LockResolver;
use crate::manager::RegionManager;
use crate::proto::errorpb;
use crate::proto::kvrpcpb;
use crate::proto::metapb;
use crate::region::RegionWithLeader;
use crate::store::check_raw_response;
use crate::store::HasRegionError;
use crate::store::KvClient;
use crate::store::KvConnect;
use crate::store::KvRequest;
use crate::store::SetRegionError;
use crate::store::StoreConnect;
use crate::ColumnFamily;
use crate::Config;
use crate::Error;
use crate::Key;
use crate::KvPair;
use crate::Result;
use crate::Value;

const MAX_RAW_SCAN_LIMIT: u32 = 10240;

/// A session against one region's leader store, exposing the KV and Raw-KV
/// operation surface.
///
/// Not safe for concurrent use: callers serialize operations on one instance.
/// Separate instances may target the same region without coordination.
pub struct RegionStoreClient<RM, Conn: KvConnect = StoreConnect> {
    config: Config,
    /// The routing this session currently believes. Replaced only by a
    /// refresh after a region miss, by `on_not_leader`, or by
    /// `on_store_not_match`.
    region: RegionWithLeader,
    region_manager: Arc<RM>,
    connector: Conn,
    client: Conn::KvClient,
    lock_resolver: Arc<dyn LockResolver>,
}

impl<RM, Conn: KvConnect> std::fmt::Debug for RegionStoreClient<RM, Conn> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionStoreClient")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl<RM, Conn> RegionStoreClient<RM, Conn>
where
    RM: RegionManager,
    Conn: KvConnect,
{
    /// The session's current routing view.
    pub fn region(&self) -> &RegionWithLeader {
        &self.region
    }

    /// Read `key` at MVCC timestamp `version`. Empty bytes denote "key
    /// absent".
    ///
    /// Region errors refresh the routing by key and retry; locks are resolved
    /// and retried in place. Any other key error terminates the call.
    pub async fn get(
        &mut self,
        bo: &mut BackOffer,
        key: impl Into<Key>,
        version: u64,
    ) -> Result<Value> {
        let key = key.into();
        loop {
            let mut resp = self
                .call_with_retry(bo, || kvrpcpb::GetRequest {
                    context: None,
                    key: key.clone().into(),
                    version,
                })
                .await?;

            if let Some(region_err) = resp.region_error() {
                bo.do_backoff(BackoffKind::RegionMiss, region_err.into())
                    .await?;
                // we should refresh the routing
                self.region = self.region_manager.get_region_by_key(&key).await?;
                continue;
            }

            if let Some(mut key_err) = resp.error.take() {
                if let Some(lock_info) = key_err.locked.take() {
                    let all_resolved = self
                        .lock_resolver
                        .resolve_locks(bo, vec![Lock::from(lock_info.clone())])
                        .await?;
                    if !all_resolved {
                        // some locks remain: wait and retry
                        key_err.locked = Some(lock_info);
                        bo.do_backoff(BackoffKind::TxnLockFast, key_err.into())
                            .await?;
                    }
                    continue;
                }
                // the transaction layer above decides whether to retry
                return Err(Error::KeyError(Box::new(key_err)));
            }

            return Ok(resp.value);
        }
    }

    /// Read several keys at MVCC timestamp `version`. All keys must lie in
    /// this client's region; the caller enforces that.
    ///
    /// A region error aborts the call with [`Error::RegionError`]: the caller
    /// re-splits its keys across fresh routing. Locks found on pairs are
    /// resolved in one resolver call; the pairs of this attempt are returned
    /// as-is.
    pub async fn batch_get(
        &mut self,
        bo: &mut BackOffer,
        keys: impl IntoIterator<Item = impl Into<Key>>,
        version: u64,
    ) -> Result<Vec<kvrpcpb::KvPair>> {
        let keys: Vec<Vec<u8>> = keys
            .into_iter()
            .map(|k| {
                let key: Key = k.into();
                key.into()
            })
            .collect();
        let mut resp = self
            .call_with_retry(bo, || kvrpcpb::BatchGetRequest {
                context: None,
                keys: keys.clone(),
                version,
            })
            .await?;
        let region_error = resp.region_error();
        self.check_mvcc_pairs(bo, region_error, resp.pairs).await
    }

    /// Scan up to `scan_batch_size` pairs starting from `start_key`, within
    /// this client's region, at MVCC timestamp `version`.
    ///
    /// Lock and region handling as for [`batch_get`](Self::batch_get).
    pub async fn scan(
        &mut self,
        bo: &mut BackOffer,
        start_key: impl Into<Key>,
        version: u64,
        key_only: bool,
    ) -> Result<Vec<kvrpcpb::KvPair>> {
        let start_key: Vec<u8> = start_key.into().into();
        let limit = self.config.scan_batch_size;
        let mut resp = self
            .call_with_retry(bo, || kvrpcpb::ScanRequest {
                context: None,
                start_key: start_key.clone(),
                limit,
                version,
                key_only,
            })
            .await?;
        let region_error = resp.region_error();
        self.check_mvcc_pairs(bo, region_error, resp.pairs).await
    }

    /// Handle the pair list of a `batch_get` or `scan` response: collect
    /// locks across pairs and resolve them in one call, surface any non-lock
    /// pair error, then surface a region error.
    async fn check_mvcc_pairs(
        &self,
        bo: &mut BackOffer,
        region_error: Option<errorpb::Error>,
        pairs: Vec<kvrpcpb::KvPair>,
    ) -> Result<Vec<kvrpcpb::KvPair>> {
        let mut locks = Vec::new();
        let mut first_lock_error = None;
        for pair in &pairs {
            if let Some(err) = &pair.error {
                match &err.locked {
                    Some(lock_info) => {
                        if first_lock_error.is_none() {
                            first_lock_error = Some(err.clone());
                        }
                        locks.push(Lock::from(lock_info.clone()));
                    }
                    None => return Err(Error::KeyError(Box::new(err.clone()))),
                }
            }
        }

        if !locks.is_empty() {
            let all_resolved = self.lock_resolver.resolve_locks(bo, locks).await?;
            if !all_resolved {
                // some locks remain: wait before the caller's next try
                let cause = first_lock_error
                    .map(|e| Error::KeyError(Box::new(e)))
                    .unwrap_or_else(|| internal_err!("lock batch without a lock error"));
                bo.do_backoff(BackoffKind::TxnLockFast, cause).await?;
            }
            // TODO: re-issue the request after resolution instead of handing
            // back pairs that still carry lock errors; the transaction layer
            // currently compensates for this.
        }

        if let Some(e) = region_error {
            // the caller re-splits its keys across regions
            return Err(Error::RegionError(Box::new(e)));
        }
        Ok(pairs)
    }

    /// Read `key` without transactional semantics. Empty bytes denote "key
    /// absent".
    pub async fn raw_get(&mut self, bo: &mut BackOffer, key: impl Into<Key>) -> Result<Value> {
        let key: Vec<u8> = key.into().into();
        let mut resp = self
            .call_with_retry(bo, || kvrpcpb::RawGetRequest {
                context: None,
                key: key.clone(),
                cf_bytes: vec![],
            })
            .await?;
        check_raw_response(&mut resp)?;
        Ok(resp.value)
    }

    /// Write `key = value`, optionally into a column family.
    pub async fn raw_put(
        &mut self,
        bo: &mut BackOffer,
        key: impl Into<Key>,
        value: impl Into<Value>,
        cf: Option<ColumnFamily>,
    ) -> Result<()> {
        let key: Vec<u8> = key.into().into();
        let value = value.into();
        let cf_bytes = cf.map(ColumnFamily::to_bytes).unwrap_or_default();
        let mut resp = self
            .call_with_retry(bo, || kvrpcpb::RawPutRequest {
                context: None,
                key: key.clone(),
                value: value.clone(),
                cf_bytes: cf_bytes.clone(),
            })
            .await?;
        check_raw_response(&mut resp)
    }

    /// Write several pairs, optionally into a column family. A no-op on empty
    /// input.
    pub async fn raw_batch_put(
        &mut self,
        bo: &mut BackOffer,
        pairs: impl IntoIterator<Item = impl Into<KvPair>>,
        cf: Option<ColumnFamily>,
    ) -> Result<()> {
        let pairs: Vec<kvrpcpb::KvPair> = pairs
            .into_iter()
            .map(|pair| {
                let pair: KvPair = pair.into();
                pair.into()
            })
            .collect();
        if pairs.is_empty() {
            return Ok(());
        }
        let cf_bytes = cf.map(ColumnFamily::to_bytes).unwrap_or_default();
        let mut resp = self
            .call_with_retry(bo, || kvrpcpb::RawBatchPutRequest {
                context: None,
                pairs: pairs.clone(),
                cf_bytes: cf_bytes.clone(),
            })
            .await?;
        // The wire protocol never populates per-pair errors on this RPC; only
        // the region error is meaningful.
        if let Some(e) = resp.region_error() {
            return Err(Error::RegionError(Box::new(e)));
        }
        Ok(())
    }

    /// Delete `key` without transactional semantics.
    pub async fn raw_delete(&mut self, bo: &mut BackOffer, key: impl Into<Key>) -> Result<()> {
        let key: Vec<u8> = key.into().into();
        let mut resp = self
            .call_with_retry(bo, || kvrpcpb::RawDeleteRequest {
                context: None,
                key: key.clone(),
                cf_bytes: vec![],
            })
            .await?;
        check_raw_response(&mut resp)
    }

    /// Return up to `limit` pairs starting from `start_key` which are in this
    /// client's region. `limit` defaults to the configured scan batch size.
    pub async fn raw_scan(
        &mut self,
        bo: &mut BackOffer,
        start_key: impl Into<Key>,
        cf: ColumnFamily,
        limit: Option<u32>,
        key_only: bool,
    ) -> Result<Vec<KvPair>> {
        let limit = limit.unwrap_or(self.config.scan_batch_size);
        if limit > MAX_RAW_SCAN_LIMIT {
            return Err(Error::MaxScanLimitExceeded {
                limit,
                max_limit: MAX_RAW_SCAN_LIMIT,
            });
        }
        let start_key: Vec<u8> = start_key.into().into();
        let cf_bytes = cf.to_bytes();
        let mut resp = self
            .call_with_retry(bo, || kvrpcpb::RawScanRequest {
                context: None,
                start_key: start_key.clone(),
                limit,
                key_only,
                cf_bytes: cf_bytes.clone(),
            })
            .await?;
        if let Some(e) = resp.region_error() {
            return Err(Error::RegionError(Box::new(e)));
        }
        Ok(resp.kvs.into_iter().map(Into::into).collect())
    }

    /// The retry driver: dispatch a request built fresh per attempt, recover
    /// what can be recovered in place, and hand everything else to the
    /// operation helper.
    ///
    /// `make` is invoked afresh on every attempt; the request it builds is
    /// stamped with the session's current routing immediately before dispatch
    /// so no attempt carries routing observed in an earlier iteration.
    async fn call_with_retry<Req, MakeReq>(
        &mut self,
        bo: &mut BackOffer,
        make: MakeReq,
    ) -> Result<Req::Response>
    where
        Req: KvRequest,
        MakeReq: Fn() -> Req,
    {
        loop {
            let mut req = make();
            req.set_leader(&self.region)?;

            let any_resp = match self.client.dispatch(&req).await {
                Ok(resp) => resp,
                Err(err) => {
                    debug!("{}: transport failure: {err}", req.label());
                    // evict the routing entry; the next lookup re-resolves it
                    self.region_manager.on_request_fail(&self.region).await;
                    bo.do_backoff(BackoffKind::Transport, err).await?;
                    continue;
                }
            };
            let mut resp = *any_resp
                .downcast::<Req::Response>()
                .map_err(|_| internal_err!("unexpected response type for {}", req.label()))?;

            match resp.region_error() {
                Some(region_err) => match self.handle_region_error(bo, region_err).await? {
                    None => continue,
                    Some(pass_through) => {
                        resp.set_region_error(pass_through);
                        return Ok(resp);
                    }
                },
                None => return Ok(resp),
            }
        }
    }

    /// Classify a region error.
    ///
    /// Returns `Ok(None)` when the error was recovered in place and the
    /// driver should retry, `Ok(Some(e))` for the region-miss group the
    /// operation helper disposes of, and `Err` for errors that terminate the
    /// call.
    async fn handle_region_error(
        &mut self,
        bo: &mut BackOffer,
        e: errorpb::Error,
    ) -> Result<Option<errorpb::Error>> {
        debug!("handle_region_error: {e:?}");
        if let Some(not_leader) = &e.not_leader {
            let new_store = match &not_leader.leader {
                Some(peer) => Some(self.region_manager.get_store_by_id(peer.store_id).await?),
                None => None,
            };
            if self.on_not_leader(new_store.as_ref()).await? {
                return Ok(None);
            }
            // the region changed its key range; the caller must re-split
            return Err(Error::RegionError(Box::new(e)));
        }

        if e.store_not_match.is_some() {
            let store = self
                .region_manager
                .get_store_by_id(self.region.get_store_id()?)
                .await?;
            self.on_store_not_match(&store).await?;
            return Ok(None);
        }

        if e.epoch_not_match.is_some() || e.region_not_found.is_some() || e.key_not_in_region.is_some()
        {
            // region-miss group: the operation decides between refreshing by
            // key and surfacing to the caller
            return Ok(Some(e));
        }

        // server_is_busy, raft_entry_too_large, stale_command and anything
        // unrecognized: wait for the cluster to converge, then retry
        bo.do_backoff(BackoffKind::RegionMiss, Error::RegionError(Box::new(e)))
            .await?;
        Ok(None)
    }

    /// Deal with a `not_leader` error. Returns whether the session could
    /// adopt the new leader in place; `false` means the region's key range
    /// changed and the caller must re-split.
    ///
    /// `new_store` is the store hinted by the error; the routing adopted
    /// comes from the region manager.
    pub async fn on_not_leader(&mut self, new_store: Option<&metapb::Store>) -> Result<bool> {
        if let Some(store) = new_store {
            debug!("{:?}, new leader = {}", self.region.ver_id(), store.id);
        }
        let cached_region = self.region_manager.get_region_by_id(self.region.id()).await?;
        // When switching the leader fails or the region changed its key
        // range, the task's key range must be re-split for the new region.
        if !self.region.same_range(&cached_region) {
            return Ok(false);
        }
        self.region = cached_region;
        let store = self
            .region_manager
            .get_store_by_id(self.region.get_store_id()?)
            .await?;
        self.client = self.connector.connect(&store.address).await?;
        Ok(true)
    }

    /// The session's channel was delivered to the wrong store: rebind the
    /// RPC client to `store`.
    pub async fn on_store_not_match(&mut self, store: &metapb::Store) -> Result<()> {
        self.client = self.connector.connect(&store.address).await?;
        let expected = self.region.get_store_id()?;
        if expected != store.id {
            debug!(
                "store_not_match: {:?}, expected store {expected}, rebound to store {} at {}",
                self.region.ver_id(),
                store.id,
                store.address
            );
        }
        Ok(())
    }
}

/// Builds [`RegionStoreClient`]s for a key, a region, or an explicit
/// `(region, store)` pair.
///
/// The builder holds no mutable state and may be shared across threads.
pub struct RegionStoreClientBuilder<RM, Conn: KvConnect = StoreConnect> {
    config: Config,
    connector: Conn,
    region_manager: Arc<RM>,
    lock_resolver: Arc<dyn LockResolver>,
}

impl<RM: RegionManager> RegionStoreClientBuilder<RM> {
    /// A builder binding stores through the shared channel pool.
    pub fn new(
        config: Config,
        channel_factory: Arc<ChannelFactory>,
        region_manager: Arc<RM>,
        lock_resolver: Arc<dyn LockResolver>,
    ) -> Self {
        let connector = StoreConnect::new(channel_factory, config.timeout);
        Self::with_connector(config, connector, region_manager, lock_resolver)
    }
}

impl<RM, Conn> RegionStoreClientBuilder<RM, Conn>
where
    RM: RegionManager,
    Conn: KvConnect + Clone,
{
    /// A builder with a custom connector (used by tests to substitute the
    /// RPC layer).
    pub fn with_connector(
        config: Config,
        connector: Conn,
        region_manager: Arc<RM>,
        lock_resolver: Arc<dyn LockResolver>,
    ) -> Self {
        Self {
            config,
            connector,
            region_manager,
            lock_resolver,
        }
    }

    /// Build a client for an explicit region and store.
    pub async fn build(
        &self,
        region: RegionWithLeader,
        store: metapb::Store,
    ) -> Result<RegionStoreClient<RM, Conn>> {
        // A session must never start without a leader to address.
        region.get_store_id()?;
        debug!("create region store client on address {}", store.address);
        let client = self.connector.connect(&store.address).await?;
        Ok(RegionStoreClient {
            config: self.config.clone(),
            region,
            region_manager: self.region_manager.clone(),
            connector: self.connector.clone(),
            client,
            lock_resolver: self.lock_resolver.clone(),
        })
    }

    /// Build a client for the region owning `key`.
    pub async fn build_for_key(&self, key: &Key) -> Result<RegionStoreClient<RM, Conn>> {
        let (region, store) = self.region_manager.get_region_store_pair_by_key(key).await?;
        self.build(region, store).await
    }

    /// Build a client for `region`, resolving its leader's store.
    pub async fn build_for_region(
        &self,
        region: RegionWithLeader,
    ) -> Result<RegionStoreClient<RM, Conn>> {
        let store = self
            .region_manager
            .get_store_by_id(region.get_store_id()?)
            .await?;
        self.build(region, store).await
    }

    pub fn region_manager(&self) -> &Arc<RM> {
        &self.region_manager
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use super::*;
    use crate::mock::MockConnect;
    use crate::mock::MockKvClient;
    use crate::mock::MockLockResolver;
    use crate::mock::MockRegionManager;
    use crate::proto::metapb;

    struct Fixture {
        manager: Arc<MockRegionManager>,
        resolver: Arc<MockLockResolver>,
        connect: MockConnect,
        client: RegionStoreClient<MockRegionManager, MockConnect>,
    }

    async fn fixture(kv_client: MockKvClient) -> Fixture {
        fixture_with(kv_client, Config::default(), MockLockResolver::default()).await
    }

    async fn fixture_with(
        kv_client: MockKvClient,
        config: Config,
        resolver: MockLockResolver,
    ) -> Fixture {
        let manager = Arc::new(MockRegionManager::with_regions(
            [MockRegionManager::region1(), MockRegionManager::region2()],
            [MockRegionManager::store(41), MockRegionManager::store(42)],
        ));
        let resolver = Arc::new(resolver);
        let connect = MockConnect::new(kv_client);
        let builder = RegionStoreClientBuilder::with_connector(
            config,
            connect.clone(),
            manager.clone(),
            resolver.clone() as Arc<dyn LockResolver>,
        );
        let client = builder
            .build(
                MockRegionManager::region1(),
                MockRegionManager::store(41),
            )
            .await
            .unwrap();
        Fixture {
            manager,
            resolver,
            connect,
            client,
        }
    }

    fn locked_key_error(primary: &str, ts: u64, key: &str) -> kvrpcpb::KeyError {
        kvrpcpb::KeyError {
            locked: Some(kvrpcpb::LockInfo {
                primary_lock: primary.as_bytes().to_vec(),
                lock_version: ts,
                key: key.as_bytes().to_vec(),
                lock_ttl: 3000,
            }),
            ..Default::default()
        }
    }

    fn epoch_not_match() -> errorpb::Error {
        errorpb::Error {
            epoch_not_match: Some(errorpb::EpochNotMatch {
                current_regions: vec![],
            }),
            ..Default::default()
        }
    }

    fn not_leader(leader_store: Option<u64>) -> errorpb::Error {
        errorpb::Error {
            not_leader: Some(errorpb::NotLeader {
                region_id: 1,
                leader: leader_store.map(|store_id| metapb::Peer { id: 99, store_id }),
            }),
            ..Default::default()
        }
    }

    fn pair(key: &str, value: &str) -> kvrpcpb::KvPair {
        kvrpcpb::KvPair {
            error: None,
            key: key.as_bytes().to_vec(),
            value: value.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn happy_get_sends_one_rpc_without_backoff() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![kvrpcpb::GetResponse {
            region_error: None,
            error: None,
            value: b"v".to_vec(),
        }];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls.clone())).await;

        let mut bo = BackOffer::new(1000);
        let value = f.client.get(&mut bo, "ka", 100).await.unwrap();

        assert_eq!(value, b"v".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bo.total_sleep_ms(), 0);
        assert_eq!(f.manager.key_lookups(), 0);
        assert_eq!(f.resolver.calls(), 0);
    }

    #[tokio::test]
    async fn locked_get_resolves_then_retries_without_backoff() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![
            kvrpcpb::GetResponse {
                region_error: None,
                error: Some(locked_key_error("k0", 99, "ka")),
                value: vec![],
            },
            kvrpcpb::GetResponse {
                region_error: None,
                error: None,
                value: b"v2".to_vec(),
            },
        ];
        let mut f = fixture_with(
            MockKvClient::with_scripted_responses(responses, calls.clone()),
            Config::default(),
            MockLockResolver::with_outcomes([true]),
        )
        .await;

        let mut bo = BackOffer::new(1000);
        let value = f.client.get(&mut bo, "ka", 100).await.unwrap();

        assert_eq!(value, b"v2".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(bo.total_sleep_ms(), 0);
        assert_eq!(f.resolver.calls(), 1);
        let resolved = f.resolver.resolved();
        assert_eq!(resolved[0].len(), 1);
        assert_eq!(resolved[0][0].primary, Key::from("k0"));
        assert_eq!(resolved[0][0].ts, 99);
    }

    #[tokio::test]
    async fn partially_resolved_get_backs_off_on_txn_lock_fast() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![
            kvrpcpb::GetResponse {
                region_error: None,
                error: Some(locked_key_error("k0", 99, "ka")),
                value: vec![],
            },
            kvrpcpb::GetResponse {
                region_error: None,
                error: None,
                value: b"v".to_vec(),
            },
        ];
        let mut f = fixture_with(
            MockKvClient::with_scripted_responses(responses, calls.clone()),
            Config::default(),
            MockLockResolver::with_outcomes([false]),
        )
        .await;

        let mut bo = BackOffer::new(1000);
        f.client.get(&mut bo, "ka", 100).await.unwrap();

        assert_eq!(bo.times(BackoffKind::TxnLockFast), 1);
        assert_eq!(bo.times(BackoffKind::RegionMiss), 0);
        assert_eq!(f.resolver.calls(), 1);
    }

    #[tokio::test]
    async fn region_miss_refreshes_routing_by_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![
            kvrpcpb::GetResponse {
                region_error: Some(epoch_not_match()),
                error: None,
                value: vec![],
            },
            kvrpcpb::GetResponse {
                region_error: None,
                error: None,
                value: b"v".to_vec(),
            },
        ];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls.clone())).await;

        // same range, newer epoch
        let mut refreshed = MockRegionManager::region1();
        refreshed.region.region_epoch = Some(metapb::RegionEpoch {
            conf_ver: 1,
            version: 2,
        });
        f.manager.put_region(refreshed.clone());

        let mut bo = BackOffer::new(1000);
        let value = f.client.get(&mut bo, "ka", 100).await.unwrap();

        assert_eq!(value, b"v".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(bo.times(BackoffKind::RegionMiss), 1);
        assert_eq!(f.manager.key_lookups(), 1);
        assert_eq!(f.client.region(), &refreshed);
    }

    #[tokio::test]
    async fn every_attempt_carries_the_current_routing() {
        let contexts = Arc::new(Mutex::new(Vec::new()));
        let queue = Mutex::new(std::collections::VecDeque::from(vec![
            kvrpcpb::GetResponse {
                region_error: Some(epoch_not_match()),
                error: None,
                value: vec![],
            },
            kvrpcpb::GetResponse {
                region_error: None,
                error: None,
                value: b"v".to_vec(),
            },
        ]));
        let contexts_in_hook = contexts.clone();
        let hook = MockKvClient::with_dispatch_hook(move |req| {
            let req = req
                .downcast_ref::<kvrpcpb::GetRequest>()
                .expect("only kv_get expected");
            contexts_in_hook
                .lock()
                .unwrap()
                .push(req.context.clone().expect("request must carry routing"));
            let resp = queue.lock().unwrap().pop_front().unwrap();
            Ok(Box::new(resp) as Box<dyn std::any::Any>)
        });
        let mut f = fixture(hook).await;

        let mut refreshed = MockRegionManager::region1();
        refreshed.region.region_epoch = Some(metapb::RegionEpoch {
            conf_ver: 1,
            version: 7,
        });
        f.manager.put_region(refreshed);

        let mut bo = BackOffer::new(1000);
        f.client.get(&mut bo, "ka", 100).await.unwrap();

        let contexts = contexts.lock().unwrap();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].region_epoch.unwrap().version, 1);
        assert_eq!(contexts[1].region_epoch.unwrap().version, 7);
    }

    #[tokio::test]
    async fn request_factory_runs_once_per_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![
            kvrpcpb::GetResponse {
                region_error: Some(not_leader(Some(42))),
                error: None,
                value: vec![],
            },
            kvrpcpb::GetResponse {
                region_error: None,
                error: None,
                value: b"v".to_vec(),
            },
        ];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls)).await;

        // leader moved to store 42, range unchanged
        let mut moved = MockRegionManager::region1();
        moved.leader = Some(metapb::Peer { id: 12, store_id: 42 });
        moved.region.peers = vec![metapb::Peer { id: 12, store_id: 42 }];
        f.manager.put_region(moved);

        let factory_runs = AtomicUsize::new(0);
        let mut bo = BackOffer::new(1000);
        let resp = f
            .client
            .call_with_retry(&mut bo, || {
                factory_runs.fetch_add(1, Ordering::SeqCst);
                kvrpcpb::GetRequest {
                    context: None,
                    key: b"ka".to_vec(),
                    version: 100,
                }
            })
            .await
            .unwrap();

        // one forced retry: the factory runs exactly twice
        assert_eq!(factory_runs.load(Ordering::SeqCst), 2);
        assert_eq!(resp.value, b"v".to_vec());
    }

    #[tokio::test]
    async fn not_leader_with_unchanged_range_rebinds_and_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![
            kvrpcpb::GetResponse {
                region_error: Some(not_leader(Some(42))),
                error: None,
                value: vec![],
            },
            kvrpcpb::GetResponse {
                region_error: None,
                error: None,
                value: b"v".to_vec(),
            },
        ];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls.clone())).await;

        let mut moved = MockRegionManager::region1();
        moved.leader = Some(metapb::Peer { id: 12, store_id: 42 });
        f.manager.put_region(moved);

        let mut bo = BackOffer::new(1000);
        let value = f.client.get(&mut bo, "ka", 100).await.unwrap();

        assert_eq!(value, b"v".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(bo.total_sleep_ms(), 0);
        assert_eq!(f.client.region().get_store_id().unwrap(), 42);
        // the builder connected to store 41, the rebind to store 42
        assert_eq!(
            f.connect.connected_addresses(),
            vec!["store41:20160".to_owned(), "store42:20160".to_owned()]
        );
    }

    #[tokio::test]
    async fn not_leader_with_changed_range_surfaces_region_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![kvrpcpb::GetResponse {
            region_error: Some(not_leader(Some(42))),
            error: None,
            value: vec![],
        }];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls.clone())).await;

        // the region split: its start key moved
        let mut split = MockRegionManager::region1();
        split.region.start_key = b"a0".to_vec();
        f.manager.put_region(split);

        let mut bo = BackOffer::new(1000);
        let err = f.client.get(&mut bo, "ka", 100).await.unwrap_err();

        assert!(err.is_region_error(), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn store_not_match_rebinds_channel_in_place() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![
            kvrpcpb::GetResponse {
                region_error: Some(errorpb::Error {
                    store_not_match: Some(errorpb::StoreNotMatch {
                        request_store_id: 41,
                        actual_store_id: 43,
                    }),
                    ..Default::default()
                }),
                error: None,
                value: vec![],
            },
            kvrpcpb::GetResponse {
                region_error: None,
                error: None,
                value: b"v".to_vec(),
            },
        ];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls.clone())).await;

        // the manager has a fresh address for the leader's store
        f.manager.put_store(metapb::Store {
            id: 41,
            address: "store41-new:20160".to_owned(),
        });

        let mut bo = BackOffer::new(1000);
        let value = f.client.get(&mut bo, "ka", 100).await.unwrap();

        assert_eq!(value, b"v".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(bo.total_sleep_ms(), 0);
        assert!(f
            .connect
            .connected_addresses()
            .contains(&"store41-new:20160".to_owned()));
    }

    #[tokio::test]
    async fn server_busy_backs_off_and_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![
            kvrpcpb::GetResponse {
                region_error: Some(errorpb::Error {
                    server_is_busy: Some(errorpb::ServerIsBusy {
                        reason: "scheduler busy".to_owned(),
                        backoff_ms: 1,
                    }),
                    ..Default::default()
                }),
                error: None,
                value: vec![],
            },
            kvrpcpb::GetResponse {
                region_error: None,
                error: None,
                value: b"v".to_vec(),
            },
        ];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls.clone())).await;

        let mut bo = BackOffer::new(1000);
        let value = f.client.get(&mut bo, "ka", 100).await.unwrap();

        assert_eq!(value, b"v".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(bo.times(BackoffKind::RegionMiss), 1);
        // handled inside the driver: no routing refresh happened
        assert_eq!(f.manager.key_lookups(), 0);
    }

    #[tokio::test]
    async fn transport_failure_evicts_routing_and_charges_transport_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_hook = calls.clone();
        let hook = MockKvClient::with_dispatch_hook(move |_| {
            calls_in_hook.fetch_add(1, Ordering::SeqCst);
            Err(Error::GrpcApi(tonic::Status::unavailable("store down")))
        });
        let mut f = fixture(hook).await;

        let mut bo = BackOffer::new(10);
        let err = f.client.get(&mut bo, "ka", 100).await.unwrap_err();

        assert!(err.is_backoff_exhausted(), "{err:?}");
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert!(bo.times(BackoffKind::Transport) >= 1);
        assert!(bo.total_sleep_ms() <= 10);
        assert_eq!(f.manager.invalidated(), vec![1]);
    }

    #[tokio::test]
    async fn region_miss_exhausts_the_backoff_budget_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![
            kvrpcpb::GetResponse {
                region_error: Some(epoch_not_match()),
                error: None,
                value: vec![],
            },
            kvrpcpb::GetResponse {
                region_error: Some(epoch_not_match()),
                error: None,
                value: vec![],
            },
        ];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls.clone())).await;

        // budget covers the first sleep (2ms) and fails on the second
        let mut bo = BackOffer::new(6);
        let err = f.client.get(&mut bo, "ka", 100).await.unwrap_err();

        assert!(err.is_backoff_exhausted(), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(bo.times(BackoffKind::RegionMiss), 2);
        assert_eq!(bo.total_sleep_ms(), 6);
        assert_eq!(f.manager.key_lookups(), 1);
    }

    #[tokio::test]
    async fn batch_get_returns_pairs_and_resolves_locks_in_one_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut locked_pair = pair("b", "");
        locked_pair.error = Some(locked_key_error("k0", 99, "b"));
        let responses = vec![kvrpcpb::BatchGetResponse {
            region_error: None,
            pairs: vec![pair("a", "1"), locked_pair, pair("c", "3")],
        }];
        let mut f = fixture_with(
            MockKvClient::with_scripted_responses(responses, calls.clone()),
            Config::default(),
            MockLockResolver::with_outcomes([false]),
        )
        .await;

        let mut bo = BackOffer::new(1000);
        let pairs = f
            .client
            .batch_get(&mut bo, ["a", "b", "c"], 100)
            .await
            .unwrap();

        // the original pairs of this attempt come back, lock errors included
        assert_eq!(pairs.len(), 3);
        assert!(pairs[1].error.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.resolver.calls(), 1);
        assert_eq!(f.resolver.resolved()[0].len(), 1);
        assert_eq!(bo.times(BackoffKind::TxnLockFast), 1);
    }

    #[tokio::test]
    async fn batch_get_surfaces_region_error_without_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![kvrpcpb::BatchGetResponse {
            region_error: Some(epoch_not_match()),
            pairs: vec![],
        }];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls.clone())).await;

        let mut bo = BackOffer::new(1000);
        let err = f
            .client
            .batch_get(&mut bo, ["a", "b"], 100)
            .await
            .unwrap_err();

        // the caller re-splits keys across regions
        assert!(err.is_region_error(), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.manager.key_lookups(), 0);
    }

    #[tokio::test]
    async fn batch_get_fails_fast_on_non_lock_pair_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut bad_pair = pair("b", "");
        bad_pair.error = Some(kvrpcpb::KeyError {
            abort: "txn aborted".to_owned(),
            ..Default::default()
        });
        let responses = vec![kvrpcpb::BatchGetResponse {
            region_error: None,
            pairs: vec![pair("a", "1"), bad_pair],
        }];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls)).await;

        let mut bo = BackOffer::new(1000);
        let err = f
            .client
            .batch_get(&mut bo, ["a", "b"], 100)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KeyError(_)), "{err:?}");
        assert_eq!(f.resolver.calls(), 0);
    }

    #[tokio::test]
    async fn scan_uses_the_configured_batch_size() {
        let seen_limit = Arc::new(AtomicUsize::new(0));
        let seen_in_hook = seen_limit.clone();
        let hook = MockKvClient::with_dispatch_hook(move |req| {
            let req = req
                .downcast_ref::<kvrpcpb::ScanRequest>()
                .expect("only kv_scan expected");
            seen_in_hook.store(req.limit as usize, Ordering::SeqCst);
            assert!(req.key_only);
            Ok(Box::new(kvrpcpb::ScanResponse {
                region_error: None,
                pairs: vec![pair("a", "1")],
            }) as Box<dyn std::any::Any>)
        });
        let mut f = fixture_with(
            hook,
            Config::default().with_scan_batch_size(555),
            MockLockResolver::default(),
        )
        .await;

        let mut bo = BackOffer::new(1000);
        let pairs = f.client.scan(&mut bo, "a", 100, true).await.unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(seen_limit.load(Ordering::SeqCst), 555);
    }

    #[tokio::test]
    async fn raw_put_with_column_family_sets_cf_bytes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_hook = calls.clone();
        let hook = MockKvClient::with_dispatch_hook(move |req| {
            calls_in_hook.fetch_add(1, Ordering::SeqCst);
            let req = req
                .downcast_ref::<kvrpcpb::RawPutRequest>()
                .expect("only raw_put expected");
            assert_eq!(req.cf_bytes, b"write".to_vec());
            assert_eq!(req.key, b"k".to_vec());
            assert_eq!(req.value, b"v".to_vec());
            Ok(Box::new(kvrpcpb::RawPutResponse::default()) as Box<dyn std::any::Any>)
        });
        let mut f = fixture(hook).await;

        let mut bo = BackOffer::new(1000);
        f.client
            .raw_put(&mut bo, "k", b"v".to_vec(), Some(ColumnFamily::Write))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn raw_get_treats_error_string_as_fatal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![kvrpcpb::RawGetResponse {
            region_error: None,
            error: "cf not found".to_owned(),
            value: vec![],
        }];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls)).await;

        let mut bo = BackOffer::new(1000);
        let err = f.client.raw_get(&mut bo, "k").await.unwrap_err();
        match err {
            Error::KvError { message } => assert_eq!(message, "cf not found"),
            other => panic!("expected KvError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn raw_batch_put_on_empty_input_sends_no_rpc() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses: Vec<kvrpcpb::RawBatchPutResponse> = vec![];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls.clone())).await;

        let mut bo = BackOffer::new(1000);
        f.client
            .raw_batch_put(&mut bo, Vec::<KvPair>::new(), None)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn raw_scan_rejects_limits_beyond_the_maximum() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses: Vec<kvrpcpb::RawScanResponse> = vec![];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls.clone())).await;

        let mut bo = BackOffer::new(1000);
        let err = f
            .client
            .raw_scan(&mut bo, "a", ColumnFamily::Default, Some(20_000), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MaxScanLimitExceeded { .. }), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn raw_scan_returns_domain_pairs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = vec![kvrpcpb::RawScanResponse {
            region_error: None,
            kvs: vec![pair("a", "1"), pair("b", "2")],
        }];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls)).await;

        let mut bo = BackOffer::new(1000);
        let pairs = f
            .client
            .raw_scan(&mut bo, "a", ColumnFamily::Default, None, false)
            .await
            .unwrap();
        assert_eq!(
            pairs,
            vec![KvPair::new("a", "1".to_owned()), KvPair::new("b", "2".to_owned())]
        );
    }

    #[tokio::test]
    async fn builder_resolves_routing_by_key() {
        let manager = Arc::new(MockRegionManager::with_regions(
            [MockRegionManager::region1(), MockRegionManager::region2()],
            [MockRegionManager::store(41), MockRegionManager::store(42)],
        ));
        let connect = MockConnect::new(MockKvClient::default());
        let builder = RegionStoreClientBuilder::with_connector(
            Config::default(),
            connect.clone(),
            manager,
            Arc::new(MockLockResolver::default()) as Arc<dyn LockResolver>,
        );

        let client = builder.build_for_key(&Key::from("zz")).await.unwrap();
        assert_eq!(client.region().id(), 2);
        assert_eq!(connect.connected_addresses(), vec!["store42:20160".to_owned()]);

        let client = builder
            .build_for_region(MockRegionManager::region1())
            .await
            .unwrap();
        assert_eq!(client.region().id(), 1);
    }

    #[tokio::test]
    async fn builder_rejects_a_region_without_leader() {
        let manager = Arc::new(MockRegionManager::with_regions(
            [MockRegionManager::region1()],
            [MockRegionManager::store(41)],
        ));
        let builder = RegionStoreClientBuilder::with_connector(
            Config::default(),
            MockConnect::new(MockKvClient::default()),
            manager,
            Arc::new(MockLockResolver::default()) as Arc<dyn LockResolver>,
        );

        let mut leaderless = MockRegionManager::region1();
        leaderless.leader = None;
        let err = builder
            .build(leaderless, MockRegionManager::store(41))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LeaderNotFound { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn on_not_leader_detects_range_changes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses: Vec<kvrpcpb::GetResponse> = vec![];
        let mut f = fixture(MockKvClient::with_scripted_responses(responses, calls)).await;

        // same range: in-place update succeeds
        let mut moved = MockRegionManager::region1();
        moved.leader = Some(metapb::Peer { id: 12, store_id: 42 });
        f.manager.put_region(moved);
        assert!(f.client.on_not_leader(None).await.unwrap());
        assert_eq!(f.client.region().get_store_id().unwrap(), 42);

        // changed range: the caller must re-split
        let mut split = MockRegionManager::region1();
        split.region.end_key = b"f".to_vec();
        f.manager.put_region(split);
        assert!(!f.client.on_not_leader(None).await.unwrap());
    }
}
