// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use std::any::Any;
use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::Channel;
use tonic::IntoRequest;

use super::HasErrorString;
use super::HasRegionError;
use super::SetRegionError;
use crate::proto::kvrpcpb;
use crate::proto::kvstorepb::kv_store_client::KvStoreClient;
use crate::region::RegionWithLeader;
use crate::Error;
use crate::Result;

/// A request that can be dispatched over a store's RPC endpoint.
///
/// Object safety matters here: the RPC layer (and its mock) handles requests
/// through `&dyn Request` and returns the response as `Box<dyn Any>`.
#[async_trait]
pub trait Request: Any + Sync + Send + 'static {
    async fn dispatch(
        &self,
        client: &KvStoreClient<Channel>,
        timeout: Duration,
    ) -> Result<Box<dyn Any>>;
    fn label(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn context_mut(&mut self) -> &mut kvrpcpb::Context;
    /// Stamp the request with `leader`'s routing context. Called immediately
    /// before every dispatch so a retried request never carries routing
    /// observed in an earlier attempt.
    fn set_leader(&mut self, leader: &RegionWithLeader) -> Result<()>;
}

/// Statically ties a request message to its response message so callers get
/// typed responses back out of the dynamic dispatch layer.
pub trait KvRequest: Request + Clone {
    type Response: HasRegionError + SetRegionError + Send + 'static;
}

macro_rules! impl_request {
    ($name: ident, $resp: ident, $fun: ident, $label: literal) => {
        #[async_trait]
        impl Request for kvrpcpb::$name {
            async fn dispatch(
                &self,
                client: &KvStoreClient<Channel>,
                timeout: Duration,
            ) -> Result<Box<dyn Any>> {
                let mut req = self.clone().into_request();
                req.set_timeout(timeout);
                let resp = client.clone().$fun(req).await.map_err(Error::GrpcApi)?;
                Ok(Box::new(resp.into_inner()) as Box<dyn Any>)
            }

            fn label(&self) -> &'static str {
                $label
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn context_mut(&mut self) -> &mut kvrpcpb::Context {
                self.context.get_or_insert(kvrpcpb::Context::default())
            }

            fn set_leader(&mut self, leader: &RegionWithLeader) -> Result<()> {
                *self.context_mut() = leader.context()?;
                Ok(())
            }
        }

        impl KvRequest for kvrpcpb::$name {
            type Response = kvrpcpb::$resp;
        }
    };
}

impl_request!(GetRequest, GetResponse, kv_get, "kv_get");
impl_request!(BatchGetRequest, BatchGetResponse, kv_batch_get, "kv_batch_get");
impl_request!(ScanRequest, ScanResponse, kv_scan, "kv_scan");

impl_request!(RawGetRequest, RawGetResponse, raw_get, "raw_get");
impl_request!(RawPutRequest, RawPutResponse, raw_put, "raw_put");
impl_request!(
    RawBatchPutRequest,
    RawBatchPutResponse,
    raw_batch_put,
    "raw_batch_put"
);
impl_request!(RawDeleteRequest, RawDeleteResponse, raw_delete, "raw_delete");
impl_request!(RawScanRequest, RawScanResponse, raw_scan, "raw_scan");

/// Surface raw-op response errors: a non-empty error string is a fatal key
/// error, a region error is a fatal region exception for this call.
pub(crate) fn check_raw_response<R>(resp: &mut R) -> Result<()>
where
    R: HasRegionError + HasErrorString,
{
    if let Some(message) = resp.error_string() {
        return Err(Error::KvError { message });
    }
    if let Some(e) = resp.region_error() {
        return Err(Error::RegionError(Box::new(e)));
    }
    Ok(())
}
