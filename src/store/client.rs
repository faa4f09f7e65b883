// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use derive_new::new;

use super::Request;
use crate::channel::ChannelFactory;
use crate::proto::kvstorepb::kv_store_client::KvStoreClient;
use crate::Result;

/// A trait for acquiring an RPC endpoint bound to a store address.
#[async_trait]
pub trait KvConnect: Sized + Send + Sync + 'static {
    type KvClient: KvClient + Clone + Send + Sync + 'static;

    async fn connect(&self, address: &str) -> Result<Self::KvClient>;
}

/// Binds pooled channels from a [`ChannelFactory`] into per-store RPC
/// clients. Cheap to clone; the channel pool is shared.
#[derive(new, Clone)]
pub struct StoreConnect {
    channel_factory: Arc<ChannelFactory>,
    timeout: Duration,
}

#[async_trait]
impl KvConnect for StoreConnect {
    type KvClient = KvRpcClient;

    async fn connect(&self, address: &str) -> Result<KvRpcClient> {
        let channel = self.channel_factory.get_channel(address)?;
        Ok(KvRpcClient::new(KvStoreClient::new(channel), self.timeout))
    }
}

#[async_trait]
pub trait KvClient {
    async fn dispatch(&self, req: &dyn Request) -> Result<Box<dyn Any>>;
}

/// This client handles requests for a single store node. It converts the data
/// types and abstractions of the client program into the grpc data types.
#[derive(new, Clone)]
pub struct KvRpcClient {
    rpc_client: KvStoreClient<tonic::transport::Channel>,
    timeout: Duration,
}

#[async_trait]
impl KvClient for KvRpcClient {
    async fn dispatch(&self, request: &dyn Request) -> Result<Box<dyn Any>> {
        request.dispatch(&self.rpc_client, self.timeout).await
    }
}
