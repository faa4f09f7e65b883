// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

//! The `kvstorepb.KvStore` gRPC service: unary stubs for the KV and Raw-KV
//! operation surface. Written in tonic's generated-code shape.

/// Generated client implementations.
pub mod kv_store_client {
    #![allow(
        unused_variables,
        dead_code,
        missing_docs,
        clippy::wildcard_imports,
        clippy::let_unit_value
    )]
    use tonic::codegen::*;

    use crate::proto::kvrpcpb;

    #[derive(Debug, Clone)]
    pub struct KvStoreClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl KvStoreClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> KvStoreClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        /// Limits the maximum size of a decoded message.
        #[must_use]
        pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_decoding_message_size(limit);
            self
        }

        /// Limits the maximum size of an encoded message.
        #[must_use]
        pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_encoding_message_size(limit);
            self
        }

        pub async fn kv_get(
            &mut self,
            request: impl tonic::IntoRequest<kvrpcpb::GetRequest>,
        ) -> std::result::Result<tonic::Response<kvrpcpb::GetResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/kvstorepb.KvStore/KvGet");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("kvstorepb.KvStore", "KvGet"));
            self.inner.unary(req, path, codec).await
        }

        pub async fn kv_batch_get(
            &mut self,
            request: impl tonic::IntoRequest<kvrpcpb::BatchGetRequest>,
        ) -> std::result::Result<tonic::Response<kvrpcpb::BatchGetResponse>, tonic::Status>
        {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/kvstorepb.KvStore/KvBatchGet");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("kvstorepb.KvStore", "KvBatchGet"));
            self.inner.unary(req, path, codec).await
        }

        pub async fn kv_scan(
            &mut self,
            request: impl tonic::IntoRequest<kvrpcpb::ScanRequest>,
        ) -> std::result::Result<tonic::Response<kvrpcpb::ScanResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/kvstorepb.KvStore/KvScan");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("kvstorepb.KvStore", "KvScan"));
            self.inner.unary(req, path, codec).await
        }

        pub async fn raw_get(
            &mut self,
            request: impl tonic::IntoRequest<kvrpcpb::RawGetRequest>,
        ) -> std::result::Result<tonic::Response<kvrpcpb::RawGetResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/kvstorepb.KvStore/RawGet");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("kvstorepb.KvStore", "RawGet"));
            self.inner.unary(req, path, codec).await
        }

        pub async fn raw_put(
            &mut self,
            request: impl tonic::IntoRequest<kvrpcpb::RawPutRequest>,
        ) -> std::result::Result<tonic::Response<kvrpcpb::RawPutResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/kvstorepb.KvStore/RawPut");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("kvstorepb.KvStore", "RawPut"));
            self.inner.unary(req, path, codec).await
        }

        pub async fn raw_batch_put(
            &mut self,
            request: impl tonic::IntoRequest<kvrpcpb::RawBatchPutRequest>,
        ) -> std::result::Result<tonic::Response<kvrpcpb::RawBatchPutResponse>, tonic::Status>
        {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/kvstorepb.KvStore/RawBatchPut");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("kvstorepb.KvStore", "RawBatchPut"));
            self.inner.unary(req, path, codec).await
        }

        pub async fn raw_delete(
            &mut self,
            request: impl tonic::IntoRequest<kvrpcpb::RawDeleteRequest>,
        ) -> std::result::Result<tonic::Response<kvrpcpb::RawDeleteResponse>, tonic::Status>
        {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/kvstorepb.KvStore/RawDelete");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("kvstorepb.KvStore", "RawDelete"));
            self.inner.unary(req, path, codec).await
        }

        pub async fn raw_scan(
            &mut self,
            request: impl tonic::IntoRequest<kvrpcpb::RawScanRequest>,
        ) -> std::result::Result<tonic::Response<kvrpcpb::RawScanResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/kvstorepb.KvStore/RawScan");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("kvstorepb.KvStore", "RawScan"));
            self.inner.unary(req, path, codec).await
        }
    }
}
