// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

//! Wire-protocol messages and the gRPC stub for the store service.
//!
//! These are hand-maintained prost types kept in-tree (in place of build-time
//! code generation) so that building the crate does not require `protoc`. The
//! field numbers match the cluster's `.proto` definitions and must not be
//! reassigned.

#![allow(clippy::large_enum_variant)]

pub mod errorpb;
pub mod kvrpcpb;
pub mod kvstorepb;
pub mod metapb;
