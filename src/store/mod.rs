// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

mod client;
mod errors;
mod request;

pub use self::client::KvClient;
pub use self::client::KvConnect;
pub use self::client::KvRpcClient;
pub use self::client::StoreConnect;
pub use self::errors::HasErrorString;
pub use self::errors::HasRegionError;
pub use self::errors::SetRegionError;
pub(crate) use self::request::check_raw_response;
pub use self::request::KvRequest;
pub use self::request::Request;
