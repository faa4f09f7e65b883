// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use std::path::PathBuf;
use std::time::Duration;

use serde_derive::Deserialize;
use serde_derive::Serialize;

/// The configuration for a [`RegionStoreClientBuilder`](crate::RegionStoreClientBuilder).
///
/// `timeout` bounds a single RPC attempt; the retry budget of a whole logical
/// call is carried by the caller's [`BackOffer`](crate::BackOffer) instead.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub ca_path: Option<PathBuf>,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    /// Per-RPC deadline applied to every attempt.
    pub timeout: Duration,
    /// Default row limit for `scan` and `raw_scan`.
    pub scan_batch_size: u32,
}

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_SCAN_BATCH_SIZE: u32 = 10240;

impl Default for Config {
    fn default() -> Self {
        Config {
            ca_path: None,
            cert_path: None,
            key_path: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            scan_batch_size: DEFAULT_SCAN_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Set the certificate authority, certificate, and key locations for clients.
    ///
    /// By default, this client will use an insecure connection instead of one protected by
    /// Transport Layer Security (TLS). Your deployment may have chosen to rely on security
    /// measures such as a private network, or a VPN layer to provide secure transmission.
    ///
    /// A channel factory built via
    /// [`ChannelFactory::from_config`](crate::ChannelFactory::from_config) secures every
    /// store channel with this material.
    ///
    /// # Examples
    /// ```rust
    /// # use rangekv_client::Config;
    /// let config = Config::default().with_security("root.ca", "internal.cert", "internal.key");
    /// ```
    #[must_use]
    pub fn with_security(
        mut self,
        ca_path: impl Into<PathBuf>,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.ca_path = Some(ca_path.into());
        self.cert_path = Some(cert_path.into());
        self.key_path = Some(key_path.into());
        self
    }

    /// Set the per-RPC deadline.
    ///
    /// The deadline applies to a single RPC attempt, not to a whole retried
    /// call. If one attempt does not complete within `timeout`, it is
    /// cancelled and surfaces as a transport failure.
    ///
    /// The default timeout is two seconds.
    ///
    /// # Examples
    /// ```rust
    /// # use rangekv_client::Config;
    /// # use std::time::Duration;
    /// let config = Config::default().with_timeout(Duration::from_secs(10));
    /// ```
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default row limit for scans.
    ///
    /// # Examples
    /// ```rust
    /// # use rangekv_client::Config;
    /// let config = Config::default().with_scan_batch_size(4096);
    /// ```
    #[must_use]
    pub fn with_scan_batch_size(mut self, scan_batch_size: u32) -> Self {
        self.scan_batch_size = scan_batch_size;
        self
    }
}
