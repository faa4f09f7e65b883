// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use log::info;
use tonic::transport::Channel;

use crate::Config;
use crate::Result;
use crate::SecurityManager;

/// A process-wide pool of long-lived transport channels, keyed by store
/// address.
///
/// A [`Channel`] is a cheap, reference-shared handle multiplexing one HTTP/2
/// connection; clones hand out the same connection. Channels are created
/// lazily and connect on first use, so acquisition never blocks on the
/// network. The pool owns channel lifetimes: dropping a client never tears a
/// channel down.
pub struct ChannelFactory {
    security_mgr: Arc<SecurityManager>,
    channels: RwLock<HashMap<String, Channel>>,
}

impl ChannelFactory {
    pub fn new(security_mgr: Arc<SecurityManager>) -> Self {
        Self {
            security_mgr,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// A factory secured per `config`: TLS when its `ca_path`/`cert_path`/
    /// `key_path` are all set, plaintext otherwise.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Arc::new(SecurityManager::from_config(config)?)))
    }

    /// The pooled channel for `address`, created on first request.
    pub fn get_channel(&self, address: &str) -> Result<Channel> {
        if let Some(ch) = self
            .channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
        {
            return Ok(ch.clone());
        }

        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        // Lost the race: another thread may have created it meanwhile.
        if let Some(ch) = channels.get(address) {
            return Ok(ch.clone());
        }

        info!("creating channel to store at {address}");
        let ch = self.security_mgr.endpoint(address)?.connect_lazy();
        channels.insert(address.to_owned(), ch.clone());
        Ok(ch)
    }

    #[cfg(test)]
    fn channel_count(&self) -> usize {
        self.channels.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
