// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use tonic::transport::Certificate;
use tonic::transport::ClientTlsConfig;
use tonic::transport::Endpoint;
use tonic::transport::Identity;

use crate::internal_err;
use crate::Config;
use crate::Result;

const TCP_KEEP_ALIVE: Duration = Duration::from_secs(10);
const HTTP2_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(3);

fn strip_http_scheme(addr: &str) -> &str {
    let addr = addr.trim_start();
    if let Some(stripped) = addr.strip_prefix("http://") {
        return stripped;
    }
    if let Some(stripped) = addr.strip_prefix("https://") {
        return stripped;
    }
    addr
}

fn load_pem_file(tag: &str, path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)
        .map_err(|e| internal_err!("failed to open {} to load {}: {:?}", path.display(), tag, e))?;
    let mut pem = vec![];
    file.read_to_end(&mut pem)
        .map_err(|e| {
            internal_err!(
                "failed to load {} from path {}: {:?}",
                tag,
                path.display(),
                e
            )
        })
        .map(|_| pem)
}

/// Decides how store endpoints are secured.
///
/// The TLS material is read once, up front: the channel pool creates
/// endpoints lazily and must not touch the filesystem (or fail) on that path.
#[derive(Default)]
pub struct SecurityManager {
    /// TLS settings applied to every endpoint; `None` means plaintext.
    tls: Option<ClientTlsConfig>,
}

impl SecurityManager {
    /// Load TLS configuration from PEM files.
    pub fn load(
        ca_path: impl AsRef<Path>,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<SecurityManager> {
        let ca = load_pem_file("ca", ca_path.as_ref())?;
        let cert = load_pem_file("certificate", cert_path.as_ref())?;
        let key = load_pem_file("private key", key_path.as_ref())?;
        let tls = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(ca))
            .identity(Identity::from_pem(cert, key));
        Ok(SecurityManager { tls: Some(tls) })
    }

    /// Build a security manager from the TLS fields of a [`Config`]: TLS when
    /// all three paths are present, plaintext otherwise.
    pub fn from_config(config: &Config) -> Result<SecurityManager> {
        if let (Some(ca_path), Some(cert_path), Some(key_path)) =
            (&config.ca_path, &config.cert_path, &config.key_path)
        {
            SecurityManager::load(ca_path, cert_path, key_path)
        } else {
            Ok(SecurityManager::default())
        }
    }

    /// Build an endpoint for a store address, secured per this manager.
    pub(crate) fn endpoint(&self, addr: &str) -> Result<Endpoint> {
        let addr = strip_http_scheme(addr);
        match &self.tls {
            Some(tls) => {
                let endpoint = self.raw_endpoint(format!("https://{addr}"))?;
                Ok(endpoint.tls_config(tls.clone())?)
            }
            None => self.raw_endpoint(format!("http://{addr}")),
        }
    }

    fn raw_endpoint(&self, addr: String) -> Result<Endpoint> {
        let endpoint = Endpoint::from_shared(addr)?
            .tcp_keepalive(Some(TCP_KEEP_ALIVE))
            .keep_alive_timeout(HTTP2_KEEP_ALIVE_TIMEOUT);
        Ok(endpoint)
    }
}
