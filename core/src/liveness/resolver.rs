use std::net::IpAddr;

use anyhow::ensure;
use async_trait::async_trait;

/// Name resolution port of the liveness validator.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolves `host` to at least one address.
    async fn resolve(&self, host: &str) -> anyhow::Result<Vec<IpAddr>>;
}

/// Resolves through the operating system resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> anyhow::Result<Vec<IpAddr>> {
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await?
            .map(|socket| socket.ip())
            .collect();

        ensure!(!addrs.is_empty(), "{host} resolved to no addresses");
        Ok(addrs)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
