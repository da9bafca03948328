use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use dns_lookup::lookup_addr;
use tokio::time::timeout;
use tracing::trace;

/// Best-effort name lookup. Falls back to the address itself.
#[async_trait]
pub trait HostnameResolver: Send + Sync {
    async fn resolve(&self, addr: IpAddr) -> String;
}

/// PTR lookup through the system resolver on a blocking thread.
pub struct ReverseDnsResolver {
    limit: Duration,
}

impl ReverseDnsResolver {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl Default for ReverseDnsResolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl HostnameResolver for ReverseDnsResolver {
    async fn resolve(&self, addr: IpAddr) -> String {
        let lookup = tokio::task::spawn_blocking(move || lookup_addr(&addr));
        match timeout(self.limit, lookup).await {
            Ok(Ok(Ok(name))) => name,
            Ok(Ok(Err(err))) => {
                trace!("No PTR record for {addr}: {err}");
                addr.to_string()
            }
            _ => addr.to_string(),
        }
    }
}

/// Skips lookups entirely.
pub struct NoopResolver;

#[async_trait]
impl HostnameResolver for NoopResolver {
    async fn resolve(&self, addr: IpAddr) -> String {
        addr.to_string()
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn noop_returns_the_address() {
        let addr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));
        assert_eq!(NoopResolver.resolve(addr).await, "192.0.2.1");
    }

    #[tokio::test]
    async fn zero_budget_falls_back_to_address() {
        let resolver = ReverseDnsResolver::new(Duration::ZERO);
        let addr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));
        assert_eq!(resolver.resolve(addr).await, "192.0.2.1");
    }

    #[tokio::test]
    #[ignore]
    async fn resolves_loopback_name() {
        let name = ReverseDnsResolver::default()
            .resolve(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .await;
        assert_ne!(name, "127.0.0.1");
    }
}
