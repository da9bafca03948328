use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::PortProber;
use super::tcp::{self, Handshake};
use crate::error::ScanError;
use crate::pool;

/// Full TCP connect. Only an accepted connection counts as open.
pub struct TcpPortProber;

#[async_trait]
impl PortProber for TcpPortProber {
    async fn scan_port(&self, addr: IpAddr, port: u16, timeout: Duration) -> bool {
        matches!(tcp::handshake(addr, port, timeout).await, Handshake::Accepted)
    }
}

/// Probes `ports` on `addr` with at most `concurrency` connects in flight.
///
/// `on_port` runs after every completed probe with the port and whether it
/// was open. Cancellation stops dispatch and abandons in-flight probes; the
/// ports found until then are still returned, sorted and unique.
pub async fn scan_ports<F>(
    prober: Arc<dyn PortProber>,
    addr: IpAddr,
    ports: Vec<u16>,
    timeout: Duration,
    concurrency: usize,
    token: &CancellationToken,
    on_port: F,
) -> Result<Vec<u16>, ScanError>
where
    F: Fn(u16, bool) + Send + Sync + 'static,
{
    let open = Arc::new(Mutex::new(BTreeSet::new()));
    let on_port = Arc::new(on_port);

    let found = Arc::clone(&open);
    let job_token = token.clone();
    pool::run(ports, concurrency, token, move |port| {
        let prober = Arc::clone(&prober);
        let found = Arc::clone(&found);
        let on_port = Arc::clone(&on_port);
        let token = job_token.clone();
        async move {
            let is_open = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                is_open = prober.scan_port(addr, port, timeout) => is_open,
            };
            if is_open {
                found
                    .lock()
                    .map_err(|_| ScanError::Task("open port set poisoned".to_string()))?
                    .insert(port);
            }
            on_port(port, is_open);
            Ok(())
        }
    })
    .await?;

    let open = open
        .lock()
        .map_err(|_| ScanError::Task("open port set poisoned".to_string()))?;
    Ok(open.iter().copied().collect())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
