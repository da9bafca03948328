//! Probing abstractions.
//!
//! The coordinator only ever talks to [`HostProber`] and [`PortProber`]. The
//! network implementations and the simulated ones sit behind the same traits,
//! so a scan cannot tell which pair it was given.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netsweep_common::config::ScanConfiguration;
use netsweep_common::network::host::Liveness;
use tracing::info;

use crate::error::ProbeError;

pub mod arp;
pub mod icmp;
pub mod liveness;
pub mod ports;
pub mod simulated;
pub mod tcp;

pub use liveness::{Capability, CapabilityReport, LivenessStrategy, NetworkHostProber};
pub use ports::{TcpPortProber, scan_ports};
pub use simulated::{SimulatedHostProber, SimulatedPortProber};

/// Decides whether one address is up.
#[async_trait]
pub trait HostProber: Send + Sync {
    /// Never fails: anything that goes wrong becomes [`Liveness::Dead`].
    async fn probe(&self, addr: IpAddr, timeout: Duration) -> Liveness;
}

/// Decides whether one TCP port accepts connections.
#[async_trait]
pub trait PortProber: Send + Sync {
    /// A single attempt; errors and timeouts both read as closed.
    async fn scan_port(&self, addr: IpAddr, port: u16, timeout: Duration) -> bool;
}

/// Result of one liveness strategy against one host.
#[derive(Debug)]
pub enum ProbeOutcome {
    Responded(Duration),
    /// The strategy ran cleanly and nothing answered. Final for this host.
    NoResponse,
    /// The strategy does not apply to this host; try the next one.
    Unavailable(String),
    /// The strategy broke at runtime; try the next one.
    Failed(ProbeError),
}

/// The prober pair a scan session runs with.
#[derive(Clone)]
pub struct Probers {
    pub host: Arc<dyn HostProber>,
    pub port: Arc<dyn PortProber>,
}

impl Probers {
    pub fn new(host: Arc<dyn HostProber>, port: Arc<dyn PortProber>) -> Self {
        Self { host, port }
    }

    /// Pseudo-random results for demonstrations.
    pub fn simulated() -> Self {
        Self::new(
            Arc::new(SimulatedHostProber::default()),
            Arc::new(SimulatedPortProber::default()),
        )
    }

    /// Real probers, with liveness tiers resolved from the current privileges.
    pub async fn network() -> Self {
        let host = NetworkHostProber::detect().await;
        info!("Liveness strategies: {}", host.describe());
        Self::new(Arc::new(host), Arc::new(TcpPortProber))
    }

    pub async fn for_config(config: &ScanConfiguration) -> Self {
        if config.simulation {
            info!("Simulation mode: results are not real");
            Self::simulated()
        } else {
            Self::network().await
        }
    }
}
