//! Pseudo-random probers for demonstrations. Only selected when a
//! configuration explicitly asks for simulation.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use netsweep_common::network::host::Liveness;

use super::{HostProber, PortProber};

pub const DEFAULT_ALIVE_RATIO: f64 = 0.3;
pub const DEFAULT_OPEN_RATIO: f64 = 0.05;

pub struct SimulatedHostProber {
    alive_ratio: f64,
}

impl SimulatedHostProber {
    pub fn with_ratio(alive_ratio: f64) -> Self {
        Self {
            alive_ratio: alive_ratio.clamp(0.0, 1.0),
        }
    }
}

impl Default for SimulatedHostProber {
    fn default() -> Self {
        Self::with_ratio(DEFAULT_ALIVE_RATIO)
    }
}

#[async_trait]
impl HostProber for SimulatedHostProber {
    async fn probe(&self, _addr: IpAddr, timeout: Duration) -> Liveness {
        let rtt = Duration::from_micros(rand::random_range(1_000..=100_000));
        tokio::time::sleep(short_delay(timeout)).await;

        if rand::random_bool(self.alive_ratio) {
            Liveness::Alive { rtt }
        } else {
            Liveness::Dead
        }
    }
}

pub struct SimulatedPortProber {
    open_ratio: f64,
}

impl SimulatedPortProber {
    pub fn with_ratio(open_ratio: f64) -> Self {
        Self {
            open_ratio: open_ratio.clamp(0.0, 1.0),
        }
    }
}

impl Default for SimulatedPortProber {
    fn default() -> Self {
        Self::with_ratio(DEFAULT_OPEN_RATIO)
    }
}

#[async_trait]
impl PortProber for SimulatedPortProber {
    async fn scan_port(&self, _addr: IpAddr, _port: u16, timeout: Duration) -> bool {
        tokio::time::sleep(short_delay(timeout) / 4).await;
        rand::random_bool(self.open_ratio)
    }
}

/// A few milliseconds of fake latency, never more than the timeout.
fn short_delay(timeout: Duration) -> Duration {
    Duration::from_millis(rand::random_range(1..=20)).min(timeout)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
