use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::{Duration, SystemTime};

/// Result of a single liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive { rtt: Duration },
    Dead,
}

impl Liveness {
    pub fn is_alive(&self) -> bool {
        matches!(self, Liveness::Alive { .. })
    }
}

/// Everything the scanner learned about one address during the current scan.
///
/// `open_ports` and `response_time` can only be populated while the host is
/// marked alive; the mutators below refuse anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct HostRecord {
    pub address: IpAddr,
    pub hostname: Option<String>,
    is_alive: bool,
    open_ports: BTreeSet<u16>,
    response_time: Option<Duration>,
    pub last_seen: SystemTime,
}

impl HostRecord {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            hostname: None,
            is_alive: false,
            open_ports: BTreeSet::new(),
            response_time: None,
            last_seen: SystemTime::now(),
        }
    }

    /// Applies a liveness verdict. A dead verdict clears response time and ports.
    pub fn set_liveness(&mut self, liveness: Liveness) {
        match liveness {
            Liveness::Alive { rtt } => {
                self.is_alive = true;
                self.response_time = Some(rtt);
            }
            Liveness::Dead => {
                self.is_alive = false;
                self.response_time = None;
                self.open_ports.clear();
            }
        }
        self.last_seen = SystemTime::now();
    }

    /// Records an open port. Returns `true` only if the port was newly added.
    pub fn add_open_port(&mut self, port: u16) -> bool {
        if !self.is_alive {
            return false;
        }
        self.open_ports.insert(port)
    }

    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    /// Open ports in ascending order.
    pub fn open_ports(&self) -> Vec<u16> {
        self.open_ports.iter().copied().collect()
    }

    pub fn has_open_ports(&self) -> bool {
        !self.open_ports.is_empty()
    }

    pub fn response_time(&self) -> Option<Duration> {
        self.response_time
    }

    pub fn response_time_ms(&self) -> Option<f64> {
        self.response_time.map(|rtt| rtt.as_secs_f64() * 1_000.0)
    }

    /// Hostname if one was resolved, else the address itself.
    pub fn display_name(&self) -> String {
        self.hostname
            .clone()
            .unwrap_or_else(|| self.address.to_string())
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
