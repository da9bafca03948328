use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Well-known service ports probed in [`ScanMode::Light`].
pub const LIGHT_PORTS: &[u16] = &[21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 443, 993, 995];

/// Inclusive upper bound of the numeric range probed in [`ScanMode::Hard`].
pub const HARD_PORT_LIMIT: u16 = 1024;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_THREADS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Host discovery followed by a short list of well-known ports.
    #[default]
    Light,
    /// Host discovery followed by a broad numeric port sweep.
    Hard,
}

impl ScanMode {
    pub fn default_ports(self) -> Vec<u16> {
        match self {
            ScanMode::Light => LIGHT_PORTS.to_vec(),
            ScanMode::Hard => (1..=HARD_PORT_LIMIT).collect(),
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Light => f.write_str("light"),
            ScanMode::Hard => f.write_str("hard"),
        }
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" | "l" => Ok(ScanMode::Light),
            "hard" | "heavy" | "h" => Ok(ScanMode::Hard),
            other => Err(format!("unknown scan mode '{other}' (expected 'light' or 'hard')")),
        }
    }
}

/// Parameters of one scan session. Immutable once handed to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfiguration {
    pub mode: ScanMode,
    /// Upper bound for every individual network probe.
    pub timeout: Duration,
    /// Worker pool size, applied independently to the discovery and port phases.
    pub max_threads: usize,
    /// Explicit port list. `None` falls back to the mode defaults,
    /// an empty list disables the port phase. Port 0 is not connectable
    /// and is dropped; the coordinator reports it as an error event.
    pub ports: Option<Vec<u16>>,
    /// Look up a hostname for every live host.
    pub resolve_hostnames: bool,
    /// Replace the network probers with pseudo-random fakes.
    pub simulation: bool,
}

impl Default for ScanConfiguration {
    fn default() -> Self {
        Self {
            mode: ScanMode::default(),
            timeout: DEFAULT_TIMEOUT,
            max_threads: DEFAULT_MAX_THREADS,
            ports: None,
            resolve_hostnames: true,
            simulation: false,
        }
    }
}

impl ScanConfiguration {
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = Some(ports);
        self
    }

    pub fn with_resolve_hostnames(mut self, resolve: bool) -> Self {
        self.resolve_hostnames = resolve;
        self
    }

    pub fn with_simulation(mut self, simulation: bool) -> Self {
        self.simulation = simulation;
        self
    }

    /// The ports the port phase will probe, sorted and without duplicates.
    pub fn resolved_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = match &self.ports {
            Some(ports) => ports.iter().copied().filter(|port| *port != 0).collect(),
            None => self.mode.default_ports(),
        };
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    /// Whether the explicit port list names port 0, which [`Self::resolved_ports`] drops.
    pub fn has_port_zero(&self) -> bool {
        self.ports.as_ref().is_some_and(|ports| ports.contains(&0))
    }

    /// Pool size for a phase with `work_items` units: `min(max_threads, work_items)`, never zero.
    pub fn worker_count(&self, work_items: usize) -> usize {
        self.max_threads.max(1).min(work_items.max(1))
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
