use std::time::Duration;

/// Snapshot of a running scan. Counters only ever grow within one scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanProgress {
    pub hosts_total: usize,
    pub hosts_scanned: usize,
    /// Zero until discovery finishes, then `alive hosts × ports`.
    pub ports_total: usize,
    pub ports_scanned: usize,
    pub hosts_found: usize,
    pub open_ports_found: usize,
    pub current_target: String,
    pub is_running: bool,
    pub elapsed: Duration,
    pub estimated_remaining: Duration,
}

impl ScanProgress {
    pub fn new(hosts_total: usize) -> Self {
        Self {
            hosts_total,
            is_running: true,
            ..Default::default()
        }
    }

    pub fn total_units(&self) -> usize {
        self.hosts_total + self.ports_total
    }

    pub fn done_units(&self) -> usize {
        self.hosts_scanned + self.ports_scanned
    }

    /// Completed share of the known work, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        match self.total_units() {
            0 => 0.0,
            total => (self.done_units() as f64 / total as f64).min(1.0),
        }
    }

    /// Updates elapsed time and re-derives the ETA from observed throughput.
    pub fn refresh(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
        self.estimated_remaining = estimate_remaining(self.total_units(), self.done_units(), elapsed);
    }
}

/// `(total - done) / (done / elapsed)`, or zero before any throughput is known.
pub fn estimate_remaining(total_units: usize, done_units: usize, elapsed: Duration) -> Duration {
    let elapsed_secs = elapsed.as_secs_f64();
    if done_units == 0 || elapsed_secs <= 0.0 {
        return Duration::ZERO;
    }
    let rate = done_units as f64 / elapsed_secs;
    let remaining = total_units.saturating_sub(done_units) as f64;
    Duration::from_secs_f64(remaining / rate)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
