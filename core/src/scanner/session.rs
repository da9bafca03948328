//! State of one scan: the host table, the progress counters and the event
//! sender, all behind one mutex.
//!
//! Every event is sent while the lock is held, so the dispatcher sees
//! snapshots in the order they were taken. Once [`ScanSession::finish`] has
//! run the sender is gone and nothing else can be emitted.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use netsweep_common::event::ScanEvent;
use netsweep_common::network::host::{HostRecord, Liveness};
use netsweep_common::progress::ScanProgress;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

struct SessionState {
    hosts: BTreeMap<IpAddr, HostRecord>,
    progress: ScanProgress,
    events: Option<UnboundedSender<ScanEvent>>,
}

impl SessionState {
    fn emit(&self, event: ScanEvent) {
        if let Some(events) = &self.events
            && events.send(event).is_err()
        {
            trace!("Dispatcher gone, event dropped");
        }
    }

    fn emit_progress(&mut self, started: Instant) {
        self.progress.refresh(started.elapsed());
        self.emit(ScanEvent::Progress(self.progress.clone()));
    }
}

pub struct ScanSession {
    state: Mutex<SessionState>,
    token: CancellationToken,
    done: CancellationToken,
    started: Instant,
}

impl ScanSession {
    pub fn new(hosts_total: usize, events: UnboundedSender<ScanEvent>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SessionState {
                hosts: BTreeMap::new(),
                progress: ScanProgress::new(hosts_total),
                events: Some(events),
            }),
            token: CancellationToken::new(),
            done: CancellationToken::new(),
            started: Instant::now(),
        })
    }

    // Critical sections never panic, so a poisoned lock still holds consistent state.
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.state().events.is_none()
    }

    /// Resolves once [`ScanSession::finish`] has run, immediately if it already has.
    pub async fn finished(&self) {
        self.done.cancelled().await;
    }

    pub fn set_current_target(&self, target: String) {
        self.state().progress.current_target = target;
    }

    /// Stores the discovery verdict for `addr` and reports it.
    ///
    /// Dead hosts are kept in the table but produce no host-found event.
    pub fn record_liveness(&self, addr: IpAddr, liveness: Liveness, hostname: Option<String>) {
        let mut state = self.state();
        if state.events.is_none() {
            return;
        }

        let record = state
            .hosts
            .entry(addr)
            .or_insert_with(|| HostRecord::new(addr));
        record.set_liveness(liveness);
        if hostname.is_some() {
            record.hostname = hostname;
        }
        let snapshot = liveness.is_alive().then(|| record.clone());

        let progress = &mut state.progress;
        progress.hosts_scanned = (progress.hosts_scanned + 1).min(progress.hosts_total);
        progress.current_target = addr.to_string();
        if let Some(snapshot) = snapshot {
            progress.hosts_found += 1;
            state.emit(ScanEvent::HostFound(snapshot));
        }
        state.emit_progress(self.started);
    }

    /// Fixes the port workload once discovery is over.
    pub fn begin_port_phase(&self, alive_hosts: usize, ports_per_host: usize) {
        let mut state = self.state();
        if state.events.is_none() {
            return;
        }
        state.progress.ports_total = alive_hosts * ports_per_host;
        state.emit_progress(self.started);
    }

    /// Counts one finished port probe and records the port if it was open.
    pub fn record_port(&self, addr: IpAddr, port: u16, open: bool) {
        let mut state = self.state();
        if state.events.is_none() {
            return;
        }

        let snapshot = match state.hosts.get_mut(&addr) {
            Some(record) if open => record.add_open_port(port).then(|| record.clone()),
            _ => None,
        };

        let progress = &mut state.progress;
        progress.ports_scanned = (progress.ports_scanned + 1).min(progress.ports_total);
        progress.current_target = format!("{addr}:{port}");
        if let Some(snapshot) = snapshot {
            progress.open_ports_found += 1;
            state.emit(ScanEvent::HostFound(snapshot));
        }
        state.emit_progress(self.started);
    }

    /// Leaves the running state. Only the first call has any effect.
    ///
    /// Emits a final progress snapshot with `is_running == false`, the error
    /// if there is one, then the completion event, and drops the sender.
    pub fn finish(&self, error: Option<String>) -> bool {
        let mut state = self.state();
        if state.events.is_none() {
            return false;
        }

        state.progress.is_running = false;
        state.emit_progress(self.started);
        if let Some(message) = error {
            state.emit(ScanEvent::Error(message));
        }
        state.emit(ScanEvent::Complete);
        state.events = None;
        self.done.cancel();

        debug!(
            "Scan finished after {:?}: {} of {} hosts alive, {} open ports",
            self.started.elapsed(),
            state.progress.hosts_found,
            state.progress.hosts_scanned,
            state.progress.open_ports_found
        );
        true
    }

    pub fn progress(&self) -> ScanProgress {
        self.state().progress.clone()
    }

    /// Every record, ordered by address.
    pub fn results(&self) -> Vec<HostRecord> {
        self.state().hosts.values().cloned().collect()
    }

    pub fn alive_addresses(&self) -> Vec<IpAddr> {
        self.state()
            .hosts
            .values()
            .filter(|record| record.is_alive())
            .map(|record| record.address)
            .collect()
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
