//! The scan coordinator.
//!
//! [`ScanCoordinator::start`] expands the targets and launches the
//! orchestration on a background task: a discovery pool probes every target,
//! then a second pool sweeps the configured ports of each live host. All
//! results flow through one [`ScanSession`], which owns the host table and
//! the progress counters and emits [`ScanEvent`]s to the registered sinks.

use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use netsweep_common::config::ScanConfiguration;
use netsweep_common::event::ScanEvent;
use netsweep_common::network::host::HostRecord;
use netsweep_common::network::target::{self, ScanTarget};
use netsweep_common::progress::ScanProgress;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::ScanError;
use crate::pool;
use crate::probe::{self, Probers};

mod dispatch;
mod resolver;
mod session;

pub use dispatch::{ChannelSink, EventSink, FnSink, SinkRegistry};
pub use resolver::{HostnameResolver, NoopResolver, ReverseDnsResolver};
pub use session::ScanSession;

/// How long [`ScanCoordinator::stop`] waits for workers before abandoning them.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

struct ActiveScan {
    session: Arc<ScanSession>,
    supervisor: Option<JoinHandle<()>>,
    orchestration: AbortHandle,
}

/// Runs at most one scan at a time and keeps the results of the last one.
pub struct ScanCoordinator {
    sinks: SinkRegistry,
    probers: Option<Probers>,
    resolver: Arc<dyn HostnameResolver>,
    grace_period: Duration,
    starting: Mutex<()>,
    current: Mutex<Option<ActiveScan>>,
}

impl Default for ScanCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanCoordinator {
    /// Probers are chosen per scan from the configuration.
    pub fn new() -> Self {
        Self {
            sinks: SinkRegistry::default(),
            probers: None,
            resolver: Arc::new(ReverseDnsResolver::default()),
            grace_period: DEFAULT_GRACE_PERIOD,
            starting: Mutex::new(()),
            current: Mutex::new(None),
        }
    }

    /// Uses `probers` for every scan, ignoring the simulation flag.
    pub fn with_probers(mut self, probers: Probers) -> Self {
        self.probers = Some(probers);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn HostnameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks.add(sink);
    }

    pub fn subscribe_fn<F>(&self, f: F)
    where
        F: Fn(&ScanEvent) + Send + Sync + 'static,
    {
        self.sinks.add(Arc::new(FnSink(f)));
    }

    /// A receiver that gets a copy of every event from now on.
    pub fn subscribe_channel(&self) -> UnboundedReceiver<ScanEvent> {
        let (sink, rx) = ChannelSink::new();
        self.sinks.add(Arc::new(sink));
        rx
    }

    fn current(&self) -> MutexGuard<'_, Option<ActiveScan>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn running_session(&self) -> Option<Arc<ScanSession>> {
        self.current()
            .as_ref()
            .filter(|active| !active.session.is_finished())
            .map(|active| Arc::clone(&active.session))
    }

    fn last_session(&self) -> Option<Arc<ScanSession>> {
        self.current().as_ref().map(|active| Arc::clone(&active.session))
    }

    /// Launches a scan in the background and returns immediately.
    ///
    /// Returns `false` when a scan is already running or another start is in
    /// progress (nothing is emitted), when called outside a Tokio runtime, or
    /// when no spec yields a target. Malformed specs and port 0 are reported
    /// as error events and skipped.
    pub fn start<S: AsRef<str>>(&self, specs: &[S], config: ScanConfiguration) -> bool {
        let _starting = match self.starting.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                warn!("Another start request is in progress, start request ignored");
                return false;
            }
        };
        if self.running_session().is_some() {
            warn!("A scan is already running, start request ignored");
            return false;
        }

        let Ok(runtime) = Handle::try_current() else {
            let message = "scans can only be started inside a Tokio runtime".to_string();
            error!("{message}");
            self.sinks.deliver(&ScanEvent::Error(message));
            return false;
        };

        let expansion = target::expand(specs);
        for err in &expansion.errors {
            warn!("{err}");
            self.sinks.deliver(&ScanEvent::Error(err.to_string()));
        }
        if config.has_port_zero() {
            let message = "port 0 cannot be scanned and was dropped".to_string();
            warn!("{message}");
            self.sinks.deliver(&ScanEvent::Error(message));
        }
        if expansion.is_empty() {
            let message = "no valid targets to scan".to_string();
            error!("{message}");
            self.sinks.deliver(&ScanEvent::Error(message));
            return false;
        }

        let targets = expansion.targets;
        info!(
            "Starting {} scan of {} target(s)",
            config.mode,
            targets.len()
        );

        let (events, _dispatcher) = dispatch::spawn_dispatcher(self.sinks.clone(), &runtime);
        let session = ScanSession::new(targets.len(), events);

        let orchestration = runtime.spawn(run_scan(
            Arc::clone(&session),
            targets,
            config,
            self.probers.clone(),
            Arc::clone(&self.resolver),
        ));
        let abort = orchestration.abort_handle();

        let supervised = Arc::clone(&session);
        let supervisor = runtime.spawn(async move {
            let failure = match orchestration.await {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err),
                Err(join_err) if join_err.is_cancelled() => None,
                Err(join_err) => Some(ScanError::from(join_err)),
            };
            if let Some(err) = &failure {
                error!("Scan aborted: {err}");
            }
            supervised.finish(failure.map(|err| err.to_string()));
        });

        *self.current() = Some(ActiveScan {
            session,
            supervisor: Some(supervisor),
            orchestration: abort,
        });
        true
    }

    /// Cancels the running scan and waits up to the grace period for it to
    /// drain. Workers still busy after that are aborted and the session is
    /// closed regardless. Concurrent callers all return only once the scan
    /// is closed. A no-op when idle.
    pub async fn stop(&self) {
        let (session, supervisor, orchestration) = {
            let mut current = self.current();
            match current.as_mut() {
                Some(active) if !active.session.is_finished() => (
                    Arc::clone(&active.session),
                    active.supervisor.take(),
                    active.orchestration.clone(),
                ),
                _ => return,
            }
        };

        info!("Stopping scan");
        session.cancel();

        let drained = match supervisor {
            Some(supervisor) => tokio::time::timeout(self.grace_period, supervisor)
                .await
                .is_ok(),
            None => {
                debug!("Another stop request is already draining this scan");
                tokio::time::timeout(self.grace_period, session.finished())
                    .await
                    .is_ok()
            }
        };
        if !drained {
            warn!(
                "Scan did not drain within {:?}, abandoning workers",
                self.grace_period
            );
            orchestration.abort();
        }
        session.finish(None);
    }

    pub fn is_running(&self) -> bool {
        self.running_session().is_some()
    }

    /// Snapshot of the current or most recent host table, ordered by address.
    pub fn results(&self) -> Vec<HostRecord> {
        self.last_session()
            .map(|session| session.results())
            .unwrap_or_default()
    }

    pub fn alive_hosts(&self) -> Vec<HostRecord> {
        self.results()
            .into_iter()
            .filter(HostRecord::is_alive)
            .collect()
    }

    pub fn hosts_with_open_ports(&self) -> Vec<HostRecord> {
        self.results()
            .into_iter()
            .filter(HostRecord::has_open_ports)
            .collect()
    }

    /// Progress of the current or most recent scan.
    pub fn progress(&self) -> Option<ScanProgress> {
        self.last_session().map(|session| session.progress())
    }
}

impl Drop for ScanCoordinator {
    fn drop(&mut self) {
        if let Some(active) = self.current().as_ref() {
            active.session.cancel();
        }
    }
}

async fn run_scan(
    session: Arc<ScanSession>,
    targets: Vec<ScanTarget>,
    config: ScanConfiguration,
    probers: Option<Probers>,
    resolver: Arc<dyn HostnameResolver>,
) -> Result<(), ScanError> {
    let probers = match probers {
        Some(probers) => probers,
        None => Probers::for_config(&config).await,
    };

    discover_hosts(&session, targets, &config, &probers, resolver).await?;
    if session.token().is_cancelled() {
        info!("Scan cancelled during discovery");
        return Ok(());
    }

    let alive = session.alive_addresses();
    let progress = session.progress();
    info!(
        "Discovery finished: {} of {} host(s) alive",
        alive.len(),
        progress.hosts_scanned
    );

    let ports = config.resolved_ports();
    if ports.is_empty() || alive.is_empty() {
        return Ok(());
    }

    scan_open_ports(&session, alive, ports, &config, &probers).await?;
    if session.token().is_cancelled() {
        info!("Scan cancelled during port scan");
    }
    Ok(())
}

async fn discover_hosts(
    session: &Arc<ScanSession>,
    targets: Vec<ScanTarget>,
    config: &ScanConfiguration,
    probers: &Probers,
    resolver: Arc<dyn HostnameResolver>,
) -> Result<(), ScanError> {
    let workers = config.worker_count(targets.len());
    debug!("Discovery with {workers} worker(s)");

    let token = session.token().clone();
    let job_token = token.clone();
    let session = Arc::clone(session);
    let host_prober = Arc::clone(&probers.host);
    let timeout = config.timeout;
    let resolve = config.resolve_hostnames;

    pool::run(targets, workers, &token, move |addr: IpAddr| {
        let session = Arc::clone(&session);
        let prober = Arc::clone(&host_prober);
        let resolver = Arc::clone(&resolver);
        let token = job_token.clone();
        async move {
            session.set_current_target(addr.to_string());
            let liveness = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                liveness = prober.probe(addr, timeout) => liveness,
            };

            let mut hostname = None;
            if resolve && liveness.is_alive() {
                let resolved = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    name = resolver.resolve(addr) => Some(name),
                };
                hostname = resolved.filter(|name| *name != addr.to_string());
            }

            session.record_liveness(addr, liveness, hostname);
            Ok(())
        }
    })
    .await
}

async fn scan_open_ports(
    session: &Arc<ScanSession>,
    alive: Vec<IpAddr>,
    ports: Vec<u16>,
    config: &ScanConfiguration,
    probers: &Probers,
) -> Result<(), ScanError> {
    let host_workers = config.worker_count(alive.len());
    let per_host = (config.max_threads.max(1) / host_workers).max(1);
    debug!(
        "Port scan of {} port(s) on {} host(s), {host_workers} host worker(s) x {per_host} connect(s)",
        ports.len(),
        alive.len()
    );
    session.begin_port_phase(alive.len(), ports.len());

    let token = session.token().clone();
    let job_token = token.clone();
    let session = Arc::clone(session);
    let port_prober = Arc::clone(&probers.port);
    let ports = Arc::new(ports);
    let timeout = config.timeout;

    pool::run(alive, host_workers, &token, move |addr: IpAddr| {
        let session = Arc::clone(&session);
        let prober = Arc::clone(&port_prober);
        let ports = Arc::clone(&ports);
        let token = job_token.clone();
        async move {
            let recorder = Arc::clone(&session);
            let open = probe::scan_ports(
                prober,
                addr,
                ports.to_vec(),
                timeout,
                per_host,
                &token,
                move |port, is_open| recorder.record_port(addr, port, is_open),
            )
            .await?;
            debug!("{addr}: {} open port(s)", open.len());
            Ok(())
        }
    })
    .await
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
    use crate::probe::{HostProber, PortProber};
    use async_trait::async_trait;
    use netsweep_common::config::ScanMode;
    use netsweep_common::network::host::Liveness;

    /// Alive on odd last octets, ports open when divisible by 100.
    struct OddAlive;

    #[async_trait]
    impl HostProber for OddAlive {
        async fn probe(&self, addr: IpAddr, _timeout: Duration) -> Liveness {
            match addr {
                IpAddr::V4(v4) if v4.octets()[3] % 2 == 1 => Liveness::Alive {
                    rtt: Duration::from_millis(1),
                },
                _ => Liveness::Dead,
            }
        }
    }

    #[async_trait]
    impl PortProber for OddAlive {
        async fn scan_port(&self, _addr: IpAddr, port: u16, _timeout: Duration) -> bool {
            port % 100 == 0
        }
    }

    struct Stuck;

    #[async_trait]
    impl HostProber for Stuck {
        async fn probe(&self, _addr: IpAddr, _timeout: Duration) -> Liveness {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Liveness::Dead
        }
    }

    /// Holds its worker thread and ignores cancellation.
    struct Blocking;

    #[async_trait]
    impl HostProber for Blocking {
        async fn probe(&self, _addr: IpAddr, _timeout: Duration) -> Liveness {
            std::thread::sleep(Duration::from_millis(600));
            Liveness::Dead
        }
    }

    fn coordinator() -> ScanCoordinator {
        let prober = Arc::new(OddAlive);
        ScanCoordinator::new()
            .with_probers(Probers::new(prober.clone(), prober))
            .with_resolver(Arc::new(NoopResolver))
    }

    fn config() -> ScanConfiguration {
        ScanConfiguration::new(ScanMode::Hard)
            .with_ports(vec![100, 200, 22])
            .with_timeout(Duration::from_millis(100))
            .with_max_threads(4)
    }

    async fn until_complete(rx: &mut UnboundedReceiver<ScanEvent>) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = event == ScanEvent::Complete;
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn full_scan_fills_the_table() {
        let coordinator = coordinator();
        let mut rx = coordinator.subscribe_channel();

        assert!(coordinator.start(&["10.0.0.1-10.0.0.4"], config()));
        let events = until_complete(&mut rx).await;

        assert!(!coordinator.is_running());
        assert_eq!(coordinator.results().len(), 4);

        let alive: Vec<String> = coordinator
            .alive_hosts()
            .iter()
            .map(|h| h.address.to_string())
            .collect();
        assert_eq!(alive, vec!["10.0.0.1", "10.0.0.3"]);

        for host in coordinator.hosts_with_open_ports() {
            assert_eq!(host.open_ports(), vec![100, 200]);
        }

        let last_progress = events
            .iter()
            .rev()
            .find_map(|e| match e {
                ScanEvent::Progress(p) => Some(p.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_progress.hosts_scanned, 4);
        assert_eq!(last_progress.ports_total, 6);
        assert_eq!(last_progress.ports_scanned, 6);
        assert_eq!(last_progress.open_ports_found, 4);
        assert!(!last_progress.is_running);
    }

    #[tokio::test]
    async fn empty_port_list_skips_port_phase() {
        let coordinator = coordinator();
        let mut rx = coordinator.subscribe_channel();

        assert!(coordinator.start(&["10.0.0.1"], config().with_ports(vec![])));
        until_complete(&mut rx).await;

        assert_eq!(coordinator.alive_hosts().len(), 1);
        assert!(coordinator.hosts_with_open_ports().is_empty());
        assert_eq!(coordinator.progress().map(|p| p.ports_total), Some(0));
    }

    #[tokio::test]
    async fn no_targets_reports_error_and_stays_idle() {
        let coordinator = coordinator();
        let mut rx = coordinator.subscribe_channel();

        assert!(!coordinator.start(&["not-an-ip"], config()));
        assert!(!coordinator.is_running());

        let mut errors = 0;
        while let Ok(event) = rx.try_recv() {
            assert!(matches!(event, ScanEvent::Error(_)));
            errors += 1;
        }
        assert_eq!(errors, 2);
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_running() {
        let coordinator = ScanCoordinator::new()
            .with_probers(Probers::new(Arc::new(Stuck), Arc::new(OddAlive)))
            .with_grace_period(Duration::from_millis(200));

        assert!(coordinator.start(&["10.0.0.1"], config()));
        assert!(!coordinator.start(&["10.0.0.2"], config()));
        assert!(coordinator.is_running());

        coordinator.stop().await;
        assert!(!coordinator.is_running());
    }

    #[tokio::test]
    async fn stop_cancels_in_flight_probes() {
        let coordinator = ScanCoordinator::new()
            .with_probers(Probers::new(Arc::new(Stuck), Arc::new(OddAlive)))
            .with_grace_period(Duration::from_secs(2));
        let mut rx = coordinator.subscribe_channel();

        assert!(coordinator.start(&["10.0.0.0/28"], config()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        coordinator.stop().await;

        assert!(!coordinator.is_running());
        let completes = until_complete(&mut rx)
            .await
            .iter()
            .filter(|e| **e == ScanEvent::Complete)
            .count();
        assert_eq!(completes, 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stop_while_idle_is_silent() {
        let coordinator = coordinator();
        let mut rx = coordinator.subscribe_channel();

        coordinator.stop().await;

        assert!(!coordinator.is_running());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn new_scan_discards_previous_results() {
        let coordinator = coordinator();
        let mut rx = coordinator.subscribe_channel();

        assert!(coordinator.start(&["10.0.0.1-10.0.0.3"], config()));
        until_complete(&mut rx).await;
        assert_eq!(coordinator.results().len(), 3);

        assert!(coordinator.start(&["10.0.0.9"], config()));
        until_complete(&mut rx).await;
        let results = coordinator.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].address.to_string(), "10.0.0.9");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_stops_both_wait_for_the_scan_to_close() {
        let coordinator = Arc::new(
            ScanCoordinator::new()
                .with_probers(Probers::new(Arc::new(Blocking), Arc::new(OddAlive)))
                .with_resolver(Arc::new(NoopResolver)),
        );
        let mut rx = coordinator.subscribe_channel();

        assert!(coordinator.start(&["10.0.0.1"], config()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let first = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.stop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        coordinator.stop().await;

        assert!(!coordinator.is_running());
        first.await.unwrap();
        assert!(!coordinator.is_running());

        let completes = until_complete(&mut rx)
            .await
            .iter()
            .filter(|e| **e == ScanEvent::Complete)
            .count();
        assert_eq!(completes, 1);
    }

    #[test]
    fn start_outside_a_runtime_is_refused() {
        let coordinator = coordinator();
        let mut rx = coordinator.subscribe_channel();

        assert!(!coordinator.start(&["10.0.0.1"], config()));
        assert!(!coordinator.is_running());
        assert!(coordinator.results().is_empty());
        assert!(matches!(rx.try_recv(), Ok(ScanEvent::Error(m)) if m.contains("runtime")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn start_from_a_sink_during_target_errors_is_refused() {
        let coordinator = Arc::new(coordinator());
        let nested = Arc::new(Mutex::new(Vec::new()));
        let (weak, record) = (Arc::downgrade(&coordinator), Arc::clone(&nested));
        coordinator.subscribe_fn(move |event| {
            if let ScanEvent::Error(message) = event
                && message.contains("bogus")
                && let Some(coordinator) = weak.upgrade()
            {
                let accepted = coordinator.start(&["10.0.0.5"], config());
                record.lock().unwrap().push(accepted);
            }
        });
        let mut rx = coordinator.subscribe_channel();

        assert!(coordinator.start(&["bogus", "10.0.0.3"], config()));
        assert_eq!(*nested.lock().unwrap(), vec![false]);

        until_complete(&mut rx).await;
        let results = coordinator.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].address.to_string(), "10.0.0.3");
    }

    #[tokio::test]
    async fn port_zero_is_reported_and_skipped() {
        let coordinator = coordinator();
        let mut rx = coordinator.subscribe_channel();

        assert!(coordinator.start(&["10.0.0.1"], config().with_ports(vec![0, 100])));
        let events = until_complete(&mut rx).await;

        assert!(matches!(&events[0], ScanEvent::Error(m) if m.contains("port 0")));
        assert_eq!(coordinator.progress().map(|p| p.ports_total), Some(1));
        assert_eq!(coordinator.hosts_with_open_ports()[0].open_ports(), vec![100]);
    }
}
