//! Event delivery.
//!
//! Each scan session owns one dispatcher task that drains an unbounded
//! channel and hands every event to the registered sinks in order. Sinks
//! never run on a worker and never while the session lock is held.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use netsweep_common::event::ScanEvent;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, trace};

use crate::error::panic_message;

/// Observer of scan events.
///
/// Errors and panics raised here are logged and otherwise ignored.
pub trait EventSink: Send + Sync {
    fn handle(&self, event: &ScanEvent) -> anyhow::Result<()>;
}

/// Adapts a plain closure.
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(&ScanEvent) + Send + Sync,
{
    fn handle(&self, event: &ScanEvent) -> anyhow::Result<()> {
        (self.0)(event);
        Ok(())
    }
}

/// Forwards a copy of every event into a channel.
pub struct ChannelSink(UnboundedSender<ScanEvent>);

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn handle(&self, event: &ScanEvent) -> anyhow::Result<()> {
        if self.0.send(event.clone()).is_err() {
            trace!("Event receiver dropped, discarding {}", event.kind());
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct SinkRegistry(Arc<RwLock<Vec<Arc<dyn EventSink>>>>);

impl SinkRegistry {
    pub fn add(&self, sink: Arc<dyn EventSink>) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    /// Calls every sink on the current thread.
    pub fn deliver(&self, event: &ScanEvent) {
        let sinks: Vec<Arc<dyn EventSink>> = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for sink in sinks {
            match catch_unwind(AssertUnwindSafe(|| sink.handle(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!("Event sink failed on {}: {err:#}", event.kind()),
                Err(payload) => error!(
                    "Event sink panicked on {}: {}",
                    event.kind(),
                    panic_message(payload)
                ),
            }
        }
    }
}

/// Starts the dispatcher of one session on `runtime`. It exits once every
/// sender is gone.
pub fn spawn_dispatcher(
    registry: SinkRegistry,
    runtime: &Handle,
) -> (UnboundedSender<ScanEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ScanEvent>();
    let handle = runtime.spawn(async move {
        while let Some(event) = rx.recv().await {
            registry.deliver(&event);
        }
    });
    (tx, handle)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
