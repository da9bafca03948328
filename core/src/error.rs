use std::io;

use thiserror::Error;

/// A probe strategy could not run for one host.
///
/// Never surfaces to callers of the probers: it only decides whether the
/// next liveness tier is tried.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("insufficient privileges for {0}")]
    Permission(&'static str),

    #[error("link-layer channel failed: {0:#}")]
    Channel(anyhow::Error),

    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    #[error("probe task failed: {0}")]
    Task(String),
}

/// Something went wrong inside the orchestration itself rather than in a probe.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("worker panicked: {0}")]
    WorkerPanic(String),

    #[error("scan task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            ScanError::WorkerPanic(panic_message(err.into_panic()))
        } else {
            ScanError::Task(err.to_string())
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
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
