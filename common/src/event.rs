use crate::network::host::HostRecord;
use crate::progress::ScanProgress;

/// Everything a scan session reports to its observers.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// A host record was created or changed. Carries a snapshot, not a handle.
    HostFound(HostRecord),
    Progress(ScanProgress),
    /// Fired exactly once per started scan, after the session left the running state.
    Complete,
    Error(String),
}

impl ScanEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ScanEvent::HostFound(_) => "host_found",
            ScanEvent::Progress(_) => "progress",
            ScanEvent::Complete => "complete",
            ScanEvent::Error(_) => "error",
        }
    }
}
