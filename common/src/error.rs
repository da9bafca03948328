use std::net::Ipv4Addr;

use thiserror::Error;

/// A range specification that could not be turned into scan targets.
///
/// These are never fatal to a scan: the offending spec is skipped and the
/// message is reported through the error event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("invalid address range '{spec}': {reason}")]
    Invalid { spec: String, reason: String },

    #[error("invalid address range '{spec}': {start} is greater than {end}")]
    Reversed {
        spec: String,
        start: Ipv4Addr,
        end: Ipv4Addr,
    },

    #[error("address range '{spec}' expands to {count} addresses (limit is {limit})")]
    TooLarge { spec: String, count: u64, limit: u64 },

    #[error("no local network available for '{spec}': {reason}")]
    NoLocalNetwork { spec: String, reason: String },
}

impl TargetError {
    pub fn invalid(spec: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    /// The raw spec string that failed.
    pub fn spec(&self) -> &str {
        match self {
            Self::Invalid { spec, .. }
            | Self::Reversed { spec, .. }
            | Self::TooLarge { spec, .. }
            | Self::NoLocalNetwork { spec, .. } => spec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortSpecError {
    #[error("port list is empty")]
    Empty,

    #[error("invalid port '{0}'")]
    Invalid(String),

    #[error("port 0 cannot be scanned")]
    Zero,

    #[error("port range '{0}' is reversed")]
    Reversed(String),
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
