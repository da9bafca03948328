pub mod discover;
pub mod info;
pub mod run;
pub mod scan;

use std::time::Duration;

use anyhow::ensure;
use clap::{ArgAction, Args, Parser, Subcommand};
use netsweep_common::config::{DEFAULT_MAX_THREADS, ScanConfiguration, ScanMode};
use netsweep_common::network::ports::PortSet;

#[derive(Parser)]
#[command(name = "netsweep", version)]
#[command(about = "Concurrent host discovery and TCP port scanner.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Less output: -q hides headers and trees, -qq leaves only the summary
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show which liveness strategies this process can use
    #[command(alias = "i")]
    Info,
    /// Find live hosts without probing ports
    #[command(alias = "d")]
    Discover {
        #[command(flatten)]
        args: ScanArgs,
    },
    /// Find live hosts and their open TCP ports
    #[command(alias = "s")]
    Scan {
        #[command(flatten)]
        args: ScanArgs,

        /// Ports to probe, e.g. "22,80,8000-8100". Overrides the mode defaults
        #[arg(short, long)]
        ports: Option<PortSet>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Addresses, ranges (a.b.c.d-e), CIDR blocks or "lan"
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// light: well-known ports, hard: ports 1-1024
    #[arg(short, long, default_value_t = ScanMode::Light)]
    pub mode: ScanMode,

    /// Per-probe timeout in seconds
    #[arg(short, long, default_value_t = 2.0)]
    pub timeout: f64,

    /// Concurrent workers per phase
    #[arg(long, default_value_t = DEFAULT_MAX_THREADS)]
    pub threads: usize,

    /// Skip reverse DNS lookups
    #[arg(long)]
    pub no_dns: bool,

    /// Use random results instead of touching the network
    #[arg(long)]
    pub simulate: bool,
}

impl ScanArgs {
    pub fn to_config(&self) -> anyhow::Result<ScanConfiguration> {
        ensure!(
            self.timeout.is_finite() && self.timeout > 0.0,
            "timeout must be a positive number of seconds"
        );
        ensure!(self.threads > 0, "at least one worker thread is required");

        Ok(ScanConfiguration::new(self.mode)
            .with_timeout(Duration::from_secs_f64(self.timeout))
            .with_max_threads(self.threads)
            .with_resolve_hostnames(!self.no_dns)
            .with_simulation(self.simulate))
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
