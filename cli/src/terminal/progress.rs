use std::time::Duration;

use anyhow::Context;
use indicatif::ProgressStyle;
use netsweep_common::progress::ScanProgress;
use tracing::info_span;
use tracing::span::EnteredSpan;
use tracing_indicatif::span_ext::IndicatifSpanExt;


/// Progress bar attached to a tracing span, so log lines print above it.
pub struct ScanProgressBar {
    span: EnteredSpan,
}

impl ScanProgressBar {
    pub fn new(label: &str) -> anyhow::Result<Self> {
        let span = info_span!("scan", indicatif.pb_show = true);
        let template = format!(
            "{{spinner:.green}} {label} [{{wide_bar:.green/bright_black}}] {{pos}}/{{len}} {{msg}}"
        );
        let style = ProgressStyle::with_template(&template)
            .context("invalid progress bar template")?
            .progress_chars("━╸ ");
        span.pb_set_style(&style);
        span.pb_set_length(0);

        Ok(Self {
            span: span.entered(),
        })
    }

    pub fn update(&self, progress: &ScanProgress) {
        self.span.pb_set_length(progress.total_units() as u64);
        self.span.pb_set_position(progress.done_units() as u64);
        self.span.pb_set_message(&status_line(progress));
    }

    pub fn finish(self) {
        drop(self.span.exit());
    }
}

pub fn status_line(progress: &ScanProgress) -> String {
    let mut line = format!(
        "{} up, {} open",
        progress.hosts_found, progress.open_ports_found
    );
    if progress.is_running && !progress.estimated_remaining.is_zero() {
        line.push_str(&format!(" | ETA {}", format_eta(progress.estimated_remaining)));
    }
    if !progress.current_target.is_empty() {
        line.push_str(&format!(" | {}", progress.current_target));
    }
    line
}

pub fn format_eta(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60),
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
