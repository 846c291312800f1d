//! Progress reporting (ambient stack, §7): a small sink over `indicatif`, trimmed to the
//! phases this crate actually drives (scanning, DAT loading, merging, fixdat generation).

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};

const ACTION_BAR_TEMPLATE: &str =
    "{prefix} [{bar:40}] {pos:>5}/{len:<5} | {percent:>3}% | {elapsed_precise}<{eta_precise} | {msg}";
const SPINNER_TEMPLATE: &str = "{prefix} {spinner} {elapsed_precise} | {msg}";

fn format_byte_progress(done: u64, total: Option<u64>) -> String {
    match total {
        Some(limit) if limit > 0 => format!("{} / {}", HumanBytes(done), HumanBytes(limit)),
        _ => HumanBytes(done).to_string(),
    }
}

/// A single progress update, carried over an `mpsc::Sender` from worker threads back to
/// whichever code owns the `ProgressReporter`.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub path: Option<PathBuf>,
    pub bytes_done: u64,
    pub total_bytes: Option<u64>,
    pub message: Option<String>,
}

impl ProgressEvent {
    pub fn hashing(path: PathBuf, bytes_done: u64, total_bytes: Option<u64>) -> Self {
        ProgressEvent {
            path: Some(path),
            bytes_done,
            total_bytes,
            message: None,
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        ProgressEvent {
            path: None,
            bytes_done: 0,
            total_bytes: None,
            message: Some(text.into()),
        }
    }

    pub fn describe(&self) -> String {
        if let Some(msg) = &self.message {
            return msg.clone();
        }
        let name = self
            .path
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("");
        format!("{name} ({})", format_byte_progress(self.bytes_done, self.total_bytes))
    }
}

/// The phases this crate reports progress for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scanning,
    LoadingDats,
    Merging,
    GeneratingFixdat,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Scanning => "SCAN",
            Phase::LoadingDats => "LOAD",
            Phase::Merging => "MERGE",
            Phase::GeneratingFixdat => "FIXDAT",
        }
    }
}

/// A determinate-or-indeterminate progress bar for one phase, plus a generic log line.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl ProgressReporter {
    pub fn new(quiet: bool) -> Self {
        ProgressReporter { bar: None, quiet }
    }

    pub fn begin(&mut self, phase: Phase, total: Option<u64>) {
        if self.quiet {
            return;
        }
        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::with_template(ACTION_BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        bar.set_prefix(phase.label());
        self.bar = Some(bar);
    }

    pub fn advance(&self, n: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(n);
        }
    }

    pub fn set_symbol(&self, message: impl Into<String>) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.into());
        }
    }

    pub fn finish(&mut self, message: impl Into<String>) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(message.into());
        }
    }

    pub fn reset(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    /// A one-off log line that doesn't belong to the active bar (e.g. a warning).
    pub fn log(&self, message: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        if let Some(bar) = &self.bar {
            bar.println(message.as_ref());
        } else {
            eprintln!("{}", message.as_ref());
        }
    }
}
