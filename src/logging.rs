//! Job progress output and tracing setup.
//!
//! `Printer` writes headed, timestamped progress lines to:
//! 1. stdout - unless silent
//! 2. a per-run log file - if a log directory is configured
//! 3. tracing - always, with the header as the `logger` field

use crate::error::{PkitError, Result};
use crate::timer::Timer;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Header used when none is given.
pub const DEFAULT_HEADER: &str = "pkit_job";
/// Extension of per-run log files.
pub const LOG_FILE_EXT: &str = "log";

pub const ICON_START: &str = "🚀";
pub const ICON_FAILED: &str = "❌";
pub const ICON_SUCCESS: &str = "✅";

/// Where tracing output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// Parse `0/off`, `1/stdout`, `2/stderr`, or a filename.
    pub fn parse(s: &str) -> Self {
        match s {
            "0" | "off" => LogTarget::Off,
            "1" | "stdout" => LogTarget::Stdout,
            "2" | "stderr" => LogTarget::Stderr,
            filename => LogTarget::File(PathBuf::from(filename)),
        }
    }
}

/// Filter from `directives` (normally `RUST_LOG`), else `debug`/`info` by verbosity.
pub fn env_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

/// Install the global tracing subscriber.
pub fn init_tracing(verbose: bool, target: &LogTarget) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = || env_filter(verbose, directives.as_deref());
    match target {
        LogTarget::Off => {}
        LogTarget::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::File(path) => {
            // Append mode
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Divider drawn above and below a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divider {
    pub above: char,
    pub below: char,
}

impl Divider {
    pub const fn new(above: char, below: char) -> Self {
        Self { above, below }
    }

    pub const fn same(marker: char) -> Self {
        Self::new(marker, marker)
    }
}

/// Formatting of a single message.
#[derive(Debug, Clone, Default)]
pub struct MessageStyle<'a> {
    pub subheader: &'a [&'a str],
    pub div: Option<Divider>,
    pub vspace: usize,
    pub icon: Option<&'a str>,
    pub details: &'a [(&'a str, String)],
}

/// Headed, timestamped progress output for one job run.
#[derive(Debug, Clone)]
pub struct Printer {
    header: String,
    log_dir: Option<PathBuf>,
    log_name_part: Option<String>,
    log_path: Option<PathBuf>,
    timer: Timer,
    div_len: usize,
    icons: bool,
    silent: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            log_dir: None,
            log_name_part: None,
            log_path: None,
            timer: Timer::default(),
            div_len: 100,
            icons: true,
            silent: false,
        }
    }

    /// Set the header prefix.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Set the header from parts, joined with `.` (empty parts skipped).
    pub fn with_header_parts(mut self, parts: &[&str]) -> Self {
        self.header = join_non_empty(parts, ".");
        self
    }

    /// Write a log file under `dir` once started.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_log_name_part(mut self, part: impl Into<String>) -> Self {
        self.log_name_part = Some(part.into());
        self
    }

    pub fn with_timer(mut self, timer: Timer) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_div_len(mut self, len: usize) -> Self {
        self.div_len = len;
        self
    }

    pub fn with_icons(mut self, icons: bool) -> Self {
        self.icons = icons;
        self
    }

    /// Suppress console output. Log file and tracing output continue.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Start timing and open the run's log file path.
    ///
    /// The log file is `<log_dir>/<timestamp>/<log_name_part>.log`; it is an
    /// error for it to exist already.
    pub fn start(&mut self, message: &str) -> Result<()> {
        self.timer.start();
        self.log_path = match self.log_dir {
            Some(ref dir) => {
                let timestamp = self.timer.timestamp().unwrap_or_default();
                let dir = dir.to_string_lossy();
                let name_part = self.log_name_part.as_deref().unwrap_or("");
                let name = join_non_empty(&[dir.as_ref(), timestamp.as_str(), name_part], "/");
                let path = PathBuf::from(format!("{name}.{LOG_FILE_EXT}"));
                if path.is_file() {
                    return Err(PkitError::invalid_argument(format!(
                        "log already exists at log_path ({})",
                        path.display()
                    )));
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| PkitError::io(parent, e))?;
                }
                Some(path)
            }
            None => None,
        };
        self.message_with(
            message,
            &MessageStyle {
                div: Some(Divider::new('=', '-')),
                vspace: 2,
                icon: Some(ICON_START),
                ..Default::default()
            },
        );
        Ok(())
    }

    /// Stop timing and print a completion message. Returns the stop time.
    pub fn stop(&mut self, message: &str) -> String {
        self.finish(message, ICON_SUCCESS)
    }

    /// Stop timing and print a failure message. Returns the stop time.
    pub fn fail(&mut self, message: &str, error: &dyn std::fmt::Display) -> String {
        self.finish(&format!("{message}: {error}"), ICON_FAILED)
    }

    fn finish(&mut self, message: &str, icon: &str) -> String {
        let stopped = self.timer.stop();
        let mut details = vec![("duration", self.timer.delta().unwrap_or_default())];
        if let Some(ref path) = self.log_path {
            details.push(("log", path.display().to_string()));
        }
        self.message_with(
            message,
            &MessageStyle {
                div: Some(Divider::new('-', '=')),
                vspace: 1,
                icon: Some(icon),
                details: &details,
                ..Default::default()
            },
        );
        stopped
    }

    /// Print a plain message.
    pub fn message(&self, msg: &str) {
        self.message_with(msg, &MessageStyle::default());
    }

    /// Print a message with key/value detail lines.
    pub fn details(&self, msg: &str, details: &[(&str, String)]) {
        self.message_with(
            msg,
            &MessageStyle {
                details,
                ..Default::default()
            },
        );
    }

    /// Print an error message.
    pub fn error(&self, msg: &str, error: &dyn std::fmt::Display) {
        self.message_with(
            &format!("{msg}: {error}"),
            &MessageStyle {
                icon: Some(ICON_FAILED),
                ..Default::default()
            },
        );
    }

    pub fn message_with(&self, msg: &str, style: &MessageStyle<'_>) {
        self.vspace(style.vspace);
        if let Some(div) = style.div {
            self.line(div.above);
        }
        let msg = match style.icon {
            Some(icon) if self.icons => format!("{icon} {msg}"),
            _ => msg.to_string(),
        };
        let text = self.format_msg(&msg, style.subheader, style.details);
        if style.icon == Some(ICON_FAILED) {
            tracing::error!(logger = %self.header, "{}", msg);
        } else {
            tracing::debug!(logger = %self.header, "{}", msg);
        }
        self.emit(&text);
        if let Some(div) = style.div {
            self.line(div.below);
        }
    }

    pub fn vspace(&self, lines: usize) {
        if lines > 0 {
            self.emit(&"\n".repeat(lines - 1));
        }
    }

    pub fn line(&self, marker: char) {
        self.emit(&marker.to_string().repeat(self.div_len));
    }

    /// `<header>[.<sub>] [<timestamp> (<elapsed>)]: <msg>` plus `- key: value` lines.
    fn format_msg(&self, message: &str, subheader: &[&str], details: &[(&str, String)]) -> String {
        let mut header = self.header.clone();
        if !subheader.is_empty() {
            let mut parts = vec![header.as_str()];
            parts.extend_from_slice(subheader);
            header = join_non_empty(&parts, ".");
        }
        let mut msg = format!(
            "{} [{} ({})]: {}",
            header,
            self.timer.timestamp().unwrap_or_default(),
            self.timer.state().unwrap_or_default(),
            message
        );
        for (k, v) in details {
            msg.push_str(&format!("\n- {}: {}", k, v));
        }
        msg
    }

    fn emit(&self, text: &str) {
        if !self.silent {
            println!("{}", text);
        }
        if let Some(ref path) = self.log_path {
            let written = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| writeln!(file, "{}", text));
            if let Err(e) = written {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write log file");
            }
        }
    }
}

fn join_non_empty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}
