//! The spec-mandated trace log: totally-ordered, timestamp-prefixed domain
//! output, fanned out to console and/or a buffered sequence for file flush.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::SimError;

/// Where trace lines are delivered, mirroring the config file's `logTo`
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Monitor,
    File,
    Both,
}

impl LogTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Monitor" => Some(LogTarget::Monitor),
            "File" => Some(LogTarget::File),
            "Both" => Some(LogTarget::Both),
            _ => None,
        }
    }

    fn wants_console(self) -> bool {
        matches!(self, LogTarget::Monitor | LogTarget::Both)
    }

    fn wants_buffer(self) -> bool {
        matches!(self, LogTarget::File | LogTarget::Both)
    }
}

/// The simulation's user-facing event stream. Distinct from the crate's
/// `tracing` diagnostics: this is domain output, not developer-facing
/// logging, and every line is formatted exactly as spec'd.
struct LogState {
    buffer: Vec<String>,
}

pub struct TraceLog {
    target: LogTarget,
    log_file_path: PathBuf,
    state: Mutex<LogState>,
}

impl TraceLog {
    pub fn new(target: LogTarget, log_file_path: impl Into<PathBuf>) -> Self {
        TraceLog {
            target,
            log_file_path: log_file_path.into(),
            state: Mutex::new(LogState { buffer: Vec::new() }),
        }
    }

    /// Appends one formatted trace line, routing it to the console and/or
    /// the in-memory buffer per the configured target. Both the console
    /// write and the buffer push happen under the same lock acquisition, so
    /// concurrent appends from worker threads and the dispatcher are
    /// totally ordered at line granularity rather than merely per-sink.
    pub fn line(&self, time: f64, body: impl AsRef<str>) {
        let formatted = format!("Time:{:10.6}, {}", time, body.as_ref());
        let mut state = self.state.lock().unwrap();
        if self.target.wants_console() {
            println!("{formatted}");
        }
        if self.target.wants_buffer() {
            state.buffer.push(formatted);
        }
    }

    /// A snapshot of every buffered line in insertion order. Useful for
    /// asserting on trace content in tests; empty under `LogTarget::Monitor`
    /// since nothing is buffered in that mode.
    pub fn snapshot(&self) -> Vec<String> {
        self.state.lock().unwrap().buffer.clone()
    }

    /// Writes the buffered trace to `log_file_path`, one line per entry.
    /// No-op when the target doesn't call for a file at all.
    pub fn flush(&self) -> Result<(), SimError> {
        if !self.target.wants_buffer() {
            return Ok(());
        }
        let state = self.state.lock().unwrap();
        let contents = state.buffer.join("\n") + if state.buffer.is_empty() { "" } else { "\n" };
        fs::write(&self.log_file_path, contents).map_err(|source| SimError::LogFlush {
            path: self.log_file_path.clone(),
            source,
        })
    }

    pub fn log_file_path(&self) -> &Path {
        &self.log_file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_target_does_not_buffer() {
        let log = TraceLog::new(LogTarget::Monitor, "unused.log");
        log.line(0.0, "System start");
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn both_target_buffers_and_formats() {
        let log = TraceLog::new(LogTarget::Both, "unused.log");
        log.line(1.5, "System start");
        let lines = log.snapshot();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], "Time:  1.500000, System start");
    }

    #[test]
    fn parse_rejects_unknown_targets() {
        assert_eq!(LogTarget::parse("Screen"), None);
        assert_eq!(LogTarget::parse("Both"), Some(LogTarget::Both));
    }
}
