//! Simulator configuration file parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;
use crate::tracelog::LogTarget;

const START_LINE: &str = "Start Simulator Configuration File";
const END_LINE: &str = "End Simulator Configuration File.";

/// Pattern for a single `Key : value` config line. Keys may contain
/// anything but a colon; the value is everything after the first colon,
/// trimmed.
static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^:]+):\s*(.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingPolicy {
    FcfsN,
    SjfN,
    FcfsP,
    SrtfP,
    RrP,
}

impl SchedulingPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "NONE" | "FCFS-N" => Some(SchedulingPolicy::FcfsN),
            "SJF-N" => Some(SchedulingPolicy::SjfN),
            "FCFS-P" => Some(SchedulingPolicy::FcfsP),
            "SRTF-P" => Some(SchedulingPolicy::SrtfP),
            "RR-P" => Some(SchedulingPolicy::RrP),
            _ => None,
        }
    }

    pub fn is_preemptive(self) -> bool {
        matches!(
            self,
            SchedulingPolicy::FcfsP | SchedulingPolicy::SrtfP | SchedulingPolicy::RrP
        )
    }

    /// The literal code rendered into `OS: <CODE> Strategy selects ...`
    /// trace lines.
    pub fn code(self) -> &'static str {
        match self {
            SchedulingPolicy::FcfsN => "FCFS-N",
            SchedulingPolicy::SjfN => "SJF-N",
            SchedulingPolicy::FcfsP => "FCFS-P",
            SchedulingPolicy::SrtfP => "SRTF-P",
            SchedulingPolicy::RrP => "RR-P",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub version_phase: u32,
    pub file_path: PathBuf,
    pub cpu_sched_code: SchedulingPolicy,
    pub quantum_time: u32,
    pub memory_available: u32,
    pub processor_cycle_time: u32,
    pub io_cycle_time: u32,
    pub log_to: LogTarget,
    pub log_file_path: PathBuf,
}

struct Reader<'a> {
    lines: std::iter::Peekable<std::slice::Iter<'a, &'a str>>,
}

impl<'a> Reader<'a> {
    fn next_nonblank(&mut self) -> Option<&'a str> {
        while let Some(line) = self.lines.next() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
        None
    }

    fn expect_value(&mut self, key: &'static str) -> Result<String, ConfigError> {
        let line = self
            .next_nonblank()
            .ok_or(ConfigError::MissingKey { expected: key })?;
        let caps = LINE_PATTERN
            .captures(line)
            .ok_or(ConfigError::MissingKey { expected: key })?;
        let found_key = caps
            .get(1)
            .ok_or(ConfigError::MissingKey { expected: key })?
            .as_str()
            .trim();
        if found_key != key {
            return Err(ConfigError::MissingKey { expected: key });
        }
        let value = caps
            .get(2)
            .ok_or(ConfigError::MissingKey { expected: key })?
            .as_str()
            .trim()
            .to_string();
        Ok(value)
    }
}

fn parse_ranged(
    raw: &str,
    key: &'static str,
    min: i64,
    max: i64,
) -> Result<u32, ConfigError> {
    let value: i64 = raw
        .parse()
        .map_err(|_| ConfigError::OutOfRange { key, min, max, got: i64::MIN })?;
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            key,
            min,
            max,
            got: value,
        });
    }
    Ok(value as u32)
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let owned_lines: Vec<&str> = contents.lines().collect();
        let mut reader = Reader {
            lines: owned_lines.iter().peekable(),
        };

        let start = reader.next_nonblank().ok_or(ConfigError::BadStartLine)?;
        if start != START_LINE {
            return Err(ConfigError::BadStartLine);
        }

        let version_phase = parse_ranged(
            &reader.expect_value("Version/Phase")?,
            "Version/Phase",
            0,
            10,
        )?;
        let file_path = PathBuf::from(reader.expect_value("File Path")?);
        let sched_raw = reader.expect_value("CPU Scheduling Code")?;
        let cpu_sched_code = SchedulingPolicy::parse(&sched_raw)
            .ok_or_else(|| ConfigError::UnknownSchedulingCode(sched_raw.clone()))?;
        let quantum_time = parse_ranged(
            &reader.expect_value("Quantum Time (cycles)")?,
            "Quantum Time (cycles)",
            0,
            100,
        )?;
        let memory_available = parse_ranged(
            &reader.expect_value("Memory Available (KB)")?,
            "Memory Available (KB)",
            0,
            1_048_576,
        )?;
        let processor_cycle_time = parse_ranged(
            &reader.expect_value("Processor Cycle Time")?,
            "Processor Cycle Time",
            0,
            1000,
        )?;
        let io_cycle_time = parse_ranged(
            &reader.expect_value("I/O Cycle Time (msec)")?,
            "I/O Cycle Time (msec)",
            0,
            100,
        )?;
        let log_to_raw = reader.expect_value("Log To")?;
        let log_to = LogTarget::parse(&log_to_raw)
            .ok_or_else(|| ConfigError::UnknownLogTarget(log_to_raw.clone()))?;
        let log_file_path = PathBuf::from(reader.expect_value("Log File Path")?);

        let end = reader.next_nonblank().ok_or(ConfigError::BadEndLine)?;
        if end != END_LINE {
            return Err(ConfigError::BadEndLine);
        }

        Ok(SimConfig {
            version_phase,
            file_path,
            cpu_sched_code,
            quantum_time,
            memory_available,
            processor_cycle_time,
            io_cycle_time,
            log_to,
            log_file_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample(quantum: &str, sched: &str) -> String {
        format!(
            "Start Simulator Configuration File\n\
             Version/Phase            : 1\n\
             File Path                : meta.mdf\n\
             CPU Scheduling Code      : {sched}\n\
             Quantum Time (cycles)    : {quantum}\n\
             Memory Available (KB)    : 1024\n\
             Processor Cycle Time     : 10\n\
             I/O Cycle Time (msec)    : 5\n\
             Log To                   : Both\n\
             Log File Path            : out.log\n\
             End Simulator Configuration File.\n"
        )
    }

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_well_formed_config() {
        let file = write_temp(&sample("2", "RR-P"));
        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.quantum_time, 2);
        assert_eq!(config.cpu_sched_code, SchedulingPolicy::RrP);
        assert_eq!(config.log_to, LogTarget::Both);
        assert_eq!(config.memory_available, 1024);
    }

    #[test]
    fn none_maps_to_fcfs_n() {
        let file = write_temp(&sample("0", "NONE"));
        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.cpu_sched_code, SchedulingPolicy::FcfsN);
        assert!(!config.cpu_sched_code.is_preemptive());
    }

    #[test]
    fn rejects_out_of_range_quantum() {
        let file = write_temp(&sample("101", "RR-P"));
        let err = SimConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "Quantum Time (cycles)", .. }));
    }

    #[test]
    fn rejects_unknown_scheduling_code() {
        let file = write_temp(&sample("2", "LOTTERY"));
        let err = SimConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSchedulingCode(_)));
    }

    #[test]
    fn rejects_missing_sentinel() {
        let broken = sample("2", "RR-P").replacen("Start Simulator Configuration File", "Begin Config", 1);
        let file = write_temp(&broken);
        let err = SimConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::BadStartLine));
    }
}
