//! Typed error enums for config, metadata, and PCB-build failures.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading and validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to open config file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad start line in config file")]
    BadStartLine,
    #[error("bad end line in config file")]
    BadEndLine,
    #[error("missing or misspelled key, expected line starting with {expected:?}")]
    MissingKey { expected: &'static str },
    #[error("value for {key} out of range [{min}, {max}]: got {got}")]
    OutOfRange {
        key: &'static str,
        min: i64,
        max: i64,
        got: i64,
    },
    #[error("unrecognized scheduling code: {0:?}")]
    UnknownSchedulingCode(String),
    #[error("unrecognized log destination: {0:?}")]
    UnknownLogTarget(String),
}

/// Errors raised while lexing and validating a metadata file.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("unable to open metadata file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad start line in metadata file")]
    BadStartLine,
    #[error("bad end line in metadata file")]
    BadEndLine,
    #[error("bad metadata component: {0:?}")]
    BadComponent(String),
    #[error("unrecognized command letter {0:?} in component {1:?}")]
    UnknownCommand(char, String),
    #[error("opString {op_string:?} is not valid for command {command:?}")]
    InvalidOpString { command: char, op_string: String },
    #[error("cycle time {0:?} is not a non-negative integer")]
    BadCycleTime(String),
}

/// Errors raised while assembling process control blocks from a parsed
/// metadata stream.
#[derive(Debug, Error)]
pub enum PcbBuildError {
    #[error("metadata does not open with S(start)")]
    MissingOuterStart,
    #[error("metadata ends without a matching S(end)")]
    MissingOuterEnd,
    #[error("A(start) encountered while process {0} is already open")]
    NestedStart(usize),
    #[error("A(end) encountered with no matching A(start)")]
    UnmatchedEnd,
    #[error("operation encountered outside any A(start)/A(end) boundary")]
    OperationOutsideBoundary,
    #[error("A(start) for process {0} has no matching A(end)")]
    UnterminatedProcess(usize),
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    PcbBuild(#[from] PcbBuildError),
    #[error("failed to write trace log to {path:?}: {source}")]
    LogFlush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type SimResult<T> = Result<T, SimError>;
