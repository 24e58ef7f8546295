//! Library entry point: wires config, metadata, and the dispatcher into one
//! `simulate()` call shared by the CLI binary and the test suite.

pub mod clock;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod memory;
pub mod metadata;
pub mod pcb;
pub mod scheduler;
pub mod tracelog;

use std::path::Path;
use std::sync::Arc;

use clock::Clock;
use config::SimConfig;
use error::SimError;
use scheduler::Dispatcher;
use tracelog::TraceLog;

/// Runs a full simulation from a config file path and returns the trace
/// log's buffered lines (empty when `logTo` is `Monitor`, since nothing is
/// buffered in that mode). Flushes the trace to `logFilePath` before
/// returning whenever the config's `logTo` calls for a file, so this is the
/// single pipeline both the CLI binary and tests drive.
pub fn simulate(config_path: &Path) -> Result<Vec<String>, SimError> {
    let config = SimConfig::load(config_path)?;
    let ops = metadata::parse_metadata(&config.file_path)?;

    let clock = Arc::new(Clock::new());
    let log = Arc::new(TraceLog::new(config.log_to, config.log_file_path.clone()));

    let dispatcher = Dispatcher::new(config, clock, log.clone());
    let result = dispatcher.run(ops);
    log.flush()?;
    result?;

    Ok(log.snapshot())
}
