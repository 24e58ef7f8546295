//! Process control blocks and the build pass that splits a metadata stream
//! into one PCB per `A(start)`/`A(end)` boundary.

use crate::config::SimConfig;
use crate::error::PcbBuildError;
use crate::metadata::{Command, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Blocked,
    Running,
    Exit,
}

impl ProcessState {
    pub fn label(self) -> &'static str {
        match self {
            ProcessState::New => "New",
            ProcessState::Ready => "Ready",
            ProcessState::Blocked => "Blocked",
            ProcessState::Running => "Running",
            ProcessState::Exit => "Exit",
        }
    }
}

/// Per-process state the dispatcher owns exclusively. `ops` holds only the
/// operations between this process's `A(start)` and `A(end)`; `cursor`
/// indexes into it, and `cursor == ops.len()` means the next step is the
/// terminal `A(end)`.
#[derive(Debug)]
pub struct Pcb {
    pub process_num: usize,
    pub process_time: i64,
    pub cursor: usize,
    pub state: ProcessState,
    pub ops: Vec<Operation>,
}

impl Pcb {
    pub fn is_terminal(&self) -> bool {
        self.cursor >= self.ops.len()
    }

    pub fn current_op(&self) -> &Operation {
        &self.ops[self.cursor]
    }
}

/// Nominal time cost of one operation, in milliseconds, under the given
/// config. `M` operations are zero-cost; `P` is billed at the processor
/// cycle rate, `I`/`O` at the I/O cycle rate.
pub fn op_time(op: &Operation, config: &SimConfig) -> i64 {
    match op.command {
        Command::Processing => op.cycle_time as i64 * config.processor_cycle_time as i64,
        Command::Input | Command::Output => op.cycle_time as i64 * config.io_cycle_time as i64,
        Command::Memory | Command::Sentinel | Command::Application => 0,
    }
}

struct OpenProcess {
    process_num: usize,
    ops: Vec<Operation>,
    process_time: i64,
}

/// Splits a flat, already-lexed operation stream into one [`Pcb`] per
/// `A(start)`/`A(end)` boundary, in discovery order.
pub fn build_pcbs(ops: &[Operation], config: &SimConfig) -> Result<Vec<Pcb>, PcbBuildError> {
    let mut iter = ops.iter();

    let first = iter.next().ok_or(PcbBuildError::MissingOuterStart)?;
    if first.command != Command::Sentinel || first.op_string != "start" {
        return Err(PcbBuildError::MissingOuterStart);
    }

    let mut pcbs = Vec::new();
    let mut current: Option<OpenProcess> = None;
    let mut next_process_num = 0usize;
    let mut found_outer_end = false;

    for op in iter {
        match op.command {
            Command::Sentinel if op.op_string == "end" => {
                found_outer_end = true;
                break;
            }
            Command::Application if op.op_string == "start" => {
                if let Some(open) = &current {
                    return Err(PcbBuildError::NestedStart(open.process_num));
                }
                current = Some(OpenProcess {
                    process_num: next_process_num,
                    ops: Vec::new(),
                    process_time: 0,
                });
                next_process_num += 1;
            }
            Command::Application if op.op_string == "end" => {
                let open = current.take().ok_or(PcbBuildError::UnmatchedEnd)?;
                pcbs.push(Pcb {
                    process_num: open.process_num,
                    process_time: open.process_time,
                    cursor: 0,
                    state: ProcessState::New,
                    ops: open.ops,
                });
            }
            _ => {
                let open = current
                    .as_mut()
                    .ok_or(PcbBuildError::OperationOutsideBoundary)?;
                open.process_time += op_time(op, config);
                open.ops.push(op.clone());
            }
        }
    }

    if !found_outer_end {
        return Err(PcbBuildError::MissingOuterEnd);
    }
    if let Some(open) = current {
        return Err(PcbBuildError::UnterminatedProcess(open.process_num));
    }

    Ok(pcbs)
}
