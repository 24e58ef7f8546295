//! The dispatcher: policy-driven PCB selection, per-operation execution, and
//! the state-transition table that drives processes from Ready to Exit.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::{SchedulingPolicy, SimConfig};
use crate::error::SimError;
use crate::interrupt::{self, InterruptQueue};
use crate::memory::{Mmu, MmuOutcome, Segment};
use crate::metadata::{decode_memory, Command, Operation};
use crate::pcb::{build_pcbs, Pcb, ProcessState};
use crate::tracelog::TraceLog;

enum StepOutcome {
    Completed,
    QuantumExpired,
    Blocked,
    InterruptPending,
    SegFault,
}

enum NonPreemptivePolicy {
    Fcfs,
    Sjf,
}

/// Owns every PCB, the MMU table, and the interrupt queue, and drives the
/// policy-selected execution loop described by the scheduling protocol.
/// Everything here runs on a single control thread; only I/O workers run
/// elsewhere.
pub struct Dispatcher {
    config: SimConfig,
    clock: Arc<Clock>,
    log: Arc<TraceLog>,
    mmu: Mmu,
    interrupts: Arc<InterruptQueue>,
    pcbs: Vec<Pcb>,
}

impl Dispatcher {
    pub fn new(config: SimConfig, clock: Arc<Clock>, log: Arc<TraceLog>) -> Self {
        let mmu = Mmu::new(config.memory_available);
        Dispatcher {
            config,
            clock,
            log,
            mmu,
            interrupts: Arc::new(InterruptQueue::new()),
            pcbs: Vec::new(),
        }
    }

    fn log_line(&self, body: &str) {
        self.log.line(self.clock.lap(), body);
    }

    /// Builds PCBs from the parsed operation stream, then runs the
    /// scheduling loop for whichever policy the config selected.
    pub fn run(mut self, ops: Vec<Operation>) -> Result<(), SimError> {
        self.log_line("System start");
        self.log_line("OS: Begin PCB Creation");

        let pcbs = match build_pcbs(&ops, &self.config) {
            Ok(pcbs) => pcbs,
            Err(err) => {
                self.log_line(&format!("OS: Unable to create PCB list: {err}"));
                return Err(SimError::from(err));
            }
        };
        self.pcbs = pcbs;
        self.log_line("OS: All processes initialized in New state");

        for pcb in &mut self.pcbs {
            pcb.state = ProcessState::Ready;
        }
        self.log_line("OS: All processes now set in Ready state");

        match self.config.cpu_sched_code {
            SchedulingPolicy::FcfsN => self.run_non_preemptive(NonPreemptivePolicy::Fcfs),
            SchedulingPolicy::SjfN => self.run_non_preemptive(NonPreemptivePolicy::Sjf),
            SchedulingPolicy::FcfsP | SchedulingPolicy::SrtfP | SchedulingPolicy::RrP => {
                self.run_preemptive()
            }
        }

        self.log_line("System stop");
        Ok(())
    }

    // ---- non-preemptive policies (FCFS-N, SJF-N) ----

    fn run_non_preemptive(&mut self, policy: NonPreemptivePolicy) {
        loop {
            let idx = match policy {
                NonPreemptivePolicy::Fcfs => {
                    self.pcbs.iter().position(|p| p.state == ProcessState::Ready)
                }
                NonPreemptivePolicy::Sjf => self.select_shortest_ready(),
            };
            let idx = match idx {
                Some(idx) => idx,
                None => break,
            };
            self.log_selection(idx);
            self.set_state(idx, ProcessState::Running);
            self.run_to_completion(idx);
        }
    }

    /// Smallest `processTime` among Ready PCBs; ties go to the
    /// first-encountered (lowest index) PCB.
    fn select_shortest_ready(&self) -> Option<usize> {
        self.pcbs
            .iter()
            .enumerate()
            .filter(|(_, pcb)| pcb.state == ProcessState::Ready)
            .min_by_key(|(_, pcb)| pcb.process_time)
            .map(|(idx, _)| idx)
    }

    fn run_to_completion(&mut self, idx: usize) {
        loop {
            if self.pcbs[idx].is_terminal() {
                break;
            }
            match self.run_one_operation(idx) {
                StepOutcome::Completed => continue,
                StepOutcome::SegFault => {
                    let pn = self.pcbs[idx].process_num;
                    self.log_line(&format!("OS: Process {pn}, Segmentation Fault - Process ended"));
                    break;
                }
                StepOutcome::QuantumExpired | StepOutcome::Blocked | StepOutcome::InterruptPending => {
                    unreachable!("non-preemptive execution never yields mid-process")
                }
            }
        }
        let pn = self.pcbs[idx].process_num;
        self.mmu.deallocate(pn);
        self.set_state(idx, ProcessState::Exit);
    }

    // ---- preemptive policies (FCFS-P, SRTF-P, RR-P) ----

    fn run_preemptive(&mut self) {
        let mut ring_cursor = 0usize;
        loop {
            if self.all_exit() {
                break;
            }
            match self.select_ready_preemptive(&mut ring_cursor) {
                Some(idx) => {
                    self.log_selection(idx);
                    self.set_state(idx, ProcessState::Running);
                    let outcome = self.run_one_operation(idx);
                    self.apply_preemptive_outcome(idx, outcome);
                }
                None => {
                    self.log_line("OS: CPU Idle");
                    self.interrupts.wait_non_empty();
                    self.drain_interrupts();
                }
            }
        }
    }

    fn all_exit(&self) -> bool {
        self.pcbs.iter().all(|p| p.state == ProcessState::Exit)
    }

    fn select_ready_preemptive(&self, ring_cursor: &mut usize) -> Option<usize> {
        let n = self.pcbs.len();
        if n == 0 {
            return None;
        }
        if self.config.cpu_sched_code == SchedulingPolicy::SrtfP {
            return self
                .pcbs
                .iter()
                .enumerate()
                .filter(|(_, pcb)| pcb.state == ProcessState::Ready)
                .min_by_key(|(_, pcb)| pcb.process_time)
                .map(|(idx, _)| idx);
        }
        // FCFS-P and RR-P both pick the next Ready PCB encountered while
        // advancing the ring.
        for offset in 0..n {
            let idx = (*ring_cursor + offset) % n;
            if self.pcbs[idx].state == ProcessState::Ready {
                *ring_cursor = (idx + 1) % n;
                return Some(idx);
            }
        }
        None
    }

    fn apply_preemptive_outcome(&mut self, idx: usize, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Completed => {
                if self.pcbs[idx].is_terminal() {
                    let pn = self.pcbs[idx].process_num;
                    self.mmu.deallocate(pn);
                    self.set_state(idx, ProcessState::Exit);
                } else {
                    self.set_state(idx, ProcessState::Ready);
                }
            }
            StepOutcome::QuantumExpired => {
                self.set_state(idx, ProcessState::Ready);
            }
            StepOutcome::Blocked => {
                self.set_state(idx, ProcessState::Blocked);
            }
            StepOutcome::InterruptPending => {
                self.set_state(idx, ProcessState::Ready);
                self.drain_interrupts();
            }
            StepOutcome::SegFault => {
                let pn = self.pcbs[idx].process_num;
                self.log_line(&format!("OS: Process {pn}, Segmentation Fault - Process ended"));
                self.mmu.deallocate(pn);
                self.set_state(idx, ProcessState::Exit);
            }
        }
    }

    fn drain_interrupts(&mut self) {
        let records = self.interrupts.drain();
        if records.is_empty() {
            return;
        }
        self.log_line("OS: Handling Interupts");
        for record in records {
            self.log_line(&format!("OS: Interupt, Process {}", record.process_num));
            self.log_line(&format!("{} {} end", record.op_string, record.op_print));
            if let Some(idx) = self
                .pcbs
                .iter()
                .position(|p| p.process_num == record.process_num)
            {
                self.pcbs[idx].process_time -= record.run_time as i64;
                self.set_state(idx, ProcessState::Ready);
            }
        }
    }

    // ---- shared per-operation execution ----

    fn log_selection(&self, idx: usize) {
        let code = self.config.cpu_sched_code.code();
        let pn = self.pcbs[idx].process_num;
        let t = self.pcbs[idx].process_time;
        self.log_line(&format!("OS: {code} Strategy selects Process {pn} with time: {t} mSec"));
    }

    fn set_state(&mut self, idx: usize, state: ProcessState) {
        self.pcbs[idx].state = state;
        let pn = self.pcbs[idx].process_num;
        self.log_line(&format!("OS: Process {pn} set in {} state", state.label()));
    }

    fn run_one_operation(&mut self, idx: usize) -> StepOutcome {
        let preemptive = self.config.cpu_sched_code.is_preemptive();
        match self.pcbs[idx].current_op().command {
            Command::Processing => self.exec_processing(idx, preemptive),
            Command::Input | Command::Output => self.exec_io(idx, preemptive),
            Command::Memory => self.exec_memory(idx),
            Command::Sentinel | Command::Application => {
                unreachable!("pcb operation streams never contain boundary markers")
            }
        }
    }

    fn exec_processing(&mut self, idx: usize, preemptive: bool) -> StepOutcome {
        let pn = self.pcbs[idx].process_num;

        if preemptive && !self.interrupts.is_empty() {
            return StepOutcome::InterruptPending;
        }

        self.log_line(&format!("Process {pn}, Run operation start"));

        if preemptive {
            let quantum = self.config.quantum_time;
            let remaining = self.pcbs[idx].current_op().cycle_time;
            let slice = remaining.min(quantum);
            let run_time = slice as u64 * self.config.processor_cycle_time as u64;

            self.clock.delay(run_time);
            self.pcbs[idx].process_time -= run_time as i64;
            self.pcbs[idx].ops[self.pcbs[idx].cursor].cycle_time -= slice;

            if self.pcbs[idx].current_op().cycle_time > 0 {
                self.log_line(&format!("Process {pn}, quantum time out"));
                StepOutcome::QuantumExpired
            } else {
                self.log_line(&format!("Process {pn}, Run operation end"));
                self.pcbs[idx].cursor += 1;
                StepOutcome::Completed
            }
        } else {
            let cycle_time = self.pcbs[idx].current_op().cycle_time;
            let run_time = cycle_time as u64 * self.config.processor_cycle_time as u64;

            self.clock.delay(run_time);
            self.pcbs[idx].process_time -= run_time as i64;
            self.log_line(&format!("Process {pn}, Run operation end"));
            self.pcbs[idx].cursor += 1;
            StepOutcome::Completed
        }
    }

    fn exec_io(&mut self, idx: usize, preemptive: bool) -> StepOutcome {
        let pn = self.pcbs[idx].process_num;
        let op = self.pcbs[idx].current_op().clone();
        let op_print: &'static str = match op.command {
            Command::Input => "input",
            Command::Output => "output",
            _ => unreachable!("exec_io only dispatches on I/O commands"),
        };
        let run_time = op.cycle_time as u64 * self.config.io_cycle_time as u64;

        self.log_line(&format!("Process {pn}, {} {op_print} start", op.op_string));

        if preemptive {
            self.pcbs[idx].cursor += 1;
            match interrupt::spawn_worker(
                self.clock.clone(),
                self.interrupts.clone(),
                pn,
                run_time,
                op.op_string.clone(),
                op_print,
            ) {
                Ok(_handle) => StepOutcome::Blocked,
                Err(err) => {
                    self.log_line(&format!(
                        "OS: Process {pn}, I/O worker spawn failed ({err}); treating as completed"
                    ));
                    StepOutcome::Completed
                }
            }
        } else {
            if let Err(err) = interrupt::run_blocking(self.clock.clone(), run_time) {
                self.log_line(&format!(
                    "OS: Process {pn}, I/O worker spawn failed ({err}); treating as completed"
                ));
            } else {
                self.pcbs[idx].process_time -= run_time as i64;
            }
            self.log_line(&format!("Process {pn}, {} {op_print} end", op.op_string));
            self.pcbs[idx].cursor += 1;
            StepOutcome::Completed
        }
    }

    fn exec_memory(&mut self, idx: usize) -> StepOutcome {
        let pn = self.pcbs[idx].process_num;
        let op = self.pcbs[idx].current_op().clone();
        let (segment, start, offset) = decode_memory(op.cycle_time);
        let verb = if op.op_string == "allocate" {
            "Allocation"
        } else {
            "Access"
        };

        self.log_line(&format!("Process {pn}, MMU {verb}: {segment}/{start}/{offset}"));

        let candidate = Segment {
            segment,
            start,
            offset,
            owner: pn,
        };
        let outcome = if op.op_string == "allocate" {
            self.mmu.allocate(candidate)
        } else {
            self.mmu.access(candidate)
        };

        let result = match outcome {
            MmuOutcome::Success => "Success",
            MmuOutcome::Failed => "Failed",
        };
        self.log_line(&format!("Process {pn}, MMU {verb}: {result}"));

        match outcome {
            MmuOutcome::Success => {
                self.pcbs[idx].cursor += 1;
                StepOutcome::Completed
            }
            MmuOutcome::Failed => StepOutcome::SegFault,
        }
    }
}
