use std::io::Write;
use std::path::PathBuf;

use sisim::simulate;

struct Fixture {
    _config_file: tempfile::NamedTempFile,
    _meta_file: tempfile::NamedTempFile,
    config_path: PathBuf,
}

fn fixture(sched: &str, quantum: u32, proc_cycle: u32, io_cycle: u32, meta_body: &str) -> Fixture {
    let dir = std::env::temp_dir();
    let mut meta_file = tempfile::NamedTempFile::new_in(&dir).unwrap();
    write!(
        meta_file,
        "Start Program Meta-Data Code:\n{meta_body}\nEnd Program Meta-Data Code.\n"
    )
    .unwrap();

    let mut config_file = tempfile::NamedTempFile::new_in(&dir).unwrap();
    write!(
        config_file,
        "Start Simulator Configuration File\n\
         Version/Phase            : 1\n\
         File Path                : {}\n\
         CPU Scheduling Code      : {sched}\n\
         Quantum Time (cycles)    : {quantum}\n\
         Memory Available (KB)    : 4096\n\
         Processor Cycle Time     : {proc_cycle}\n\
         I/O Cycle Time (msec)    : {io_cycle}\n\
         Log To                   : Both\n\
         Log File Path            : {}\n\
         End Simulator Configuration File.\n",
        meta_file.path().display(),
        dir.join("unused-trace.log").display(),
    )
    .unwrap();

    let config_path = config_file.path().to_path_buf();
    Fixture {
        _config_file: config_file,
        _meta_file: meta_file,
        config_path,
    }
}

#[test]
fn scenario_fcfs_n_two_processes_run_in_order() {
    let f = fixture(
        "FCFS-N",
        2,
        10,
        5,
        "S(start)0;A(start)0;P(run)3;A(end)0;A(start)0;P(run)1;A(end)0;S(end)0.",
    );
    let lines = simulate(&f.config_path).unwrap();

    let first_exit = lines
        .iter()
        .position(|l| l.contains("Process 0 set in Exit state"))
        .unwrap();
    let second_exit = lines
        .iter()
        .position(|l| l.contains("Process 1 set in Exit state"))
        .unwrap();
    assert!(first_exit < second_exit);
    assert!(!lines.iter().any(|l| l.contains("quantum time out")));
}

#[test]
fn scenario_sjf_n_tie_break_prefers_ring_head() {
    let f = fixture(
        "SJF-N",
        2,
        10,
        5,
        "S(start)0;A(start)0;P(run)2;A(end)0;A(start)0;P(run)2;A(end)0;S(end)0.",
    );
    let lines = simulate(&f.config_path).unwrap();

    let selects: Vec<&String> = lines
        .iter()
        .filter(|l| l.contains("Strategy selects"))
        .collect();
    assert!(selects[0].contains("Process 0"));
}

#[test]
fn scenario_rr_p_slices_long_operation() {
    let f = fixture(
        "RR-P",
        2,
        10,
        5,
        "S(start)0;A(start)0;P(run)5;A(end)0;S(end)0.",
    );
    let lines = simulate(&f.config_path).unwrap();

    let quantum_outs = lines.iter().filter(|l| l.contains("quantum time out")).count();
    let run_ends = lines.iter().filter(|l| l.contains("Run operation end")).count();
    assert_eq!(quantum_outs, 2);
    assert_eq!(run_ends, 1);
}

#[test]
fn scenario_fcfs_p_io_blocks_and_resumes() {
    let f = fixture(
        "FCFS-P",
        2,
        10,
        5,
        "S(start)0;A(start)0;I(keyboard)4;P(run)2;A(end)0;S(end)0.",
    );
    let lines = simulate(&f.config_path).unwrap();

    assert!(lines.iter().any(|l| l.contains("keyboard input start")));
    assert!(lines.iter().any(|l| l.contains("Process 0 set in Blocked state")));
    assert!(lines.iter().any(|l| l.contains("keyboard input end")));
    assert!(lines.iter().any(|l| l.contains("Process 0 set in Exit state")));
}

#[test]
fn scenario_segmentation_fault_only_affects_offending_process() {
    let f = fixture(
        "FCFS-N",
        2,
        10,
        5,
        "S(start)0;A(start)0;M(allocate)0;M(access)1000500;A(end)0;A(start)0;P(run)1;A(end)0;S(end)0.",
    );
    let lines = simulate(&f.config_path).unwrap();

    assert!(lines.iter().any(|l| l.contains("Segmentation Fault")));
    assert!(lines.iter().any(|l| l.contains("Process 0 set in Exit state")));
    assert!(lines.iter().any(|l| l.contains("Process 1 set in Exit state")));
}

#[test]
fn scenario_overlapping_memory_allocation_fails() {
    let f = fixture(
        "FCFS-N",
        2,
        10,
        5,
        "S(start)0;A(start)0;M(allocate)1000100;M(allocate)1050100;A(end)0;S(end)0.",
    );
    let lines = simulate(&f.config_path).unwrap();

    let failures = lines.iter().filter(|l| l.contains("MMU Allocation: Failed")).count();
    assert_eq!(failures, 1);
}

#[test]
fn malformed_config_is_reported_as_an_error() {
    let dir = std::env::temp_dir();
    let mut bad_config = tempfile::NamedTempFile::new_in(&dir).unwrap();
    write!(bad_config, "Not a config file at all\n").unwrap();
    let err = simulate(bad_config.path()).unwrap_err();
    assert!(format!("{err}").len() > 0);
}
