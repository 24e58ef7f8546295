//! Interrupt queue and I/O worker threads: background completions published
//! here are drained by the dispatcher at safe points.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::clock::Clock;

/// A completed (or about-to-complete) I/O record published by a worker and
/// consumed by the dispatcher. `end_time` is only meaningful once the
/// record has actually been pushed onto the queue; workers never publish a
/// record before it is fully populated.
#[derive(Debug, Clone)]
pub struct InterruptRecord {
    pub process_num: usize,
    pub run_time: u64,
    pub end_time: f64,
    pub op_string: String,
    pub op_print: &'static str,
}

/// Unbounded queue of I/O completions. Workers publish under the mutex and
/// signal the condvar; the dispatcher drains the whole queue at once at
/// safe points, or blocks on the condvar while idle.
pub struct InterruptQueue {
    inner: Mutex<VecDeque<InterruptRecord>>,
    non_empty: Condvar,
}

impl InterruptQueue {
    pub fn new() -> Self {
        InterruptQueue {
            inner: Mutex::new(VecDeque::new()),
            non_empty: Condvar::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    fn push(&self, record: InterruptRecord) {
        let mut queue = self.inner.lock().unwrap();
        queue.push_back(record);
        self.non_empty.notify_all();
    }

    /// Blocks the calling (dispatcher) thread until at least one record is
    /// queued. Used only for the idle wait, replacing the busy-spin the
    /// original implementation used to poll its queue cursor.
    pub fn wait_non_empty(&self) {
        let guard = self.inner.lock().unwrap();
        let _guard = self
            .non_empty
            .wait_while(guard, |queue| queue.is_empty())
            .unwrap();
    }

    /// Drains every currently-queued record, in insertion (not
    /// finish-time) order.
    pub fn drain(&self) -> Vec<InterruptRecord> {
        let mut queue = self.inner.lock().unwrap();
        queue.drain(..).collect()
    }
}

impl Default for InterruptQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Launches a detached background worker that delays for `run_time` ms and
/// then publishes an [`InterruptRecord`]. The worker never touches PCB
/// state; `processTime` accounting happens in the dispatcher's drain step,
/// fencing the mutation against a happens-before from this publish.
///
/// On spawn failure the caller is responsible for the §7 best-effort
/// disposition (log it, advance the operation as if it had completed) since
/// no worker means no interrupt will ever arrive for this op.
pub fn spawn_worker(
    clock: Arc<Clock>,
    queue: Arc<InterruptQueue>,
    process_num: usize,
    run_time: u64,
    op_string: String,
    op_print: &'static str,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().spawn(move || {
        clock.delay(run_time);
        let end_time = clock.lap();
        queue.push(InterruptRecord {
            process_num,
            run_time,
            end_time,
            op_string,
            op_print,
        });
    })
}

/// Runs an I/O delay on a background thread and blocks the caller until it
/// finishes, for the non-preemptive "join inline" path. Returns `Err` if the
/// worker thread could not be spawned at all; the caller then treats the
/// operation as completed per §7 rather than actually having delayed.
pub fn run_blocking(clock: Arc<Clock>, run_time: u64) -> std::io::Result<()> {
    let handle = thread::Builder::new().spawn(move || clock.delay(run_time))?;
    let _ = handle.join();
    Ok(())
}
