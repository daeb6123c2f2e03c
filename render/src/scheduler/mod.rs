//! Worker thread pool for parallel command recording.
//!
//! A fixed set of persistent workers, one task channel each. Culling
//! and secondary-buffer recording split the visibility set into
//! contiguous chunks and pin each chunk to a worker; [`WorkerScheduler::wait`]
//! is the per-phase barrier the orchestrator uses before touching the
//! results.

pub mod slots;

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

pub use slots::CommandSlotPool;

/// Default worker count when the host's parallelism is unknown.
pub const DEFAULT_WORKERS: usize = 4;

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Shutdown,
}

#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    all_done: Condvar,
}

/// Fixed-size pool of persistent worker threads.
pub struct WorkerScheduler {
    senders: Vec<flume::Sender<Message>>,
    pending: Arc<Pending>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerScheduler {
    /// Spawn `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let pending = Arc::new(Pending::default());
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let (sender, receiver) = flume::unbounded::<Message>();
            let pending = Arc::clone(&pending);
            let handle = std::thread::Builder::new()
                .name(format!("render-worker-{worker}"))
                .spawn(move || worker_loop(receiver, pending))
                .unwrap_or_else(|e| panic!("failed to spawn render worker {worker}: {e}"));
            senders.push(sender);
            handles.push(handle);
        }
        log::debug!("worker scheduler started with {} workers", workers);
        Self {
            senders,
            pending,
            handles,
        }
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.senders.len()
    }

    /// Enqueue a task on the worker `worker_hint % workers`.
    pub fn enqueue(&self, task: impl FnOnce() + Send + 'static, worker_hint: usize) {
        let worker = worker_hint % self.senders.len();
        *self.pending.count.lock() += 1;
        // Receivers outlive all sends; workers only exit in Drop.
        let _ = self.senders[worker].send(Message::Run(Box::new(task)));
    }

    /// Block until every enqueued task has completed.
    pub fn wait(&self) {
        let mut count = self.pending.count.lock();
        while *count > 0 {
            self.pending.all_done.wait(&mut count);
        }
    }
}

impl Drop for WorkerScheduler {
    fn drop(&mut self) {
        self.wait();
        for sender in &self.senders {
            let _ = sender.send(Message::Shutdown);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(receiver: flume::Receiver<Message>, pending: Arc<Pending>) {
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(task) => {
                // A panicking task must not take the barrier count
                // with it, or every later wait() deadlocks.
                if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                    log::error!(
                        "task panicked on {}",
                        std::thread::current().name().unwrap_or("render-worker")
                    );
                }
                let mut count = pending.count.lock();
                *count -= 1;
                if *count == 0 {
                    pending.all_done.notify_all();
                }
            }
            Message::Shutdown => break,
        }
    }
}

/// Split `n_work` items into one contiguous range per worker.
///
/// Every range has `ceil(n_work / n_workers)` items except possibly
/// the last, and concatenating the ranges yields `0..n_work` exactly.
/// Workers with no items get no range.
pub fn chunk_ranges(n_work: usize, n_workers: usize) -> Vec<Range<usize>> {
    if n_work == 0 || n_workers == 0 {
        return Vec::new();
    }
    let chunk = n_work.div_ceil(n_workers);
    (0..n_work)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(n_work))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use rstest::rstest;

    #[test]
    fn runs_all_tasks_before_wait_returns() {
        let scheduler = WorkerScheduler::new(3);
        let counter = Arc::new(AtomicUsize::new(0));
        for i in 0..64 {
            let counter = Arc::clone(&counter);
            scheduler.enqueue(
                move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                },
                i,
            );
        }
        scheduler.wait();
        assert_eq!(counter.load(Ordering::Relaxed), 64);
    }

    #[test]
    fn wait_survives_a_panicking_task() {
        let scheduler = WorkerScheduler::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.enqueue(|| panic!("worker task failure"), 0);
        for i in 0..8 {
            let counter = Arc::clone(&counter);
            scheduler.enqueue(
                move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                },
                i,
            );
        }
        scheduler.wait();
        assert_eq!(counter.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn wait_with_nothing_enqueued_returns() {
        let scheduler = WorkerScheduler::new(2);
        scheduler.wait();
    }

    #[test]
    fn worker_hint_pins_tasks() {
        let scheduler = WorkerScheduler::new(2);
        // Tasks with the same hint run on one thread, so they are
        // sequentially ordered.
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..16 {
            let order = Arc::clone(&order);
            scheduler.enqueue(
                move || {
                    order.lock().push(i);
                },
                0,
            );
        }
        scheduler.wait();
        assert_eq!(*order.lock(), (0..16).collect::<Vec<_>>());
    }

    #[rstest]
    #[case(10, 4, vec![0..3, 3..6, 6..9, 9..10])]
    #[case(8, 4, vec![0..2, 2..4, 4..6, 6..8])]
    #[case(3, 4, vec![0..1, 1..2, 2..3])]
    #[case(1, 4, vec![0..1])]
    #[case(0, 4, vec![])]
    fn chunking(
        #[case] n_work: usize,
        #[case] n_workers: usize,
        #[case] expected: Vec<Range<usize>>,
    ) {
        assert_eq!(chunk_ranges(n_work, n_workers), expected);
    }

    #[test]
    fn chunks_cover_without_gaps() {
        for n_work in 0..40 {
            for n_workers in 1..8 {
                let ranges = chunk_ranges(n_work, n_workers);
                let flat: Vec<usize> = ranges.iter().cloned().flatten().collect();
                assert_eq!(flat, (0..n_work).collect::<Vec<_>>());
                if let Some(first) = ranges.first() {
                    let chunk = n_work.div_ceil(n_workers);
                    assert_eq!(first.len(), chunk.min(n_work));
                    for range in &ranges[..ranges.len() - 1] {
                        assert_eq!(range.len(), chunk);
                    }
                }
            }
        }
    }
}
