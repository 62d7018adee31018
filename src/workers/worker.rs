//! Single-threaded worker with a private task queue.
//
// Two lanes share one lock: the urgent lane carries eviction removals sent by other
// workers and is always served first; the normal lane carries caller submissions in FIFO
// order. A worker blocked on another worker keeps serving its own urgent lane, so two
// workers evicting each other's keys cannot deadlock.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tracing::debug;

pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Queue empty, thread parked.
    Idle = 0,
    /// A dequeued task is executing.
    Running = 1,
    /// Shut down: queue drained, thread exited.
    Stopped = 2,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

struct Lanes {
    urgent: VecDeque<Task>,
    normal: VecDeque<Task>,
    draining: bool,
    exited: bool,
}

pub(crate) struct Worker {
    id: usize,
    lanes: Mutex<Lanes>,
    ready: Condvar,
    state: AtomicU8,
    processed: AtomicU64,
}

impl Worker {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            lanes: Mutex::new(Lanes {
                urgent: VecDeque::new(),
                normal: VecDeque::new(),
                draining: false,
                exited: false,
            }),
            ready: Condvar::new(),
            state: AtomicU8::new(WorkerState::Idle as u8),
            processed: AtomicU64::new(0),
        }
    }

    pub(crate) fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Tasks executed so far, urgent ones included.
    pub(crate) fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Enqueues a caller task. Rejected once shutdown has begun.
    pub(crate) fn push(&self, task: Task) -> Result<(), Task> {
        let mut lanes = self.lanes.lock();
        if lanes.draining {
            return Err(task);
        }
        lanes.normal.push_back(task);
        drop(lanes);
        self.ready.notify_one();
        Ok(())
    }

    /// Enqueues an eviction removal. Accepted while draining, rejected only once the
    /// thread has exited; the caller then runs the task itself.
    pub(crate) fn push_urgent(&self, task: Task) -> Result<(), Task> {
        let mut lanes = self.lanes.lock();
        if lanes.exited {
            return Err(task);
        }
        lanes.urgent.push_back(task);
        drop(lanes);
        self.ready.notify_one();
        Ok(())
    }

    /// Stops accepting caller tasks; the thread exits once both lanes are empty.
    pub(crate) fn stop(&self) {
        self.lanes.lock().draining = true;
        self.ready.notify_all();
    }

    /// Wakes the thread if it is parked in `serve_urgent_until`.
    pub(crate) fn wake(&self) {
        let _lanes = self.lanes.lock();
        self.ready.notify_all();
    }

    /// Thread body.
    pub(crate) fn run(&self) {
        debug!(component = "worker", event = "started", worker = self.id, "worker started");
        loop {
            let task = {
                let mut lanes = self.lanes.lock();
                loop {
                    let next = match lanes.urgent.pop_front() {
                        Some(task) => Some(task),
                        None => lanes.normal.pop_front(),
                    };
                    if let Some(task) = next {
                        break task;
                    }
                    if lanes.draining {
                        lanes.exited = true;
                        self.set_state(WorkerState::Stopped);
                        debug!(
                            component = "worker",
                            event = "stopped",
                            worker = self.id,
                            processed = self.processed(),
                            "worker stopped"
                        );
                        return;
                    }
                    self.set_state(WorkerState::Idle);
                    self.ready.wait(&mut lanes);
                }
            };

            self.set_state(WorkerState::Running);
            self.execute(task);
        }
    }

    /// Blocks the calling task until `poll` yields, executing urgent tasks meanwhile.
    /// `poll` runs under the queue lock, so a `wake` issued after the awaited state changes
    /// is never missed. Must only be called from this worker's own thread.
    pub(crate) fn serve_urgent_until<T>(&self, mut poll: impl FnMut() -> Option<T>) -> T {
        loop {
            let task = {
                let mut lanes = self.lanes.lock();
                loop {
                    if let Some(out) = poll() {
                        return out;
                    }
                    if let Some(task) = lanes.urgent.pop_front() {
                        break task;
                    }
                    self.ready.wait(&mut lanes);
                }
            };
            self.execute(task);
        }
    }

    fn execute(&self, task: Task) {
        task();
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
