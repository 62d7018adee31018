//! Key-affinity executor: a fixed pool of single-threaded workers where every key is
//! owned by exactly one worker.

use parking_lot::Mutex;
use std::any::Any;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};
use xxhash_rust::xxh3::Xxh3;

use crate::db::error::CacheError;

use super::pending::Pending;
use super::worker::{Task, Worker, WorkerState};

/// Hasher adapter feeding a key's `Hash` stream into xxh3, which, unlike std's
/// `RandomState`, gives the same owner for a key on every run.
struct KeyHasher(Xxh3);

impl Hasher for KeyHasher {
    fn finish(&self) -> u64 {
        self.0.digest()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
}

/// Returns the owning worker index of `key` among `workers` workers.
pub fn owner_index<K: Hash + ?Sized>(key: &K, workers: usize) -> usize {
    let mut hasher = KeyHasher(Xxh3::new());
    key.hash(&mut hasher);
    (hasher.finish() % workers as u64) as usize
}

pub struct KeyAffinityExecutor {
    name: String,
    workers: Vec<Arc<Worker>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl KeyAffinityExecutor {
    /// Starts `worker_count` worker threads named `{name}-{index}`.
    pub fn new(name: &str, worker_count: usize) -> Result<Self, CacheError> {
        if worker_count == 0 {
            return Err(CacheError::InvalidConfig(
                "worker count must be greater than zero".to_string(),
            ));
        }

        let workers: Vec<Arc<Worker>> = (0..worker_count)
            .map(|id| Arc::new(Worker::new(id)))
            .collect();
        let mut handles = Vec::with_capacity(worker_count);

        for worker in &workers {
            let thread_worker = worker.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", name, handles.len()))
                .spawn(move || thread_worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    error!(
                        component = "executor",
                        event = "spawn_failed",
                        name = %name,
                        error = %err,
                        "failed to spawn worker thread"
                    );
                    for started in &workers[..handles.len()] {
                        started.stop();
                    }
                    for handle in handles {
                        if handle.join().is_err() {
                            warn!(
                                component = "executor",
                                event = "worker_panicked",
                                name = %name,
                                "worker thread panicked while aborting startup"
                            );
                        }
                    }
                    return Err(CacheError::Spawn(err));
                }
            }
        }

        info!(
            component = "executor",
            event = "started",
            name = %name,
            workers = worker_count,
            "key-affinity executor started"
        );

        Ok(Self {
            name: name.to_string(),
            workers,
            handles: Mutex::new(handles),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Index of the worker owning `key`. Constant for the lifetime of the executor.
    pub fn owner_index_of<K: Hash + ?Sized>(&self, key: &K) -> usize {
        owner_index(key, self.workers.len())
    }

    pub fn worker_state(&self, index: usize) -> Option<WorkerState> {
        self.workers.get(index).map(|w| w.state())
    }

    /// Number of tasks worker `index` has executed.
    pub fn processed(&self, index: usize) -> Option<u64> {
        self.workers.get(index).map(|w| w.processed())
    }

    /// Queues `f` on the worker owning `key` and returns a handle to its result.
    /// Never blocks. After shutdown the handle resolves with `ExecutorStopped`.
    pub fn submit<K, R, F>(&self, key: &K, f: F) -> Pending<R>
    where
        K: Hash + ?Sized,
        R: Send + 'static,
        F: FnOnce() -> Result<R, CacheError> + Send + 'static,
    {
        self.submit_to(self.owner_index_of(key), f)
    }

    /// Queues `f` on worker `index`.
    pub(crate) fn submit_to<R, F>(&self, index: usize, f: F) -> Pending<R>
    where
        R: Send + 'static,
        F: FnOnce() -> Result<R, CacheError> + Send + 'static,
    {
        let (tx, pending) = Pending::channel();
        let task: Task = Box::new(move || {
            let _ = tx.send(guarded(f));
        });

        match self.workers[index].push(task) {
            Ok(()) => pending,
            Err(_rejected) => Pending::ready(Err(CacheError::ExecutorStopped)),
        }
    }

    /// Runs `f` on the worker owning `key` on behalf of a task currently executing on
    /// worker `from`, and blocks that task until `f` completes.
    ///
    /// `f` goes to the urgent lane of the owner and `from` keeps serving its own urgent
    /// lane while it waits. `f` must not itself call back into another worker.
    pub(crate) fn call_on_owner<K, R, F>(
        &self,
        from: usize,
        key: &K,
        f: F,
    ) -> Result<R, CacheError>
    where
        K: Hash + ?Sized,
        R: Send + 'static,
        F: FnOnce() -> Result<R, CacheError> + Send + 'static,
    {
        let owner = self.owner_index_of(key);
        if owner == from {
            return guarded(f);
        }

        let (tx, mut pending) = Pending::channel();
        let waiter = self.workers[from].clone();
        let task: Task = Box::new(move || {
            let _ = tx.send(guarded(f));
            waiter.wake();
        });

        if let Err(task) = self.workers[owner].push_urgent(task) {
            // Owner already exited, nothing else can touch its keys anymore.
            task();
        }

        self.workers[from].serve_urgent_until(|| pending.try_take())
    }

    /// Parks the task running on worker `from` until `poll` yields, serving that worker's
    /// urgent lane meanwhile. `poll` is re-checked on every `wake_all`.
    pub(crate) fn serve_urgent_until<T>(&self, from: usize, poll: impl FnMut() -> Option<T>) -> T {
        self.workers[from].serve_urgent_until(poll)
    }

    /// Wakes every worker parked in `serve_urgent_until`.
    pub(crate) fn wake_all(&self) {
        for worker in &self.workers {
            worker.wake();
        }
    }

    /// Stops accepting tasks, lets every worker drain its queue and joins all threads.
    /// Idempotent. When called from a worker thread that thread is not joined.
    pub fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        if handles.is_empty() {
            return;
        }

        for worker in &self.workers {
            worker.stop();
        }

        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                warn!(
                    component = "executor",
                    event = "self_join_skipped",
                    name = %self.name,
                    "shutdown called from a worker thread, not joining it"
                );
                continue;
            }
            if handle.join().is_err() {
                error!(
                    component = "executor",
                    event = "worker_panicked",
                    name = %self.name,
                    "worker thread panicked"
                );
            }
        }

        info!(
            component = "executor",
            event = "stopped",
            name = %self.name,
            "key-affinity executor stopped"
        );
    }

    /// True once `shutdown` has been called.
    pub fn is_stopped(&self) -> bool {
        self.handles.lock().is_empty()
    }
}

impl Drop for KeyAffinityExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs a task, converting a panic into `CacheError::TaskPanicked` so the worker survives.
fn guarded<R, F>(f: F) -> Result<R, CacheError>
where
    F: FnOnce() -> Result<R, CacheError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!(
                component = "executor",
                event = "task_panicked",
                panic = %msg,
                "task panicked"
            );
            Err(CacheError::TaskPanicked(msg))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
