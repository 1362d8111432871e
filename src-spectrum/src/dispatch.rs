// ============================================================================
// Idle Dispatch - deferred work posted from the audio thread
// ============================================================================
//
// The realtime thread must not allocate, block or emit notifications. It
// posts typed tasks into a bounded queue instead; a non-realtime consumer
// (the UI loop calling `dispatch_pending`, or an `IdleWorker` thread) runs
// them later.
//
// Posting never blocks: when the queue is full the task is handed back to
// the caller, who decides what to do with it.

use crate::error::DispatchError;
use crate::plugins::{LevelsJob, SpectrumJob};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// How often an idle worker checks for shutdown while the queue is empty
const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Work item executed off the realtime thread
pub enum IdleTask {
    /// Transform a windowed snapshot and emit the power spectrum
    Spectrum(SpectrumJob),
    /// Emit input/output peak levels
    Levels(LevelsJob),
}

impl IdleTask {
    pub fn run(self) {
        match self {
            IdleTask::Spectrum(job) => job.run(),
            IdleTask::Levels(job) => job.run(),
        }
    }
}

/// Producer handle for an `IdleQueue`
#[derive(Clone)]
pub struct IdlePoster {
    tx: Sender<IdleTask>,
}

impl IdlePoster {
    /// Queue `task` without blocking
    ///
    /// Returns the task back if the queue is full or has no consumer left.
    pub fn try_post(&self, task: IdleTask) -> Result<(), IdleTask> {
        self.tx.try_send(task).map_err(|e| match e {
            TrySendError::Full(task) | TrySendError::Disconnected(task) => task,
        })
    }
}

/// Bounded single-consumer queue of idle tasks
pub struct IdleQueue {
    tx: Sender<IdleTask>,
    rx: Receiver<IdleTask>,
}

impl IdleQueue {
    /// Create a queue holding at most `capacity` pending tasks
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = channel::bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Producer handle to give to pipeline stages
    pub fn poster(&self) -> IdlePoster {
        IdlePoster {
            tx: self.tx.clone(),
        }
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run every task queued so far on the calling thread
    ///
    /// Returns the number of tasks executed.
    pub fn dispatch_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.rx.try_recv() {
            task.run();
            count += 1;
        }
        count
    }

    /// Run queued tasks on a dedicated thread until the worker is shut down
    pub fn spawn_worker(&self, name: &str) -> Result<IdleWorker, DispatchError> {
        let rx = self.rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = Arc::clone(&shutdown);

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_idle_worker(rx, shutdown_thread))?;

        log::debug!("idle worker '{}' started", name);

        Ok(IdleWorker {
            shutdown,
            thread_handle: Some(thread_handle),
        })
    }
}

fn run_idle_worker(rx: Receiver<IdleTask>, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::Acquire) {
        match rx.recv_timeout(WORKER_POLL_INTERVAL) {
            Ok(task) => task.run(),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Handle to a thread draining an `IdleQueue`
pub struct IdleWorker {
    shutdown: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl IdleWorker {
    /// Stop the worker and wait for the task in progress to finish
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.thread_handle.take()
            && handle.join().is_err()
        {
            log::warn!("idle worker panicked");
        }
    }
}

impl Drop for IdleWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
