//! Bounded queue drained by a background task.
//!
//! # Architecture
//!
//! ```text
//! logging task            Channel               worker task
//! ────────────            ───────               ───────────
//!
//! dispatch() ─────────▶ [M0][M1][M2] ────────▶ handler(&msg)
//! never waits             bounded              blocking ok
//! drops when full         wake semaphore
//! ```
//!
//! The worker is created through the registered [`OsBackend`], so the same
//! code runs on FreeRTOS and on a hosted OS. Without a backend the sink
//! delivers inline on the caller's task.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::message::LogMessage;
use crate::os::{self, OsBackend, SemaphoreHandle, TaskConfig, TaskHandle};

use super::Sink;

/// Record handler run by the worker.
pub type Handler = dyn Fn(&LogMessage) + Send + Sync;

/// Configuration for [`AsyncSink`].
#[derive(Clone, Debug)]
pub struct AsyncSinkConfig {
    /// Maximum queued records; further records are dropped.
    pub capacity: usize,
    /// Worker task parameters.
    pub task: TaskConfig,
    /// Worker wake-up period when idle (also bounds dropped-count reporting).
    pub poll_ms: u32,
    /// How long shutdown waits for the worker to drain and exit.
    pub shutdown_timeout_ms: u32,
}

impl Default for AsyncSinkConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            task: TaskConfig::default(),
            poll_ms: 100,
            shutdown_timeout_ms: 1000,
        }
    }
}

/// Shared between dispatchers and the worker. The wake semaphore is released
/// when the last reference drops, so a worker that outlives shutdown stays
/// valid.
struct Channel {
    backend: &'static dyn OsBackend,
    queue: Mutex<VecDeque<LogMessage>>,
    capacity: usize,
    /// Total drops for this channel; `reported` is the part already logged.
    dropped: AtomicU32,
    reported: AtomicU32,
    stop: AtomicBool,
    wake: SemaphoreHandle,
}

impl Channel {
    /// Push without waiting. Returns `false` if dropped (queue full).
    fn push(&self, message: LogMessage) -> bool {
        {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            if queue.len() >= self.capacity {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            queue.push_back(message);
        }
        self.backend.semaphore_give(&self.wake);
        true
    }

    fn pop(&self) -> Option<LogMessage> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        let wake = core::mem::replace(&mut self.wake, SemaphoreHandle::null());
        self.backend.semaphore_destroy(wake);
    }
}

/// Running worker as seen by its owner.
struct Worker {
    channel: Arc<Channel>,
    /// Given by the worker once it has let go of everything it captured.
    /// Owned here, not by the channel.
    done: SemaphoreHandle,
    task: TaskHandle,
}

enum Mode {
    /// Not initialized, or shut down.
    Idle,
    /// `init` is creating the worker outside the lock; records go inline.
    Starting,
    /// No backend available: handler runs on the dispatching task.
    Inline,
    Worker(Worker),
}

/// [`Sink`] that hands records to a worker task.
pub struct AsyncSink {
    config: AsyncSinkConfig,
    handler: Arc<Handler>,
    mode: Mutex<Mode>,
    /// Drops counted while no worker was attached plus those of past workers.
    dropped: AtomicU32,
}

impl AsyncSink {
    pub fn new<F>(config: AsyncSinkConfig, handler: F) -> Self
    where
        F: Fn(&LogMessage) + Send + Sync + 'static,
    {
        Self {
            config,
            handler: Arc::new(handler),
            mode: Mutex::new(Mode::Idle),
            dropped: AtomicU32::new(0),
        }
    }

    /// True while a worker task is attached.
    pub fn is_running(&self) -> bool {
        matches!(*self.lock_mode(), Mode::Worker(_))
    }

    /// True when records are delivered on the dispatching task.
    pub fn is_inline(&self) -> bool {
        matches!(*self.lock_mode(), Mode::Inline)
    }

    /// Records currently queued.
    pub fn pending(&self) -> usize {
        match &*self.lock_mode() {
            Mode::Worker(worker) => worker.channel.pending(),
            _ => 0,
        }
    }

    /// Records dropped since creation.
    pub fn dropped(&self) -> u32 {
        let live = match &*self.lock_mode() {
            Mode::Worker(worker) => worker.channel.dropped.load(Ordering::Relaxed),
            _ => 0,
        };
        self.dropped.load(Ordering::Relaxed).saturating_add(live)
    }

    // Never log while holding this: the record may come straight back
    // through dispatch on the same task.
    fn lock_mode(&self) -> std::sync::MutexGuard<'_, Mode> {
        self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_worker(&self, backend: &'static dyn OsBackend) -> Result<Worker, &'static str> {
        let channel = Arc::new(Channel {
            backend,
            queue: Mutex::new(VecDeque::with_capacity(self.config.capacity)),
            capacity: self.config.capacity,
            dropped: AtomicU32::new(0),
            reported: AtomicU32::new(0),
            stop: AtomicBool::new(false),
            wake: backend.semaphore_create_binary(),
        });
        let done = backend.semaphore_create_binary();
        if channel.wake.is_null() || done.is_null() {
            backend.semaphore_destroy(done);
            return Err("semaphore creation failed");
        }

        let worker_channel = Arc::clone(&channel);
        let handler = Arc::clone(&self.handler);
        let poll_ms = self.config.poll_ms;
        // SAFETY: the owner destroys `done` only after taking it, i.e. after
        // the worker's last use of this alias.
        let signal = unsafe { SemaphoreHandle::from_raw(done.as_raw()) };
        let task = backend.task_create(
            &self.config.task,
            Box::new(move || {
                worker_loop(worker_channel, handler, poll_ms);
                backend.semaphore_give(&signal);
            }),
        );
        if task.is_null() {
            backend.semaphore_destroy(done);
            return Err("task creation failed");
        }

        Ok(Worker {
            channel,
            done,
            task,
        })
    }

    /// Stop a detached worker, wait for it to drain and release its task.
    fn stop_worker(&self, worker: Worker) {
        let Worker {
            channel,
            done,
            task,
        } = worker;
        let backend = channel.backend;

        channel.stop.store(true, Ordering::Release);
        backend.semaphore_give(&channel.wake);

        if backend.semaphore_take(&done, self.config.shutdown_timeout_ms) {
            backend.task_delete(task);
            backend.semaphore_destroy(done);
        } else {
            // Still running: it will give `done` later, so the semaphore and
            // the task are left to it.
            log::warn!(
                "worker '{}' did not stop within {} ms",
                self.config.task.name,
                self.config.shutdown_timeout_ms
            );
        }

        self.dropped
            .fetch_add(channel.dropped.load(Ordering::Relaxed), Ordering::Relaxed);
    }
}

/// Worker body: drain, report drops, exit once stopped and empty.
///
/// Takes its shared state by value so everything is released on return.
fn worker_loop(channel: Arc<Channel>, handler: Arc<Handler>, poll_ms: u32) {
    loop {
        channel.backend.semaphore_take(&channel.wake, poll_ms);

        while let Some(message) = channel.pop() {
            handler(&message);
        }

        let total = channel.dropped.load(Ordering::Relaxed);
        let dropped = total.wrapping_sub(channel.reported.swap(total, Ordering::Relaxed));
        if dropped > 0 {
            log::warn!("log queue full, dropped {} record(s)", dropped);
        }

        if channel.stop.load(Ordering::Acquire) && channel.pending() == 0 {
            break;
        }
    }
}

impl Sink for AsyncSink {
    fn init(&self) {
        {
            let mut mode = self.lock_mode();
            if !matches!(*mode, Mode::Idle) {
                return;
            }
            *mode = Mode::Starting;
        }

        let (next, warning) = match os::backend() {
            Some(backend) => match self.start_worker(backend) {
                Ok(worker) => (Mode::Worker(worker), None),
                Err(reason) => (Mode::Inline, Some(reason)),
            },
            None => (Mode::Inline, Some("no OS backend registered")),
        };

        let superseded = {
            let mut mode = self.lock_mode();
            if matches!(*mode, Mode::Starting) {
                *mode = next;
                None
            } else {
                // shutdown ran meanwhile
                Some(next)
            }
        };
        if let Some(Mode::Worker(worker)) = superseded {
            self.stop_worker(worker);
        }

        if let Some(reason) = warning {
            log::warn!("{}, delivering inline", reason);
        }
    }

    fn shutdown(&self) {
        // Detach first: a handler that logs must not find the lock held while
        // we wait for the worker.
        let previous = core::mem::replace(&mut *self.lock_mode(), Mode::Idle);
        if let Mode::Worker(worker) = previous {
            self.stop_worker(worker);
        }
    }

    fn dispatch(&self, message: LogMessage) {
        // Resolve the route under the lock, deliver outside it.
        let channel = match &*self.lock_mode() {
            Mode::Worker(worker) => Some(Arc::clone(&worker.channel)),
            Mode::Inline | Mode::Starting => None,
            Mode::Idle => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        match channel {
            Some(channel) => {
                channel.push(message);
            }
            None => (self.handler)(&message),
        }
    }
}

impl Drop for AsyncSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}
