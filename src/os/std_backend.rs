//! Hosted backend on `std::thread` and `Condvar`.
//!
//! Priority and core affinity have no portable meaning here and are ignored.

use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{OsBackend, SemaphoreHandle, TaskConfig, TaskEntry, TaskHandle, WAIT_FOREVER};

/// Registered instance.
pub static STD_BACKEND: StdBackend = StdBackend;

/// [`OsBackend`] for hosted targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdBackend;

#[derive(Default)]
struct BinarySemaphore {
    signalled: Mutex<bool>,
    cond: Condvar,
}

impl BinarySemaphore {
    fn give(&self) {
        let mut signalled = self.signalled.lock().unwrap_or_else(PoisonError::into_inner);
        *signalled = true;
        self.cond.notify_one();
    }

    fn take(&self, timeout_ms: u32) -> bool {
        let guard = self.signalled.lock().unwrap_or_else(PoisonError::into_inner);

        let mut signalled = if timeout_ms == WAIT_FOREVER {
            self.cond
                .wait_while(guard, |signalled| !*signalled)
                .unwrap_or_else(PoisonError::into_inner)
        } else {
            let timeout = Duration::from_millis(u64::from(timeout_ms));
            self.cond
                .wait_timeout_while(guard, timeout, |signalled| !*signalled)
                .unwrap_or_else(PoisonError::into_inner)
                .0
        };

        core::mem::replace(&mut *signalled, false)
    }
}

impl StdBackend {
    /// Borrow the semaphore behind a handle this backend created.
    fn semaphore<'a>(&self, sem: &'a SemaphoreHandle) -> Option<&'a BinarySemaphore> {
        // SAFETY: non-null handles given to this backend come from
        // semaphore_create_binary and stay valid until semaphore_destroy,
        // which consumes the handle.
        unsafe { sem.as_raw().cast::<BinarySemaphore>().as_ref() }
    }
}

impl OsBackend for StdBackend {
    fn semaphore_create_binary(&self) -> SemaphoreHandle {
        let raw = Box::into_raw(Box::<BinarySemaphore>::default());
        // SAFETY: freshly allocated semaphore owned by this backend.
        unsafe { SemaphoreHandle::from_raw(raw.cast()) }
    }

    fn semaphore_destroy(&self, sem: SemaphoreHandle) {
        if sem.is_null() {
            return;
        }
        // SAFETY: created by Box::into_raw in semaphore_create_binary; the
        // handle is consumed so this runs once.
        drop(unsafe { Box::from_raw(sem.into_raw().cast::<BinarySemaphore>()) });
    }

    fn semaphore_give(&self, sem: &SemaphoreHandle) {
        if let Some(sem) = self.semaphore(sem) {
            sem.give();
        }
    }

    fn semaphore_take(&self, sem: &SemaphoreHandle, timeout_ms: u32) -> bool {
        match self.semaphore(sem) {
            Some(sem) => sem.take(timeout_ms),
            None => false,
        }
    }

    fn task_create(&self, config: &TaskConfig, entry: TaskEntry) -> TaskHandle {
        log::debug!(
            "spawning task '{}' (stack {}, priority {} ignored, core {:?} ignored)",
            config.name,
            config.stack_size,
            config.priority,
            config.core
        );

        let spawned = thread::Builder::new()
            .name(config.name.clone())
            .stack_size(config.stack_size)
            .spawn(entry);

        match spawned {
            Ok(join) => {
                let raw = Box::into_raw(Box::new(join));
                // SAFETY: freshly allocated join handle owned by this backend.
                unsafe { TaskHandle::from_raw(raw.cast()) }
            }
            Err(err) => {
                log::warn!("failed to spawn task '{}': {}", config.name, err);
                TaskHandle::null()
            }
        }
    }

    fn task_delete(&self, task: TaskHandle) {
        if task.is_null() {
            return;
        }
        // SAFETY: created by Box::into_raw in task_create; consumed here.
        let join = unsafe { Box::from_raw(task.into_raw().cast::<JoinHandle<()>>()) };
        // Threads cannot be killed; a running one is detached.
        if join.is_finished() {
            let _ = join.join();
        }
    }

    fn delay_ms(&self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
