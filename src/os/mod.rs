//! OS primitive abstraction.
//!
//! The async sink worker needs a binary semaphore, a task and a delay. Each
//! RTOS provides them differently; [`OsBackend`] is the common surface and one
//! implementation is registered at startup with [`set_backend`].
//!
//! Handles are owned: whoever creates one destroys it, by value.

pub mod std_backend;

#[cfg(target_os = "espidf")]
pub mod freertos;

use core::ffi::c_void;
use std::sync::{PoisonError, RwLock};

pub use std_backend::{StdBackend, STD_BACKEND};

#[cfg(target_os = "espidf")]
pub use freertos::{FreeRtosBackend, FREERTOS_BACKEND};

/// Timeout value meaning "wait indefinitely".
pub const WAIT_FOREVER: u32 = u32::MAX;

/// Entry point of a task created through [`OsBackend::task_create`].
pub type TaskEntry = Box<dyn FnOnce() + Send + 'static>;

/// Opaque binary semaphore handle. Null when creation failed.
#[derive(Debug)]
pub struct SemaphoreHandle(*mut c_void);

// SAFETY: The handle is an opaque token for a kernel object; the backends
// synchronise access to the object itself.
unsafe impl Send for SemaphoreHandle {}
unsafe impl Sync for SemaphoreHandle {}

impl SemaphoreHandle {
    pub const fn null() -> Self {
        Self(core::ptr::null_mut())
    }

    /// Wrap a native handle.
    ///
    /// # Safety
    ///
    /// `raw` must be null or a semaphore owned by the backend that will
    /// receive this handle.
    pub const unsafe fn from_raw(raw: *mut c_void) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.0
    }

    /// Give up ownership of the native handle.
    pub fn into_raw(self) -> *mut c_void {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// Opaque task handle. Null when creation failed.
#[derive(Debug)]
pub struct TaskHandle(*mut c_void);

// SAFETY: Same reasoning as SemaphoreHandle.
unsafe impl Send for TaskHandle {}
unsafe impl Sync for TaskHandle {}

impl TaskHandle {
    pub const fn null() -> Self {
        Self(core::ptr::null_mut())
    }

    /// Wrap a native handle.
    ///
    /// # Safety
    ///
    /// `raw` must be null or a task owned by the backend that will receive
    /// this handle.
    pub const unsafe fn from_raw(raw: *mut c_void) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.0
    }

    pub fn into_raw(self) -> *mut c_void {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// Task creation parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskConfig {
    pub name: String,
    /// Stack size in bytes.
    pub stack_size: usize,
    pub priority: u32,
    /// Core to pin to; `None` lets the scheduler choose.
    pub core: Option<u32>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            name: "loghook".to_string(),
            stack_size: 4096,
            priority: 5,
            core: None,
        }
    }
}

/// Primitives an RTOS must provide for background dispatch.
pub trait OsBackend: Send + Sync {
    /// Create a binary semaphore, initially empty.
    fn semaphore_create_binary(&self) -> SemaphoreHandle;

    fn semaphore_destroy(&self, sem: SemaphoreHandle);

    /// Signal. Giving an already-signalled semaphore is a no-op.
    fn semaphore_give(&self, sem: &SemaphoreHandle);

    /// Wait up to `timeout_ms` (or [`WAIT_FOREVER`]).
    ///
    /// Returns `true` if the semaphore was taken before the timeout.
    fn semaphore_take(&self, sem: &SemaphoreHandle, timeout_ms: u32) -> bool;

    /// Start `entry` on a new task. Returns a null handle on failure.
    ///
    /// `entry` and everything it captured are dropped when it returns, even
    /// though the task itself lives until [`OsBackend::task_delete`].
    fn task_create(&self, config: &TaskConfig, entry: TaskEntry) -> TaskHandle;

    fn task_delete(&self, task: TaskHandle);

    /// Block the calling task.
    fn delay_ms(&self, ms: u32);
}

static BACKEND: RwLock<Option<&'static dyn OsBackend>> = RwLock::new(None);

/// Register the backend used by async dispatch. Replaces any previous one.
pub fn set_backend(backend: &'static dyn OsBackend) {
    *BACKEND.write().unwrap_or_else(PoisonError::into_inner) = Some(backend);
}

/// Currently registered backend, if any.
pub fn backend() -> Option<&'static dyn OsBackend> {
    *BACKEND.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn clear_backend() {
    *BACKEND.write().unwrap_or_else(PoisonError::into_inner) = None;
}
