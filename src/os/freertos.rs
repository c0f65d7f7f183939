//! FreeRTOS backend (ESP-IDF).
//!
//! Binary semaphores go through the queue API because the `xSemaphore*`
//! helpers are C macros. Tasks run a boxed Rust closure through a C
//! trampoline; when the closure returns the task suspends itself until its
//! owner calls [`OsBackend::task_delete`].

use core::ffi::c_void;
use core::ptr;
use std::ffi::CString;

use esp_idf_svc::sys;

use super::{OsBackend, SemaphoreHandle, TaskConfig, TaskEntry, TaskHandle, WAIT_FOREVER};

/// Registered instance.
pub static FREERTOS_BACKEND: FreeRtosBackend = FreeRtosBackend;

const PD_PASS: sys::BaseType_t = 1;
const PD_TRUE: sys::BaseType_t = 1;
const PORT_MAX_DELAY: sys::TickType_t = sys::TickType_t::MAX;
const NO_AFFINITY: sys::BaseType_t = 0x7FFF_FFFF;
/// Ticks `task_delete` waits for a task whose entry is returning to park.
const PARK_WAIT_TICKS: u32 = 10;

/// [`OsBackend`] for ESP-IDF FreeRTOS.
#[derive(Debug, Default, Clone, Copy)]
pub struct FreeRtosBackend;

/// Milliseconds to ticks, rounding up so short waits are not turned into polls.
fn ms_to_ticks(ms: u32) -> sys::TickType_t {
    if ms == WAIT_FOREVER {
        return PORT_MAX_DELAY;
    }
    let hz = u64::from(sys::configTICK_RATE_HZ);
    let ticks = (u64::from(ms) * hz).div_ceil(1000);
    sys::TickType_t::try_from(ticks).unwrap_or(PORT_MAX_DELAY - 1)
}

unsafe extern "C" fn task_trampoline(arg: *mut c_void) {
    // SAFETY: arg is the Box<TaskEntry> leaked by task_create, handed over
    // exactly once.
    let entry: TaskEntry = *unsafe { Box::from_raw(arg.cast::<TaskEntry>()) };
    // Both allocations and the closure's captures are freed by this call.
    entry();

    // A FreeRTOS task must never return; wait here for task_delete.
    loop {
        unsafe { sys::vTaskSuspend(ptr::null_mut()) };
    }
}

impl OsBackend for FreeRtosBackend {
    fn semaphore_create_binary(&self) -> SemaphoreHandle {
        let raw = unsafe {
            sys::xQueueGenericCreate(1, 0, sys::queueQUEUE_TYPE_BINARY_SEMAPHORE as u8)
        };
        // SAFETY: null or a queue owned by this backend.
        unsafe { SemaphoreHandle::from_raw(raw.cast()) }
    }

    fn semaphore_destroy(&self, sem: SemaphoreHandle) {
        if !sem.is_null() {
            unsafe { sys::vQueueDelete(sem.into_raw().cast()) };
        }
    }

    fn semaphore_give(&self, sem: &SemaphoreHandle) {
        if !sem.is_null() {
            unsafe {
                sys::xQueueGenericSend(
                    sem.as_raw().cast(),
                    ptr::null(),
                    0,
                    sys::queueSEND_TO_BACK as sys::BaseType_t,
                );
            }
        }
    }

    fn semaphore_take(&self, sem: &SemaphoreHandle, timeout_ms: u32) -> bool {
        if sem.is_null() {
            return false;
        }
        unsafe { sys::xQueueSemaphoreTake(sem.as_raw().cast(), ms_to_ticks(timeout_ms)) == PD_TRUE }
    }

    fn task_create(&self, config: &TaskConfig, entry: TaskEntry) -> TaskHandle {
        let name = CString::new(config.name.as_str())
            .unwrap_or_else(|_| CString::from(c"loghook"));
        let Ok(stack_size) = u32::try_from(config.stack_size) else {
            log::warn!("task '{}': stack size {} too large", config.name, config.stack_size);
            return TaskHandle::null();
        };
        let core = config
            .core
            .and_then(|core| sys::BaseType_t::try_from(core).ok())
            .unwrap_or(NO_AFFINITY);

        let arg = Box::into_raw(Box::new(entry));
        let mut handle: sys::TaskHandle_t = ptr::null_mut();

        let result = unsafe {
            sys::xTaskCreatePinnedToCore(
                Some(task_trampoline),
                name.as_ptr(),
                stack_size,
                arg.cast(),
                config.priority as sys::UBaseType_t,
                &mut handle,
                core,
            )
        };

        if result != PD_PASS {
            // The trampoline never ran; take the entry back.
            drop(unsafe { Box::from_raw(arg) });
            log::warn!("xTaskCreatePinnedToCore failed for '{}'", config.name);
            return TaskHandle::null();
        }

        // SAFETY: task created above, owned by the caller from here on.
        unsafe { TaskHandle::from_raw(handle.cast()) }
    }

    fn task_delete(&self, task: TaskHandle) {
        if task.is_null() {
            return;
        }
        let raw: sys::TaskHandle_t = task.into_raw().cast();

        // Deleting before the trampoline parks would leak the entry's box.
        for _ in 0..PARK_WAIT_TICKS {
            if unsafe { sys::eTaskGetState(raw) } == sys::eTaskState_eSuspended {
                break;
            }
            unsafe { sys::vTaskDelay(1) };
        }
        unsafe { sys::vTaskDelete(raw) };
    }

    fn delay_ms(&self, ms: u32) {
        unsafe { sys::vTaskDelay(ms_to_ticks(ms)) };
    }
}
