//! ESP-IDF binding: `esp_log_set_vprintf` hook.
//!
//! # Data Path
//!
//! ```text
//! ESP_LOGx ──▶ esp_log_write ──▶ vprintf_hook ──┬─▶ original vprintf (UART)
//!                                              └─▶ Pipeline ──▶ Sink
//! ```
//!
//! The controller is process-wide. The sink passed to the first install is
//! kept for the lifetime of the program; later installs reuse it.

use core::ffi::{c_char, c_int};
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};
use core::time::Duration;
use std::sync::OnceLock;

use esp_idf_svc::sys;

use crate::hook::{HookConfig, LogHook, Platform};
use crate::os::{self, FREERTOS_BACKEND};
use crate::sink::Sink;

type Vprintf = unsafe extern "C" fn(*const c_char, sys::va_list) -> c_int;

/// Callback that was active before ours; null when none or not installed.
static ORIGINAL: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());

static HOOK: OnceLock<LogHook<'static, EspLog>> = OnceLock::new();

/// The ESP-IDF log output slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct EspLog;

impl Platform for EspLog {
    type Handler = sys::vprintf_like_t;

    fn replace(&self) -> sys::vprintf_like_t {
        let previous = unsafe { sys::esp_log_set_vprintf(Some(vprintf_hook)) };
        // A line logged between the swap and this store skips pass-through.
        ORIGINAL.store(
            previous.map_or(ptr::null_mut(), |f| f as *mut ()),
            Ordering::Release,
        );
        previous
    }

    fn restore(&self, original: sys::vprintf_like_t) {
        unsafe { sys::esp_log_set_vprintf(original) };
        ORIGINAL.store(ptr::null_mut(), Ordering::Release);
    }

    fn uptime(&self) -> Duration {
        let micros = unsafe { sys::esp_timer_get_time() };
        Duration::from_micros(u64::try_from(micros).unwrap_or(0))
    }
}

fn original() -> Option<Vprintf> {
    let raw = ORIGINAL.load(Ordering::Acquire);
    if raw.is_null() {
        None
    } else {
        // SAFETY: only ever stored from a non-null vprintf_like_t.
        Some(unsafe { core::mem::transmute::<*mut (), Vprintf>(raw) })
    }
}

unsafe extern "C" fn vprintf_hook(format: *const c_char, args: sys::va_list) -> c_int {
    let Some(hook) = HOOK.get() else {
        return 0;
    };

    // va_list is passed by value on Xtensa and RISC-V: every consumer below
    // gets its own copy of the cursor.
    if hook.passthrough() {
        if let Some(original) = original() {
            unsafe { original(format, args) };
        }
    }

    hook.pipeline().on_output(|buf: &mut [u8]| unsafe {
        sys::vsnprintf(buf.as_mut_ptr().cast(), buf.len() as _, format, args)
    })
}

/// Install with default options (pass-through on).
pub fn install(sink: &'static dyn Sink) {
    install_with(sink, HookConfig::default());
}

/// Register the FreeRTOS backend and install the hook.
pub fn install_with(sink: &'static dyn Sink, config: HookConfig) {
    os::set_backend(&FREERTOS_BACKEND);
    HOOK.get_or_init(|| LogHook::new(EspLog, sink))
        .install_with(config);
}

/// Restore the original vprintf handler.
pub fn uninstall() {
    if let Some(hook) = HOOK.get() {
        hook.uninstall();
    }
}

pub fn is_installed() -> bool {
    HOOK.get().is_some_and(LogHook::is_installed)
}
