//! Install/uninstall state machine for the platform print hook.
//!
//! ```text
//!  Uninstalled ──install()──▶ Installed ──uninstall()──▶ Uninstalled
//!       ▲  │ install() no-op      │ install() no-op           │
//!       └──┘                      └───────────────────────────┘
//! ```
//!
//! Transitions are serialised by one mutex. The logging hot path only reads
//! atomics, so emitting a line never waits on install/uninstall.

use core::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use core::time::Duration;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

use crate::parser::Parser;
use crate::pipeline::Pipeline;
use crate::sink::Sink;

/// Platform side of the hook: the global print-callback slot.
///
/// `replace` installs the pipeline's entry point and returns whatever was
/// there before; `restore` puts a previously returned handler back.
pub trait Platform: Send + Sync {
    type Handler: Copy + Send;

    fn replace(&self) -> Self::Handler;

    fn restore(&self, original: Self::Handler);

    /// Time since boot, used to turn `(<TIME>)` into wall-clock time.
    fn uptime(&self) -> Duration;
}

/// Hook installation options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HookConfig {
    /// Keep calling the original print callback (output still reaches UART).
    pub passthrough: bool,
    /// Call the sink's `init`/`shutdown` on install/uninstall.
    pub manage_sink: bool,
    /// Force-flush unterminated lines at this many bytes.
    pub max_line_len: Option<usize>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            passthrough: true,
            manage_sink: true,
            max_line_len: None,
        }
    }
}

/// Saved state; only touched under the lock.
struct Saved<H> {
    original: Option<H>,
    manage_sink: bool,
}

/// Hook lifecycle controller.
pub struct LogHook<'s, P: Platform> {
    platform: P,
    sink: &'s dyn Sink,
    saved: Mutex<Saved<P::Handler>>,
    installed: AtomicBool,
    passthrough: AtomicBool,
    /// 0 = unbounded.
    max_line_len: AtomicUsize,
    boot_epoch_ms: AtomicI64,
}

impl<'s, P: Platform> LogHook<'s, P> {
    pub const fn new(platform: P, sink: &'s dyn Sink) -> Self {
        Self {
            platform,
            sink,
            saved: Mutex::new(Saved {
                original: None,
                manage_sink: false,
            }),
            installed: AtomicBool::new(false),
            passthrough: AtomicBool::new(true),
            max_line_len: AtomicUsize::new(0),
            boot_epoch_ms: AtomicI64::new(0),
        }
    }

    /// Install with default options (pass-through on).
    pub fn install(&self) {
        self.install_with(HookConfig::default());
    }

    /// Install the hook. No-op if already installed.
    pub fn install_with(&self, config: HookConfig) {
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        if self.installed.load(Ordering::Acquire) {
            return;
        }

        let uptime = TimeDelta::from_std(self.platform.uptime()).unwrap_or(TimeDelta::zero());
        let boot_epoch = Utc::now()
            .checked_sub_signed(uptime)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        self.boot_epoch_ms
            .store(boot_epoch.timestamp_millis(), Ordering::Relaxed);
        self.passthrough.store(config.passthrough, Ordering::Relaxed);
        self.max_line_len
            .store(config.max_line_len.unwrap_or(0), Ordering::Relaxed);

        if config.manage_sink {
            self.sink.init();
        }
        saved.manage_sink = config.manage_sink;
        saved.original = Some(self.platform.replace());
        self.installed.store(true, Ordering::Release);

        log::info!(
            "log hook installed (passthrough={}, boot epoch {})",
            config.passthrough,
            boot_epoch
        );
    }

    /// Restore the original callback. No-op if not installed.
    pub fn uninstall(&self) {
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.installed.load(Ordering::Acquire) {
            return;
        }

        if let Some(original) = saved.original.take() {
            self.platform.restore(original);
        }
        self.installed.store(false, Ordering::Release);

        if saved.manage_sink {
            self.sink.shutdown();
        }
        log::info!("log hook uninstalled");
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Whether the original callback should still see the output.
    pub fn passthrough(&self) -> bool {
        self.passthrough.load(Ordering::Relaxed)
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Parser anchored at the boot epoch recorded on install.
    pub fn parser(&self) -> Parser {
        let ms = self.boot_epoch_ms.load(Ordering::Relaxed);
        Parser::new(DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
    }

    /// Hot-path view of the current settings.
    pub fn pipeline(&self) -> Pipeline<'_> {
        let limit = match self.max_line_len.load(Ordering::Relaxed) {
            0 => None,
            n => Some(n),
        };
        Pipeline::new(self.sink, self.parser()).with_line_limit(limit)
    }
}
