//! Per-execution-context line reassembly and reentrancy protection.
//!
//! Each task gets its own [`LineAssembler`] through a thread-local registry, so
//! fragments written by different tasks never interleave. The buffer and the
//! reentrancy flag are owned by their context; no locking is involved.

use core::cell::RefCell;
use core::marker::PhantomData;

/// Line terminator.
pub const TERMINATOR: u8 = b'\n';

/// Accumulates formatted fragments until a terminator arrives.
///
/// Works on bytes so a UTF-8 sequence split across two writes is rebuilt
/// before it is decoded.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
    limit: Option<usize>,
}

impl LineAssembler {
    /// Create empty, unbounded assembler.
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            limit: None,
        }
    }

    /// Create assembler that force-flushes once `limit` bytes are pending.
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Change the forced-flush limit (`None` = unbounded).
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    /// Append a fragment.
    ///
    /// Returns the completed line (terminator included) when the buffer now
    /// ends with [`TERMINATOR`], or when it reached the configured limit.
    /// The buffer is empty afterwards in both cases.
    pub fn feed(&mut self, fragment: &[u8]) -> Option<Vec<u8>> {
        self.buf.extend_from_slice(fragment);

        let terminated = self.buf.last() == Some(&TERMINATOR);
        let overflow = self.limit.is_some_and(|limit| self.buf.len() >= limit);

        if terminated || overflow {
            Some(core::mem::take(&mut self.buf))
        } else {
            None
        }
    }

    /// Bytes waiting for a terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discard pending bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

thread_local! {
    static ASSEMBLER: RefCell<LineAssembler> = const { RefCell::new(LineAssembler::new()) };
}

/// Feed a fragment into the calling context's assembler.
///
/// Returns `None` while the line is incomplete, and also when the context's
/// storage is unavailable (thread teardown) or already borrowed.
pub fn feed(fragment: &[u8], limit: Option<usize>) -> Option<Vec<u8>> {
    ASSEMBLER
        .try_with(|cell| {
            let mut assembler = cell.try_borrow_mut().ok()?;
            assembler.set_limit(limit);
            assembler.feed(fragment)
        })
        .ok()
        .flatten()
}

/// Number of bytes pending on the calling context.
pub fn pending_len() -> usize {
    ASSEMBLER
        .try_with(|cell| cell.try_borrow().map(|a| a.len()).unwrap_or(0))
        .unwrap_or(0)
}

/// Drop whatever the calling context has buffered.
pub fn discard_pending() {
    let _ = ASSEMBLER.try_with(|cell| {
        if let Ok(mut assembler) = cell.try_borrow_mut() {
            assembler.clear();
        }
    });
}

#[cfg(not(feature = "single-core"))]
mod flag {
    use core::cell::Cell;

    thread_local! {
        static ACTIVE: Cell<bool> = const { Cell::new(false) };
    }

    /// Claim the flag; `false` if it was already held (or TLS is gone).
    pub(super) fn acquire() -> bool {
        ACTIVE
            .try_with(|active| !active.replace(true))
            .unwrap_or(false)
    }

    pub(super) fn release() {
        let _ = ACTIVE.try_with(|active| active.set(false));
    }

    pub(super) fn is_held() -> bool {
        ACTIVE.try_with(Cell::get).unwrap_or(false)
    }
}

// Single core: one flag for the whole system.
#[cfg(feature = "single-core")]
mod flag {
    use core::sync::atomic::{AtomicBool, Ordering};

    static ACTIVE: AtomicBool = AtomicBool::new(false);

    pub(super) fn acquire() -> bool {
        ACTIVE
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    pub(super) fn release() {
        ACTIVE.store(false, Ordering::Release);
    }

    pub(super) fn is_held() -> bool {
        ACTIVE.load(Ordering::Acquire)
    }
}

/// Marks the calling context as inside the hook.
///
/// Construction fails when the context already holds a guard, which is how a
/// log call made while processing another log call is recognised and skipped.
/// The flag is cleared when the guard drops, on every exit path.
#[derive(Debug)]
pub struct ReentrancyGuard {
    // Tied to the context that created it.
    _not_send: PhantomData<*const ()>,
}

impl ReentrancyGuard {
    pub fn enter() -> Option<Self> {
        if flag::acquire() {
            Some(Self {
                _not_send: PhantomData,
            })
        } else {
            None
        }
    }

    /// True while the calling context holds a guard.
    pub fn is_active() -> bool {
        flag::is_held()
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        flag::release();
    }
}
