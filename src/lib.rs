//! # esp-loghook
//!
//! Captures ESP-IDF log output and forwards it as structured records.
//!
//! ## Architecture
//!
//! ```text
//! vprintf hook ─▶ ReentrancyGuard ─▶ LineAssembler ─▶ normalize ─▶ Parser ─▶ Sink
//!  (any task)       (per task)         (per task)
//! ```
//!
//! - Fragments are reassembled per task, so concurrent loggers never interleave
//! - Parsing is total: malformed lines become Info records with the raw text
//! - The hot path takes no locks; only install/uninstall serialise
//! - Background delivery runs on any RTOS through [`os::OsBackend`]

pub mod context;
pub mod format;
pub mod hook;
pub mod message;
pub mod normalize;
pub mod os;
pub mod parser;
pub mod pipeline;
pub mod sink;

#[cfg(target_os = "espidf")]
pub mod espidf;

pub use context::{LineAssembler, ReentrancyGuard};
pub use format::FormatError;
pub use hook::{HookConfig, LogHook, Platform};
pub use message::{LogLevel, LogMessage};
pub use normalize::normalize;
pub use os::{OsBackend, SemaphoreHandle, TaskConfig, TaskHandle, WAIT_FOREVER};
pub use parser::Parser;
pub use pipeline::Pipeline;
pub use sink::{AsyncSink, AsyncSinkConfig, NullSink, Sink};
