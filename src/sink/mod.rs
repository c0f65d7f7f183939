//! Destinations for parsed records.
//!
//! The hook only relies on [`Sink`]; how a sink queues, batches or delivers is
//! its own business. [`AsyncSink`] is the reference implementation that hands
//! records to a worker task through the OS abstraction.

pub mod queue;

pub use queue::{AsyncSink, AsyncSinkConfig};

use crate::message::LogMessage;

/// Consumer of structured log records.
///
/// `dispatch` is called on the logging hot path from any task, so it must not
/// block for long and must tolerate concurrent callers.
pub trait Sink: Send + Sync {
    /// Prepare for dispatch. Called by the hook on install.
    fn init(&self) {}

    /// Release resources. Called by the hook on uninstall.
    fn shutdown(&self) {}

    /// Deliver one record. May drop it under backpressure.
    fn dispatch(&self, message: LogMessage);
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn dispatch(&self, _message: LogMessage) {}
}

impl<S: Sink + ?Sized> Sink for &S {
    fn init(&self) {
        (**self).init()
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }

    fn dispatch(&self, message: LogMessage) {
        (**self).dispatch(message)
    }
}

impl<S: Sink + ?Sized> Sink for std::sync::Arc<S> {
    fn init(&self) {
        (**self).init()
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }

    fn dispatch(&self, message: LogMessage) {
        (**self).dispatch(message)
    }
}
