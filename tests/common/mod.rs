//! Shared test doubles.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use esp_loghook::{LogMessage, Platform, Sink};

/// Sink that records everything it receives.
#[derive(Default)]
pub struct CollectingSink {
    records: Mutex<Vec<LogMessage>>,
    inits: AtomicU32,
    shutdowns: AtomicU32,
}

impl CollectingSink {
    pub fn records(&self) -> Vec<LogMessage> {
        self.records.lock().unwrap().clone()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|m| m.payload().to_string())
            .collect()
    }

    pub fn inits(&self) -> u32 {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> u32 {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl Sink for CollectingSink {
    fn init(&self) {
        self.inits.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn dispatch(&self, message: LogMessage) {
        self.records.lock().unwrap().push(message);
    }
}

/// Print-callback slot holding handler names.
pub struct FakeSlot {
    current: Mutex<&'static str>,
    replaced: AtomicU32,
    restored: AtomicU32,
}

impl FakeSlot {
    pub const HOOK: &'static str = "loghook";

    pub fn new(original: &'static str) -> Self {
        Self {
            current: Mutex::new(original),
            replaced: AtomicU32::new(0),
            restored: AtomicU32::new(0),
        }
    }

    pub fn current(&self) -> &'static str {
        *self.current.lock().unwrap()
    }

    pub fn replaced(&self) -> u32 {
        self.replaced.load(Ordering::SeqCst)
    }

    pub fn restored(&self) -> u32 {
        self.restored.load(Ordering::SeqCst)
    }
}

impl Platform for FakeSlot {
    type Handler = &'static str;

    fn replace(&self) -> &'static str {
        self.replaced.fetch_add(1, Ordering::SeqCst);
        std::mem::replace(&mut *self.current.lock().unwrap(), Self::HOOK)
    }

    fn restore(&self, original: &'static str) {
        self.restored.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap() = original;
    }

    fn uptime(&self) -> Duration {
        Duration::from_millis(5000)
    }
}
