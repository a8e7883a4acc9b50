//! Recording engine for unit testing.
//!
//! `RecordingEngine` implements [`EngineConnection`] by pushing every call
//! into a `Mutex<Vec<...>>` so assertions can inspect exactly what the
//! session sent and in what order.  Two flags simulate failures:
//!
//! - `set_fail_connect(true)` makes `connect` return an error.
//! - `set_fail_keys(true)` makes `send_key` return an error.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use m8_core::KeyEvent;

use crate::application::input::{ConnectRequest, EngineConnection, EngineError};

/// An engine that records all calls without touching a device.
#[derive(Default)]
pub struct RecordingEngine {
    connects: Mutex<Vec<ConnectRequest>>,
    disconnects: AtomicUsize,
    keys: Mutex<Vec<KeyEvent>>,
    audio_hints: Mutex<Vec<String>>,
    orientation_locks: Mutex<Vec<bool>>,
    fail_connect: AtomicBool,
    fail_keys: AtomicBool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_keys(&self, fail: bool) {
        self.fail_keys.store(fail, Ordering::SeqCst);
    }

    pub fn connects(&self) -> Vec<ConnectRequest> {
        self.connects.lock().unwrap().clone()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<KeyEvent> {
        self.keys.lock().unwrap().clone()
    }

    pub fn audio_hints(&self) -> Vec<String> {
        self.audio_hints.lock().unwrap().clone()
    }

    pub fn orientation_locks(&self) -> Vec<bool> {
        self.orientation_locks.lock().unwrap().clone()
    }
}

impl EngineConnection for RecordingEngine {
    fn connect(&self, request: &ConnectRequest) -> Result<(), EngineError> {
        self.connects.lock().unwrap().push(request.clone());
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(EngineError::ConnectFailed {
                device: request.device.handle,
                reason: "mock failure".into(),
            });
        }
        Ok(())
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn send_key(&self, event: KeyEvent) -> Result<(), EngineError> {
        if self.fail_keys.load(Ordering::SeqCst) {
            return Err(EngineError::Io("mock failure".into()));
        }
        self.keys.lock().unwrap().push(event);
        Ok(())
    }

    fn set_audio_backend_hint(&self, name: &str) {
        self.audio_hints.lock().unwrap().push(name.to_string());
    }

    fn set_orientation_lock(&self, lock: bool) {
        self.orientation_locks.lock().unwrap().push(lock);
    }
}
