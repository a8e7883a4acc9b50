//! Byte-stream engine connection.
//!
//! `SerialEngine` keeps the current key mask and writes a two-byte controller
//! message (`'C'`, mask) to its sink every time a key changes.  The sink is
//! any [`Write`] implementation: a serial port handle, a pipe to the native
//! engine, or `io::sink()` when running headless.
//!
//! When constructed with [`SerialEngine::with_events`], a successful
//! `connect` is acknowledged by posting `HostEvent::EngineConnected` to the
//! session's event channel, the same way an asynchronous engine would.

use std::io::Write;
use std::sync::Mutex;

use m8_core::{protocol::encode_controller_message, DeviceDescriptor, KeyEvent, KeyMask};
use tracing::{debug, info, warn};

use crate::application::events::{EventSendError, HostEvent, HostEventSender};
use crate::application::input::{ConnectRequest, EngineConnection, EngineError};

struct SerialState<W> {
    writer: W,
    mask: KeyMask,
    device: Option<DeviceDescriptor>,
    audio_backend: Option<String>,
    orientation_locked: bool,
}

/// An [`EngineConnection`] that streams controller messages to a writer.
pub struct SerialEngine<W: Write + Send> {
    state: Mutex<SerialState<W>>,
    events: Option<HostEventSender>,
}

impl<W: Write + Send> SerialEngine<W> {
    pub fn new(writer: W) -> Self {
        Self {
            state: Mutex::new(SerialState {
                writer,
                mask: KeyMask::new(),
                device: None,
                audio_backend: None,
                orientation_locked: false,
            }),
            events: None,
        }
    }

    /// Acknowledges connects on `events`.
    pub fn with_events(mut self, events: HostEventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Current key mask as last written.
    pub fn mask(&self) -> KeyMask {
        self.lock().map(|s| s.mask).unwrap_or_default()
    }

    /// Audio backend most recently hinted.
    pub fn audio_backend(&self) -> Option<String> {
        self.lock().ok().and_then(|s| s.audio_backend.clone())
    }

    pub fn orientation_locked(&self) -> bool {
        self.lock().map(|s| s.orientation_locked).unwrap_or(false)
    }

    /// Consumes the engine and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, EngineError> {
        self.state
            .into_inner()
            .map(|s| s.writer)
            .map_err(|_| EngineError::Io("engine state poisoned".into()))
    }

    /// Posts `EngineConnected` for `device`.
    ///
    /// A full channel is waited out on the runtime when there is one.  Without
    /// a runtime, or once the loop has closed, the acknowledgement cannot be
    /// delivered and the connect fails instead of leaving the session waiting.
    fn acknowledge(&self, device: &DeviceDescriptor) -> Result<(), EngineError> {
        let Some(events) = &self.events else {
            return Ok(());
        };
        let event = HostEvent::EngineConnected {
            device: device.clone(),
        };
        match events.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(EventSendError::Full) => match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    debug!("event channel full; queueing connect acknowledgement");
                    let events = events.clone();
                    runtime.spawn(async move {
                        if let Err(e) = events.send(event).await {
                            warn!("could not acknowledge engine connect: {e}");
                        }
                    });
                    Ok(())
                }
                Err(_) => Err(EngineError::ConnectFailed {
                    device: device.handle,
                    reason: "event channel full".into(),
                }),
            },
            Err(EventSendError::Closed) => Err(EngineError::ConnectFailed {
                device: device.handle,
                reason: "event loop closed".into(),
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SerialState<W>>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::Io("engine state poisoned".into()))
    }
}

fn write_mask<W: Write>(writer: &mut W, mask: KeyMask) -> Result<(), EngineError> {
    let message = encode_controller_message(mask);
    writer
        .write_all(&message)
        .and_then(|()| writer.flush())
        .map_err(|e| EngineError::Io(e.to_string()))
}

impl<W: Write + Send> EngineConnection for SerialEngine<W> {
    fn connect(&self, request: &ConnectRequest) -> Result<(), EngineError> {
        {
            let mut state = self.lock()?;
            state.mask.clear();
            // Start from a known all-released state.
            write_mask(&mut state.writer, KeyMask::new()).map_err(|e| EngineError::ConnectFailed {
                device: request.device.handle,
                reason: e.to_string(),
            })?;
            state.device = Some(request.device.clone());
        }
        info!(
            session = %request.session_id,
            "engine connected to {} (audio device {})",
            request.device, request.audio_device
        );

        self.acknowledge(&request.device)
    }

    fn disconnect(&self) {
        let Ok(mut state) = self.lock() else {
            warn!("engine state poisoned during disconnect");
            return;
        };
        if state.device.take().is_none() {
            return;
        }
        if !state.mask.is_empty() {
            // Release everything so the device is not left with a stuck key.
            state.mask.clear();
            if let Err(e) = write_mask(&mut state.writer, KeyMask::new()) {
                warn!("failed to release keys on disconnect: {e}");
            }
        }
        debug!("engine disconnected");
    }

    fn send_key(&self, event: KeyEvent) -> Result<(), EngineError> {
        let mut state = self.lock()?;
        if state.device.is_none() {
            return Err(EngineError::NotConnected);
        }
        if !state.mask.apply(event) {
            // Repeated press or release: mask unchanged, nothing to send.
            return Ok(());
        }
        let mask = state.mask;
        write_mask(&mut state.writer, mask)
    }

    fn set_audio_backend_hint(&self, name: &str) {
        if let Ok(mut state) = self.lock() {
            debug!("audio backend hint: {name}");
            state.audio_backend = Some(name.to_string());
        }
    }

    fn set_orientation_lock(&self, lock: bool) {
        if let Ok(mut state) = self.lock() {
            debug!("orientation lock: {lock}");
            state.orientation_locked = lock;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use m8_core::{protocol::decode_controller_message, DeviceHandle, M8Key};
    use uuid::Uuid;

    fn request() -> ConnectRequest {
        ConnectRequest {
            session_id: Uuid::new_v4(),
            device: DeviceDescriptor::new(DeviceHandle(1), 0x16C0, 0x048A),
            audio_device: 0,
        }
    }

    fn messages(bytes: &[u8]) -> Vec<KeyMask> {
        bytes
            .chunks(2)
            .map(|c| decode_controller_message(c).unwrap())
            .collect()
    }

    #[test]
    fn test_connect_writes_released_mask() {
        // Arrange
        let engine = SerialEngine::new(Vec::new());

        // Act
        engine.connect(&request()).unwrap();

        // Assert
        let bytes = engine.into_inner().unwrap();
        assert_eq!(bytes, vec![b'C', 0]);
    }

    #[test]
    fn test_key_changes_stream_cumulative_mask() {
        // Arrange
        let engine = SerialEngine::new(Vec::new());
        engine.connect(&request()).unwrap();

        // Act – shift+up chord, then release shift
        engine.send_key(KeyEvent::press(M8Key::Shift)).unwrap();
        engine.send_key(KeyEvent::press(M8Key::Up)).unwrap();
        engine.send_key(KeyEvent::release(M8Key::Shift)).unwrap();

        // Assert
        let masks = messages(&engine.into_inner().unwrap());
        assert_eq!(masks, vec![KeyMask(0), KeyMask(16), KeyMask(80), KeyMask(64)]);
    }

    #[test]
    fn test_repeated_press_writes_nothing() {
        let engine = SerialEngine::new(Vec::new());
        engine.connect(&request()).unwrap();
        engine.send_key(KeyEvent::press(M8Key::Play)).unwrap();
        engine.send_key(KeyEvent::press(M8Key::Play)).unwrap();
        assert_eq!(messages(&engine.into_inner().unwrap()).len(), 2);
    }

    #[test]
    fn test_send_key_before_connect_is_rejected() {
        let engine = SerialEngine::new(Vec::new());
        let result = engine.send_key(KeyEvent::press(M8Key::Edit));
        assert!(matches!(result, Err(EngineError::NotConnected)));
    }

    #[test]
    fn test_disconnect_releases_held_keys() {
        // Arrange
        let engine = SerialEngine::new(Vec::new());
        engine.connect(&request()).unwrap();
        engine.send_key(KeyEvent::press(M8Key::Option)).unwrap();

        // Act
        engine.disconnect();

        // Assert
        assert!(engine.mask().is_empty());
        let masks = messages(&engine.into_inner().unwrap());
        assert_eq!(masks.last(), Some(&KeyMask(0)));
    }

    #[test]
    fn test_hints_are_recorded() {
        let engine = SerialEngine::new(std::io::sink());
        engine.set_audio_backend_hint("OpenSLES");
        engine.set_orientation_lock(true);
        assert_eq!(engine.audio_backend().as_deref(), Some("OpenSLES"));
        assert!(engine.orientation_locked());
    }

    #[test]
    fn test_connect_is_acknowledged_on_event_channel() {
        // Arrange
        let (sender, mut receiver) = crate::application::events::channel(4);
        let engine = SerialEngine::new(std::io::sink()).with_events(sender);

        // Act
        engine.connect(&request()).unwrap();

        // Assert
        match receiver.try_recv() {
            Ok(HostEvent::EngineConnected { device }) => assert_eq!(device.handle, DeviceHandle(1)),
            other => panic!("expected EngineConnected, got {other:?}"),
        }
    }

    #[test]
    fn test_connect_fails_when_acknowledgement_cannot_be_queued() {
        // Arrange
        let (sender, _receiver) = crate::application::events::channel(1);
        sender.try_send(HostEvent::Stop).unwrap();
        let engine = SerialEngine::new(std::io::sink()).with_events(sender);

        // Act
        let result = engine.connect(&request());

        // Assert
        assert!(matches!(
            result,
            Err(EngineError::ConnectFailed { device: DeviceHandle(1), .. })
        ));
    }

    #[test]
    fn test_connect_fails_when_event_loop_closed() {
        let (sender, receiver) = crate::application::events::channel(4);
        drop(receiver);
        let engine = SerialEngine::new(std::io::sink()).with_events(sender);

        let result = engine.connect(&request());

        assert!(matches!(result, Err(EngineError::ConnectFailed { .. })));
    }

    #[tokio::test]
    async fn test_full_channel_defers_acknowledgement_on_runtime() {
        // Arrange
        let (sender, mut receiver) = crate::application::events::channel(1);
        sender.try_send(HostEvent::Stop).unwrap();
        let engine = SerialEngine::new(std::io::sink()).with_events(sender);

        // Act
        engine.connect(&request()).unwrap();

        // Assert
        assert_eq!(receiver.recv().await, Some(HostEvent::Stop));
        match receiver.recv().await {
            Some(HostEvent::EngineConnected { device }) => {
                assert_eq!(device.handle, DeviceHandle(1))
            }
            other => panic!("expected EngineConnected, got {other:?}"),
        }
    }
}
