//! Host → device controller key state.
//!
//! The M8 does not receive individual key events.  It receives the *set* of
//! keys currently held, as one byte with one bit per key, framed as
//! `['C', mask]`.  [`KeyMask`] folds a stream of [`KeyEvent`]s into that byte.
//!
//! # Why a bitmask? (for beginners)
//!
//! Many M8 shortcuts are chords: SHIFT+UP, OPTION+EDIT, and so on.  Sending the
//! whole held set every time means the device never has to reconstruct chords
//! from a sequence of presses and releases, and a lost message is corrected by
//! the next one.

use thiserror::Error;

use crate::keymap::{KeyEvent, M8Key};

/// Frame prefix of a controller message.
pub const CONTROLLER_PREFIX: u8 = b'C';

/// Length of an encoded controller message.
pub const CONTROLLER_MESSAGE_LEN: usize = 2;

/// Errors that can occur while decoding a controller message.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than a controller message.
    #[error("insufficient data: need {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The first byte is not the controller prefix.
    #[error("unexpected frame prefix: 0x{0:02X}")]
    UnexpectedPrefix(u8),
}

/// Set of currently held keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyMask(pub u8);

impl KeyMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a press or release.  Returns `true` if the mask changed.
    pub fn apply(&mut self, event: KeyEvent) -> bool {
        let before = self.0;
        if event.pressed {
            self.0 |= event.key.bit();
        } else {
            self.0 &= !event.key.bit();
        }
        self.0 != before
    }

    pub fn is_held(&self, key: M8Key) -> bool {
        self.0 & key.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Releases every key.
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Returns the held keys in controller bit order.
    pub fn held(&self) -> Vec<M8Key> {
        M8Key::ALL.into_iter().filter(|k| self.is_held(*k)).collect()
    }
}

/// Encodes `mask` as a controller message.
pub fn encode_controller_message(mask: KeyMask) -> [u8; CONTROLLER_MESSAGE_LEN] {
    [CONTROLLER_PREFIX, mask.0]
}

/// Decodes a controller message from the start of `bytes`.
///
/// # Errors
///
/// Returns [`ProtocolError`] if `bytes` is too short or is not a controller frame.
pub fn decode_controller_message(bytes: &[u8]) -> Result<KeyMask, ProtocolError> {
    match bytes {
        [CONTROLLER_PREFIX, mask, ..] => Ok(KeyMask(*mask)),
        [other, _, ..] => Err(ProtocolError::UnexpectedPrefix(*other)),
        _ => Err(ProtocolError::InsufficientData {
            needed: CONTROLLER_MESSAGE_LEN,
            available: bytes.len(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_sets_bit_and_release_clears_it() {
        // Arrange
        let mut mask = KeyMask::new();

        // Act / Assert
        assert!(mask.apply(KeyEvent::press(M8Key::Shift)));
        assert!(mask.apply(KeyEvent::press(M8Key::Up)));
        assert_eq!(mask.0, M8Key::Shift.bit() | M8Key::Up.bit());

        assert!(mask.apply(KeyEvent::release(M8Key::Shift)));
        assert_eq!(mask.held(), vec![M8Key::Up]);
    }

    #[test]
    fn test_repeated_press_reports_no_change() {
        let mut mask = KeyMask::new();
        mask.apply(KeyEvent::press(M8Key::Play));
        assert!(!mask.apply(KeyEvent::press(M8Key::Play)));
    }

    #[test]
    fn test_release_of_unheld_key_reports_no_change() {
        let mut mask = KeyMask::new();
        assert!(!mask.apply(KeyEvent::release(M8Key::Edit)));
        assert!(mask.is_empty());
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut mask = KeyMask(0xFF);
        mask.clear();
        assert!(mask.is_empty());
    }

    #[test]
    fn test_encode_frames_mask_with_prefix() {
        assert_eq!(encode_controller_message(KeyMask(0x41)), [b'C', 0x41]);
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert_eq!(
            decode_controller_message(&[b'C']),
            Err(ProtocolError::InsufficientData { needed: 2, available: 1 })
        );
    }

    #[test]
    fn test_decode_rejects_wrong_prefix() {
        assert_eq!(
            decode_controller_message(&[b'K', 0x01]),
            Err(ProtocolError::UnexpectedPrefix(b'K'))
        );
    }

    #[test]
    fn test_decode_reads_mask() {
        assert_eq!(decode_controller_message(&[b'C', 0x81]), Ok(KeyMask(0x81)));
    }
}
