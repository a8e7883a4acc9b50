//! Engine → host command codec.
//!
//! Wire format: a `(tag, payload)` pair of 32-bit integers.
//!
//! | Tag      | Meaning                  | Payload                       |
//! |----------|--------------------------|-------------------------------|
//! | `0x8001` | Background colour change | `r << 16 \| g << 8 \| b`      |
//!
//! The engine may grow new tags.  Decoding an unknown tag yields `None`
//! rather than an error so older hosts keep working against newer engines.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tag of the background-colour-changed command.
pub const BACKGROUND_COLOR_CHANGED: u32 = 0x8001;

/// An 8-bit-per-channel RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpacks a 24-bit RGB value.
    ///
    /// Bits above the low 24 are discarded, so every payload yields a colour.
    pub fn from_packed(payload: u32) -> Self {
        Self {
            r: ((payload >> 16) & 0xFF) as u8,
            g: ((payload >> 8) & 0xFF) as u8,
            b: (payload & 0xFF) as u8,
        }
    }

    /// Packs this colour as `r << 16 | g << 8 | b`.
    pub fn packed(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A decoded engine command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCommand {
    BackgroundColorChanged(Rgb),
}

impl EngineCommand {
    /// Returns the wire tag for this command.
    pub fn tag(&self) -> u32 {
        match self {
            EngineCommand::BackgroundColorChanged(_) => BACKGROUND_COLOR_CHANGED,
        }
    }
}

/// Decodes a `(tag, payload)` pair.
///
/// Returns `None` for tags this host does not know.
pub fn decode_command(tag: u32, payload: u32) -> Option<EngineCommand> {
    match tag {
        BACKGROUND_COLOR_CHANGED => Some(EngineCommand::BackgroundColorChanged(Rgb::from_packed(
            payload,
        ))),
        other => {
            debug!("ignoring engine command with unknown tag 0x{other:04X}");
            None
        }
    }
}

/// Encodes a command into its `(tag, payload)` pair.
pub fn encode_command(command: &EngineCommand) -> (u32, u32) {
    match command {
        EngineCommand::BackgroundColorChanged(rgb) => (command.tag(), rgb.packed()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_background_color_unpacks_channels() {
        // Arrange
        let payload = (200 << 16) | (100 << 8) | 50;

        // Act
        let cmd = decode_command(BACKGROUND_COLOR_CHANGED, payload);

        // Assert
        assert_eq!(
            cmd,
            Some(EngineCommand::BackgroundColorChanged(Rgb::new(200, 100, 50)))
        );
    }

    #[test]
    fn test_decode_zero_payload_is_black() {
        assert_eq!(
            decode_command(BACKGROUND_COLOR_CHANGED, 0),
            Some(EngineCommand::BackgroundColorChanged(Rgb::new(0, 0, 0)))
        );
    }

    #[test]
    fn test_decode_masks_bits_above_24() {
        // Arrange – an alpha byte in the top bits must not leak into red
        let payload = 0xFF_12_34_56;

        // Act
        let cmd = decode_command(BACKGROUND_COLOR_CHANGED, payload);

        // Assert
        assert_eq!(
            cmd,
            Some(EngineCommand::BackgroundColorChanged(Rgb::new(0x12, 0x34, 0x56)))
        );
    }

    #[test]
    fn test_decode_unknown_tag_returns_none() {
        assert_eq!(decode_command(0x1234, 0x00FF_FFFF), None);
        assert_eq!(decode_command(0x8002, 0), None);
        assert_eq!(decode_command(0, 0), None);
    }

    #[test]
    fn test_encode_command_uses_wire_tag() {
        let (tag, payload) =
            encode_command(&EngineCommand::BackgroundColorChanged(Rgb::new(1, 2, 3)));
        assert_eq!(tag, 0x8001);
        assert_eq!(payload, 0x01_02_03);
    }

    #[test]
    fn test_rgb_display_is_hex() {
        assert_eq!(Rgb::new(255, 0, 16).to_string(), "#ff0010");
    }
}
