//! Logical M8 keys and the UI control translation table.
//!
//! The M8 has exactly eight buttons.  The host draws them as touchable
//! controls, and some layouts draw a key twice (a primary control and an
//! alternate control placed elsewhere on screen).  Both map to the same
//! [`M8Key`]; see [`controls::CONTROL_TABLE`].

pub mod controls;

use serde::{Deserialize, Serialize};

pub use controls::{lookup_control, ControlBinding, ControlVariant, CONTROL_TABLE};

/// One of the eight M8 buttons.
///
/// The discriminant is the button's bit in the controller mask sent to the
/// device (see [`crate::protocol::controller::KeyMask`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum M8Key {
    Edit = 1 << 0,
    Option = 1 << 1,
    Right = 1 << 2,
    Play = 1 << 3,
    Shift = 1 << 4,
    Down = 1 << 5,
    Up = 1 << 6,
    Left = 1 << 7,
}

impl M8Key {
    /// Every key, in controller bit order.
    pub const ALL: [M8Key; 8] = [
        M8Key::Edit,
        M8Key::Option,
        M8Key::Right,
        M8Key::Play,
        M8Key::Shift,
        M8Key::Down,
        M8Key::Up,
        M8Key::Left,
    ];

    /// Returns the controller mask bit for this key.
    pub fn bit(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            M8Key::Edit => "EDIT",
            M8Key::Option => "OPTION",
            M8Key::Right => "RIGHT",
            M8Key::Play => "PLAY",
            M8Key::Shift => "SHIFT",
            M8Key::Down => "DOWN",
            M8Key::Up => "UP",
            M8Key::Left => "LEFT",
        }
    }
}

impl std::fmt::Display for M8Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A press or release of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: M8Key,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn press(key: M8Key) -> Self {
        Self { key, pressed: true }
    }

    pub fn release(key: M8Key) -> Self {
        Self { key, pressed: false }
    }
}
