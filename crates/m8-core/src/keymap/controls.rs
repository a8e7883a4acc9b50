//! Static table of UI control identifiers.
//!
//! Each logical key is reachable from a primary control and an alternate
//! control.  Alternate controls exist for portrait layouts, where the button
//! columns are duplicated on both sides of the screen.
//!
//! The table is declarative: the host UI hands us the identifier string of the
//! control that was touched and [`lookup_control`] answers which key it is.

use super::M8Key;

/// Whether a control is the primary or the alternate instance of its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlVariant {
    Primary,
    Alternate,
}

/// One row of the control table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlBinding {
    pub control_id: &'static str,
    pub key: M8Key,
    pub variant: ControlVariant,
}

const fn primary(control_id: &'static str, key: M8Key) -> ControlBinding {
    ControlBinding {
        control_id,
        key,
        variant: ControlVariant::Primary,
    }
}

const fn alternate(control_id: &'static str, key: M8Key) -> ControlBinding {
    ControlBinding {
        control_id,
        key,
        variant: ControlVariant::Alternate,
    }
}

/// Every control the host UI may report.
pub const CONTROL_TABLE: &[ControlBinding] = &[
    primary("up", M8Key::Up),
    alternate("upAlt", M8Key::Up),
    primary("down", M8Key::Down),
    alternate("downAlt", M8Key::Down),
    primary("left", M8Key::Left),
    alternate("leftAlt", M8Key::Left),
    primary("right", M8Key::Right),
    alternate("rightAlt", M8Key::Right),
    primary("play", M8Key::Play),
    alternate("playAlt", M8Key::Play),
    primary("shift", M8Key::Shift),
    alternate("shiftAlt", M8Key::Shift),
    primary("option", M8Key::Option),
    alternate("optionAlt", M8Key::Option),
    primary("edit", M8Key::Edit),
    alternate("editAlt", M8Key::Edit),
];

/// Returns the binding for `control_id`, or `None` for unknown controls.
pub fn lookup_control(control_id: &str) -> Option<&'static ControlBinding> {
    CONTROL_TABLE.iter().find(|b| b.control_id == control_id)
}
