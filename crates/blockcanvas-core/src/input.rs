//! Pointer and keyboard events as delivered by the host.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Primary button for every pointer kind (touch contacts report `Left`).
    pub fn is_primary(self) -> bool {
        self == MouseButton::Left
    }
}

/// Device that produced a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    #[default]
    Mouse,
    Pen,
    Touch,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Ctrl on Linux/Windows or Cmd on macOS.
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// A pointer-down, move, up or cancel sample in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: u64,
    pub kind: PointerKind,
    pub button: MouseButton,
    pub position: Point,
    pub modifiers: Modifiers,
    pub timestamp: Instant,
}

impl PointerEvent {
    /// Primary-button mouse event at `position`, stamped now.
    pub fn mouse(position: Point) -> Self {
        Self {
            pointer_id: 1,
            kind: PointerKind::Mouse,
            button: MouseButton::Left,
            position,
            modifiers: Modifiers::NONE,
            timestamp: Instant::now(),
        }
    }

    /// Touch contact at `position`, stamped at `timestamp`.
    pub fn touch(position: Point, timestamp: Instant) -> Self {
        Self {
            pointer_id: 2,
            kind: PointerKind::Touch,
            button: MouseButton::Left,
            position,
            modifiers: Modifiers::NONE,
            timestamp,
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn at_time(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Keys the editor reacts to. Names follow DOM `KeyboardEvent.key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Delete,
    Backspace,
    Escape,
    /// A printable character, lowercased.
    Character(char),
    Other(String),
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        match name {
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "Delete" => Key::Delete,
            "Backspace" => Key::Backspace,
            "Escape" | "Esc" => Key::Escape,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Character(c.to_ascii_lowercase()),
                    _ => Key::Other(other.to_string()),
                }
            }
        }
    }
}

/// A key press with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<Key>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    pub fn plain(key: impl Into<Key>) -> Self {
        Self::new(key, Modifiers::NONE)
    }
}

impl From<&str> for KeyEvent {
    fn from(name: &str) -> Self {
        Self::plain(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from("ArrowLeft"), Key::ArrowLeft);
        assert_eq!(Key::from("Esc"), Key::Escape);
        assert_eq!(Key::from("Z"), Key::Character('z'));
        assert_eq!(Key::from("F5"), Key::Other("F5".into()));
    }

    #[test]
    fn test_command_modifier() {
        assert!(Modifiers::ctrl().command());
        assert!(Modifiers { meta: true, ..Modifiers::NONE }.command());
        assert!(!Modifiers::shift().command());
    }

    #[test]
    fn test_pointer_builders() {
        let event = PointerEvent::mouse(Point::new(1.0, 2.0))
            .with_button(MouseButton::Right)
            .with_modifiers(Modifiers::shift());
        assert_eq!(event.kind, PointerKind::Mouse);
        assert!(!event.button.is_primary());
        assert!(event.modifiers.shift);
    }
}
