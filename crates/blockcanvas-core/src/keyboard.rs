//! Keyboard shortcuts for the canvas.
//!
//! [`KeyboardController::handle`] maps a key event onto store operations and
//! reports whether the host should suppress the browser default. While a text
//! field has focus only Escape is handled; every other key belongs to the
//! field.

use crate::geometry::Vec2;
use crate::input::{Key, KeyEvent};
use crate::store::DocumentStore;

/// Arrow-key nudge distance in pixels.
pub const NUDGE_STEP: f64 = 8.0;
/// Arrow-key nudge distance with shift held.
pub const NUDGE_STEP_FINE: f64 = 1.0;

/// Where keyboard focus currently sits in the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusTarget {
    #[default]
    Canvas,
    /// A text input or content-editable region.
    TextInput,
}

/// A resolved keyboard command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    Nudge(Vec2),
    DeleteSelection,
    Undo,
    Redo,
    SelectAll,
    DuplicateSelection,
    /// Clear selection, exit editing and dismiss the popover.
    Escape,
}

/// Maps key events onto [`DocumentStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardController {
    pub nudge_step: f64,
    pub nudge_step_fine: f64,
}

impl Default for KeyboardController {
    fn default() -> Self {
        Self::new(NUDGE_STEP, NUDGE_STEP_FINE)
    }
}

impl KeyboardController {
    pub fn new(nudge_step: f64, nudge_step_fine: f64) -> Self {
        Self {
            nudge_step,
            nudge_step_fine,
        }
    }

    /// Resolve an event without applying it.
    pub fn resolve(&self, event: &KeyEvent, text_focused: bool) -> Option<KeyAction> {
        if event.key == Key::Escape {
            return Some(KeyAction::Escape);
        }
        if text_focused {
            return None;
        }

        let mods = event.modifiers;
        if mods.command() {
            return match event.key {
                Key::Character('z') if mods.shift => Some(KeyAction::Redo),
                Key::Character('z') => Some(KeyAction::Undo),
                Key::Character('y') => Some(KeyAction::Redo),
                Key::Character('a') => Some(KeyAction::SelectAll),
                Key::Character('d') => Some(KeyAction::DuplicateSelection),
                _ => None,
            };
        }

        let step = if mods.shift {
            self.nudge_step_fine
        } else {
            self.nudge_step
        };
        match event.key {
            Key::ArrowUp => Some(KeyAction::Nudge(Vec2::new(0.0, -step))),
            Key::ArrowDown => Some(KeyAction::Nudge(Vec2::new(0.0, step))),
            Key::ArrowLeft => Some(KeyAction::Nudge(Vec2::new(-step, 0.0))),
            Key::ArrowRight => Some(KeyAction::Nudge(Vec2::new(step, 0.0))),
            Key::Delete | Key::Backspace => Some(KeyAction::DeleteSelection),
            _ => None,
        }
    }

    /// Apply an action to the store.
    pub fn apply(&self, action: KeyAction, store: &mut DocumentStore) {
        let selected = store.selection().selected().to_vec();
        match action {
            KeyAction::Nudge(delta) => {
                store.nudge_blocks(&selected, delta);
            }
            KeyAction::DeleteSelection => {
                store.remove_blocks(&selected);
            }
            KeyAction::Undo => {
                store.undo();
            }
            KeyAction::Redo => {
                store.redo();
            }
            KeyAction::SelectAll => store.select_all(),
            KeyAction::DuplicateSelection => {
                let copies: Vec<_> = selected
                    .iter()
                    .filter_map(|id| store.duplicate_block(id))
                    .collect();
                if let Some((first, rest)) = copies.split_first() {
                    store.select_block(first, false);
                    for id in rest {
                        store.select_block(id, true);
                    }
                }
            }
            KeyAction::Escape => store.clear_selection(),
        }
    }

    /// Handle a key event. Returns true if the event was consumed and the
    /// host should prevent its default behavior.
    pub fn handle(&self, event: &KeyEvent, focus: FocusTarget, store: &mut DocumentStore) -> bool {
        let text_focused = focus == FocusTarget::TextInput || store.selection().editing().is_some();
        let Some(action) = self.resolve(event, text_focused) else {
            return false;
        };
        let needs_selection = matches!(
            action,
            KeyAction::Nudge(_) | KeyAction::DeleteSelection | KeyAction::DuplicateSelection
        );
        if needs_selection && store.selection().is_empty() {
            return false;
        }
        log::debug!("Key {:?} -> {action:?}", event.key);
        self.apply(action, store);
        true
    }
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub command: bool,
    pub shift: bool,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        command: bool,
        shift: bool,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            command,
            shift,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl/Cmd+Shift+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.command {
            parts.push("Ctrl/Cmd");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("Arrows", false, false, "Nudge selected blocks by 8px"),
            Shortcut::new("Arrows", false, true, "Nudge selected blocks by 1px"),
            Shortcut::new("Delete", false, false, "Delete selected blocks"),
            Shortcut::new("Backspace", false, false, "Delete selected blocks"),
            Shortcut::new("Z", true, false, "Undo"),
            Shortcut::new("Z", true, true, "Redo"),
            Shortcut::new("Y", true, false, "Redo"),
            Shortcut::new("A", true, false, "Select all blocks"),
            Shortcut::new("D", true, false, "Duplicate selected blocks"),
            Shortcut::new("Escape", false, false, "Clear selection and stop editing"),
        ]
    }
}
