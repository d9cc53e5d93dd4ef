//! Selection, inline-edit and popover state.
//!
//! Blocks remain pure data; this tracks which of them the user is
//! interacting with. None of it enters the undo history.

use crate::block::BlockId;

/// The UI state of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockState {
    /// No interaction.
    #[default]
    Normal,
    /// Selected (shows handles, can be moved/resized).
    Selected,
    /// In inline text-editing mode.
    Editing,
}

impl BlockState {
    /// Check if the block is selected (either just selected or editing).
    pub fn is_selected(self) -> bool {
        matches!(self, Self::Selected | Self::Editing)
    }

    pub fn is_editing(self) -> bool {
        self == Self::Editing
    }
}

/// Tracks selected ids (in click order), the editing target and the open
/// contextual popover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Vec<BlockId>,
    editing: Option<BlockId>,
    popover: Option<BlockId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the state of a block.
    pub fn state(&self, id: &str) -> BlockState {
        if self.is_editing(id) {
            BlockState::Editing
        } else if self.is_selected(id) {
            BlockState::Selected
        } else {
            BlockState::Normal
        }
    }

    /// Selected ids in click order.
    pub fn selected(&self) -> &[BlockId] {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Select a single block (clears other selections).
    pub fn select(&mut self, id: BlockId) {
        self.selected.clear();
        self.selected.push(id);
    }

    fn add(&mut self, id: BlockId) {
        if !self.is_selected(&id) {
            self.selected.push(id);
        }
    }

    /// Toggle membership of a block (shift-click).
    pub fn toggle(&mut self, id: BlockId) {
        if self.is_selected(&id) {
            self.deselect(&id);
        } else {
            self.selected.push(id);
        }
    }

    /// Remove a block from the selection.
    pub fn deselect(&mut self, id: &str) {
        self.selected.retain(|s| s != id);
    }

    /// Replace the selection with `ids`, keeping their order.
    pub fn select_all(&mut self, ids: impl IntoIterator<Item = BlockId>) {
        self.selected.clear();
        for id in ids {
            self.add(id);
        }
    }

    /// Block currently in editing mode.
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn is_editing(&self, id: &str) -> bool {
        self.editing.as_deref() == Some(id)
    }

    /// Enter editing mode. Silently replaces any previous editing target and
    /// makes `id` the selection if it was not already selected.
    pub fn enter_editing(&mut self, id: BlockId) {
        if !self.is_selected(&id) {
            self.select(id.clone());
        }
        self.editing = Some(id);
    }

    /// Exit editing mode. The block stays selected.
    pub fn exit_editing(&mut self) {
        self.editing = None;
    }

    /// Block the open contextual popover is anchored on.
    pub fn popover(&self) -> Option<&str> {
        self.popover.as_deref()
    }

    pub fn open_popover(&mut self, id: BlockId) {
        self.popover = Some(id);
    }

    pub fn dismiss_popover(&mut self) {
        self.popover = None;
    }

    /// Escape: clear selection, exit editing and dismiss the popover.
    pub fn reset(&mut self) {
        self.selected.clear();
        self.editing = None;
        self.popover = None;
    }

    /// Drop every reference for which `exists` is false.
    pub fn retain(&mut self, exists: impl Fn(&str) -> bool) {
        self.selected.retain(|id| exists(id));
        if self.editing.as_deref().is_some_and(|id| !exists(id)) {
            self.editing = None;
        }
        if self.popover.as_deref().is_some_and(|id| !exists(id)) {
            self.popover = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> BlockId {
        s.to_string()
    }

    #[test]
    fn test_select_replaces() {
        let mut sel = SelectionState::new();
        sel.select(id("a"));
        sel.select(id("b"));
        assert_eq!(sel.selected(), ["b"]);
    }

    #[test]
    fn test_toggle_keeps_click_order() {
        let mut sel = SelectionState::new();
        sel.toggle(id("b"));
        sel.toggle(id("a"));
        sel.toggle(id("c"));
        assert_eq!(sel.selected(), ["b", "a", "c"]);

        sel.toggle(id("a"));
        assert_eq!(sel.selected(), ["b", "c"]);
    }

    #[test]
    fn test_editing_replaces_silently() {
        let mut sel = SelectionState::new();
        sel.enter_editing(id("a"));
        assert_eq!(sel.state("a"), BlockState::Editing);

        sel.enter_editing(id("b"));
        assert_eq!(sel.editing(), Some("b"));
        assert_eq!(sel.state("a"), BlockState::Normal);
        assert_eq!(sel.state("b"), BlockState::Editing);
        assert!(sel.state("b").is_selected());
    }

    #[test]
    fn test_remove_clears_all_references() {
        let mut sel = SelectionState::new();
        sel.select_all([id("a"), id("b")]);
        sel.enter_editing(id("a"));
        sel.open_popover(id("a"));

        sel.retain(|id| id != "a");
        assert_eq!(sel.selected(), ["b"]);
        assert_eq!(sel.editing(), None);
        assert_eq!(sel.popover(), None);
    }

    #[test]
    fn test_reset() {
        let mut sel = SelectionState::new();
        sel.select(id("a"));
        sel.enter_editing(id("a"));
        sel.open_popover(id("a"));
        sel.reset();
        assert_eq!(sel, SelectionState::default());
    }

    #[test]
    fn test_retain() {
        let mut sel = SelectionState::new();
        sel.select_all([id("a"), id("b")]);
        sel.enter_editing(id("b"));
        sel.retain(|id| id == "a");
        assert_eq!(sel.selected(), ["a"]);
        assert_eq!(sel.editing(), None);
    }
}
