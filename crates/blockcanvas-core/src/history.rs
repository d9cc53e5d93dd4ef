//! Linear undo/redo history over whole-document snapshots.

use crate::document::CanvasDocument;
use std::collections::VecDeque;

/// Maximum number of undo states to keep.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Undo and redo stacks of document snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<CanvasDocument>,
    redo_stack: Vec<CanvasDocument>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// Create an empty history keeping at most `limit` undo states.
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state that existed before a committed mutation.
    pub fn record(&mut self, before: CanvasDocument) {
        self.undo_stack.push_back(before);
        self.redo_stack.clear();
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
    }

    /// Swap `current` with the most recent undo state.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self, current: &mut CanvasDocument) -> bool {
        match self.undo_stack.pop_back() {
            Some(previous) => {
                let undone = std::mem::replace(current, previous);
                self.redo_stack.push(undone);
                true
            }
            None => false,
        }
    }

    /// Swap `current` with the most recent redo state.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self, current: &mut CanvasDocument) -> bool {
        match self.redo_stack.pop() {
            Some(next) => {
                let redone = std::mem::replace(current, next);
                self.undo_stack.push_back(redone);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }
}
