//! The document store: every mutation of a canvas document goes through here.
//!
//! Each committed mutation replaces the document with a fully valid value,
//! records the previous snapshot in the undo history and bumps the revision.
//! Selection, editing and popover changes never enter the history.

use crate::block::{
    Block, BlockContent, BlockId, BlockKind, BlockPatch, ContentError, StyleMap,
};
use crate::document::{CanvasDocument, TokenSection};
use crate::geometry::{
    MIN_BLOCK_DIMENSION, Position, Rect, Size, Vec2, clamp_position, clamp_size,
};
use crate::history::{DEFAULT_HISTORY_LIMIT, History};
use crate::selection::SelectionState;
use serde_json::Value;
use std::collections::HashSet;

/// Offset applied to a duplicated block.
pub const DUPLICATE_OFFSET: Vec2 = Vec2::new(10.0, 10.0);

/// Owns the current document, its undo history and the selection.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    document: CanvasDocument,
    history: History,
    selection: SelectionState,
    revision: u64,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(CanvasDocument::new())
    }
}

impl DocumentStore {
    /// Create a store around `document`, repairing its order list if needed.
    pub fn new(document: CanvasDocument) -> Self {
        Self::with_history_limit(document, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(mut document: CanvasDocument, limit: usize) -> Self {
        if document.repair() {
            log::warn!("Repaired block order of document {}", document.id);
        }
        Self {
            document,
            history: History::new(limit),
            selection: SelectionState::new(),
            revision: 0,
        }
    }

    pub fn document(&self) -> &CanvasDocument {
        &self.document
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Bumped on every committed mutation, undo and redo.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.document.get_block(id)
    }

    /// Run `mutate` against the document as one history entry.
    ///
    /// The mutation is rolled back when it reports no change, leaves the
    /// document equal to before, or breaks the order/map invariant.
    fn commit(
        &mut self,
        label: &str,
        mutate: impl FnOnce(&mut CanvasDocument) -> bool,
    ) -> bool {
        let before = self.document.clone();
        if !mutate(&mut self.document) || self.document == before {
            self.document = before;
            return false;
        }
        let consistent = self.document.is_consistent();
        debug_assert!(consistent, "{label} left the block order inconsistent");
        if !consistent {
            log::warn!("Refused {label}: block order and block map disagree");
            self.document = before;
            return false;
        }

        self.document.touch();
        self.history.record(before);
        self.revision += 1;
        self.prune_selection();
        log::debug!("{label} committed (revision {})", self.revision);
        true
    }

    fn prune_selection(&mut self) {
        let document = &self.document;
        self.selection.retain(|id| document.contains(id));
    }

    // --- Block lifecycle ---

    /// Add a block of `kind` at `position` with a raw content payload.
    ///
    /// `overrides` are applied on top of the defaults (size, style, ...).
    /// Returns `None` when the content does not fit the kind.
    pub fn add_block(
        &mut self,
        kind: BlockKind,
        position: Position,
        content: Value,
        overrides: Option<&BlockPatch>,
    ) -> Option<BlockId> {
        let content = match BlockContent::from_value(kind, content) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("Refused add_block: {err}");
                return None;
            }
        };
        let mut block = Block::new(content, position);
        if let Some(overrides) = overrides {
            if let Err(err) = block.apply_patch(overrides) {
                log::warn!("Refused add_block overrides: {err}");
                return None;
            }
        }
        self.insert_block(block)
    }

    fn insert_block(&mut self, mut block: Block) -> Option<BlockId> {
        block.position = clamp_position(block.position);
        block.size = clamp_size(block.size, MIN_BLOCK_DIMENSION);
        block.z_index = self.document.next_z_index();
        let id = block.id.clone();
        let committed = self.commit("add_block", |doc| {
            doc.block_order.push(block.id.clone());
            doc.blocks_by_id.insert(block.id.clone(), block);
            true
        });
        committed.then_some(id)
    }

    /// Clone a block under a new id, offset by `{+10, +10}`, on top.
    ///
    /// Groups cannot be duplicated.
    pub fn duplicate_block(&mut self, id: &str) -> Option<BlockId> {
        let source = self.document.get_block(id)?;
        if source.is_group() {
            return None;
        }
        let mut copy = source.clone();
        copy.id = crate::block::new_block_id();
        copy.position = source.position + DUPLICATE_OFFSET;
        copy.children = None;
        copy.parent_id = None;
        self.insert_block(copy)
    }

    /// Remove a block and every reference to it.
    pub fn remove_block(&mut self, id: &str) -> bool {
        self.commit("remove_block", |doc| detach_block(doc, id))
    }

    /// Remove several blocks as one history entry.
    ///
    /// Locked blocks are skipped unless exactly one id is targeted.
    pub fn remove_blocks(&mut self, ids: &[BlockId]) -> bool {
        let explicit = ids.len() == 1;
        self.commit("remove_blocks", |doc| {
            let mut removed = false;
            for id in ids {
                let locked = doc.get_block(id).is_some_and(|b| b.locked);
                if locked && !explicit {
                    continue;
                }
                removed |= detach_block(doc, id);
            }
            removed
        })
    }

    // --- Geometry ---

    /// Move a block. Negative coordinates clamp to 0; a group carries its
    /// children along by the same delta.
    pub fn move_block(&mut self, id: &str, position: Position) -> bool {
        let Some(block) = self.document.get_block(id) else {
            return false;
        };
        let delta = clamp_position(position) - block.position;
        let targets = move_targets(&self.document, [id], false);
        self.commit("move_block", |doc| translate(doc, &targets, delta))
    }

    /// Move several blocks by `delta` as one history entry. Locked blocks are
    /// skipped and each block moves at most once.
    pub fn nudge_blocks(&mut self, ids: &[BlockId], delta: Vec2) -> bool {
        let targets = move_targets(&self.document, ids.iter().map(String::as_str), true);
        if targets.is_empty() {
            return false;
        }
        self.commit("nudge_blocks", |doc| translate(doc, &targets, delta))
    }

    /// Resize a block, clamping each dimension to at least 10.
    pub fn resize_block(&mut self, id: &str, size: Size) -> bool {
        let size = clamp_size(size, MIN_BLOCK_DIMENSION);
        self.commit("resize_block", |doc| match doc.get_block_mut(id) {
            Some(block) => {
                block.size = size;
                true
            }
            None => false,
        })
    }

    // --- Content and style ---

    /// Shallow-merge a style patch. A `null` value removes the key.
    pub fn restyle_block(&mut self, id: &str, patch: &StyleMap) -> bool {
        self.commit("restyle_block", |doc| {
            let Some(block) = doc.get_block_mut(id) else {
                return false;
            };
            for (key, value) in patch {
                if value.is_null() {
                    block.style.remove(key);
                } else {
                    block.style.insert(key.clone(), value.clone());
                }
            }
            true
        })
    }

    /// Replace a block's content wholesale. The content's kind must match.
    pub fn update_content(&mut self, id: &str, content: BlockContent) -> Result<bool, ContentError> {
        let Some(block) = self.document.get_block(id) else {
            return Ok(false);
        };
        if block.kind() != content.kind() {
            return Err(ContentError::KindMismatch {
                expected: block.kind(),
                found: content.kind(),
            });
        }
        Ok(self.commit("update_content", |doc| match doc.get_block_mut(id) {
            Some(block) => {
                block.content = content;
                true
            }
            None => false,
        }))
    }

    /// Shallow-merge a [`BlockPatch`] into a block.
    pub fn update_block(&mut self, id: &str, patch: &BlockPatch) -> Result<bool, ContentError> {
        let Some(block) = self.document.get_block(id) else {
            return Ok(false);
        };
        let mut updated = block.clone();
        updated.apply_patch(patch)?;
        updated.position = clamp_position(updated.position);

        if patch.position.is_some() && updated.is_group() {
            let delta = updated.position - block.position;
            let children = move_targets(&self.document, [id], false);
            return Ok(self.commit("update_block", |doc| {
                translate(doc, &children, delta);
                doc.blocks_by_id.insert(updated.id.clone(), updated);
                true
            }));
        }

        Ok(self.commit("update_block", |doc| {
            doc.blocks_by_id.insert(updated.id.clone(), updated);
            true
        }))
    }

    // --- Paint order ---

    /// Replace the paint order. Ignored unless `new_order` is a permutation of
    /// the current ids. Z-indices are reassigned from the new order.
    pub fn reorder_blocks(&mut self, new_order: &[BlockId]) -> bool {
        if !is_permutation(&self.document, new_order) {
            log::debug!("Ignored reorder_blocks: not a permutation of the block ids");
            return false;
        }
        self.commit("reorder_blocks", |doc| {
            apply_order(doc, new_order.to_vec());
            true
        })
    }

    pub fn bring_to_front(&mut self, id: &str) -> bool {
        self.shift_in_order(id, |order, pos| {
            let id = order.remove(pos);
            order.push(id);
        })
    }

    pub fn send_to_back(&mut self, id: &str) -> bool {
        self.shift_in_order(id, |order, pos| {
            let id = order.remove(pos);
            order.insert(0, id);
        })
    }

    /// Move one layer towards the front.
    pub fn bring_forward(&mut self, id: &str) -> bool {
        self.shift_in_order(id, |order, pos| {
            if pos + 1 < order.len() {
                order.swap(pos, pos + 1);
            }
        })
    }

    /// Move one layer towards the back.
    pub fn send_backward(&mut self, id: &str) -> bool {
        self.shift_in_order(id, |order, pos| {
            if pos > 0 {
                order.swap(pos, pos - 1);
            }
        })
    }

    fn shift_in_order(&mut self, id: &str, shift: impl FnOnce(&mut Vec<BlockId>, usize)) -> bool {
        let Some(pos) = self.document.block_order.iter().position(|b| b == id) else {
            return false;
        };
        let mut order = self.document.block_order.clone();
        shift(&mut order, pos);
        self.reorder_blocks(&order)
    }

    // --- Groups ---

    /// Group at least two top-level, non-group blocks.
    ///
    /// The group covers the union of the children's bounds, lists them in
    /// paint order and sits directly behind the backmost child.
    pub fn group_blocks(&mut self, ids: &[BlockId]) -> Option<BlockId> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let members: Vec<&Block> = self
            .document
            .blocks_ordered()
            .filter(|b| wanted.contains(b.id.as_str()))
            .filter(|b| !b.is_group() && b.parent_id.is_none())
            .collect();
        if members.len() < 2 {
            return None;
        }

        let bounds = members
            .iter()
            .map(|b| b.bounds())
            .reduce(|acc, r| acc.union(r))
            .unwrap_or(Rect::ZERO);
        let children: Vec<BlockId> = members.iter().map(|b| b.id.clone()).collect();

        let mut group = Block::new(BlockContent::empty(BlockKind::Group), bounds.origin());
        group.size = clamp_size(bounds.size(), MIN_BLOCK_DIMENSION);
        group.children = Some(children.clone());
        let group_id = group.id.clone();

        let committed = self.commit("group_blocks", |doc| {
            let Some(back) = doc.block_order.iter().position(|id| *id == children[0]) else {
                return false;
            };
            for child in &children {
                if let Some(block) = doc.get_block_mut(child) {
                    block.parent_id = Some(group_id.clone());
                }
            }
            let mut order = doc.block_order.clone();
            order.insert(back, group_id.clone());
            doc.blocks_by_id.insert(group_id.clone(), group);
            apply_order(doc, order);
            true
        });
        committed.then_some(group_id)
    }

    /// Dissolve a group, leaving its children in place.
    pub fn ungroup_block(&mut self, id: &str) -> bool {
        if !self.document.get_block(id).is_some_and(Block::is_group) {
            return false;
        }
        self.commit("ungroup_block", |doc| detach_block(doc, id))
    }

    // --- Document settings ---

    pub fn update_design_token(
        &mut self,
        section: TokenSection,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        let (key, value) = (key.into(), value.into());
        self.commit("update_design_token", |doc| {
            let tokens = match section {
                TokenSection::Colors => &mut doc.design_tokens.colors,
                TokenSection::Fonts => &mut doc.design_tokens.fonts,
            };
            tokens.insert(key, value);
            true
        })
    }

    /// Set the grid unit, clamped to at least 1.
    pub fn set_grid_spacing(&mut self, spacing: f64) -> bool {
        let spacing = if spacing.is_finite() { spacing.max(1.0) } else { 1.0 };
        self.commit("set_grid_spacing", |doc| {
            doc.design_tokens.spacing = spacing;
            true
        })
    }

    pub fn set_canvas_size(&mut self, size: Size) -> bool {
        let size = clamp_size(size, MIN_BLOCK_DIMENSION);
        self.commit("set_canvas_size", |doc| {
            doc.canvas = size;
            true
        })
    }

    // --- Selection ---

    /// Select a block, replacing the selection, or toggle it when `additive`.
    pub fn select_block(&mut self, id: &str, additive: bool) -> bool {
        if !self.document.contains(id) {
            return false;
        }
        if additive {
            self.selection.toggle(id.to_string());
        } else {
            self.selection.select(id.to_string());
        }
        true
    }

    /// Clear the selection, exit editing and dismiss the popover.
    pub fn clear_selection(&mut self) {
        self.selection.reset();
    }

    /// Select every block in document order.
    pub fn select_all(&mut self) {
        self.selection.select_all(self.document.block_order.iter().cloned());
    }

    /// Enter inline editing on a text-like block.
    pub fn start_editing(&mut self, id: &str) -> bool {
        match self.document.get_block(id) {
            Some(block) if block.kind().is_text_like() => {
                self.selection.enter_editing(id.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn stop_editing(&mut self) {
        self.selection.exit_editing();
    }

    pub fn open_popover(&mut self, id: &str) -> bool {
        if !self.document.contains(id) {
            return false;
        }
        self.selection.open_popover(id.to_string());
        true
    }

    pub fn dismiss_popover(&mut self) {
        self.selection.dismiss_popover();
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        if !self.history.undo(&mut self.document) {
            return false;
        }
        self.revision += 1;
        self.prune_selection();
        log::debug!("undo (revision {})", self.revision);
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.redo(&mut self.document) {
            return false;
        }
        self.revision += 1;
        self.prune_selection();
        log::debug!("redo (revision {})", self.revision);
        true
    }
}

/// Remove a block from map and order, dropping it from group child lists and
/// orphaning its own children.
fn detach_block(doc: &mut CanvasDocument, id: &str) -> bool {
    let Some(removed) = doc.blocks_by_id.remove(id) else {
        return false;
    };
    doc.block_order.retain(|b| b != id);

    for child in removed.children.iter().flatten() {
        if let Some(block) = doc.get_block_mut(child) {
            if block.parent_id.as_deref() == Some(id) {
                block.parent_id = None;
            }
        }
    }
    if let Some(parent) = removed.parent_id.as_deref().and_then(|p| doc.get_block_mut(p)) {
        if let Some(children) = parent.children.as_mut() {
            children.retain(|c| c != id);
        }
    }
    true
}

/// Ids to translate for a move of `ids`: each block plus, for groups, its
/// children, without repeats. With `skip_locked`, locked blocks stay put.
fn move_targets<'a>(
    doc: &CanvasDocument,
    ids: impl IntoIterator<Item = &'a str>,
    skip_locked: bool,
) -> Vec<BlockId> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    let mut push = |block: &Block| {
        if skip_locked && block.locked {
            return;
        }
        if seen.insert(block.id.clone()) {
            targets.push(block.id.clone());
        }
    };
    for id in ids {
        let Some(block) = doc.get_block(id) else {
            continue;
        };
        if skip_locked && block.locked {
            continue;
        }
        push(block);
        for child in block.children.iter().flatten() {
            if let Some(child) = doc.get_block(child) {
                push(child);
            }
        }
    }
    targets
}

fn translate(doc: &mut CanvasDocument, ids: &[BlockId], delta: Vec2) -> bool {
    let mut moved = false;
    for id in ids {
        if let Some(block) = doc.get_block_mut(id) {
            block.position = clamp_position(block.position + delta);
            moved = true;
        }
    }
    moved
}

fn is_permutation(doc: &CanvasDocument, order: &[BlockId]) -> bool {
    if order.len() != doc.blocks_by_id.len() {
        return false;
    }
    let mut seen = HashSet::with_capacity(order.len());
    order
        .iter()
        .all(|id| doc.blocks_by_id.contains_key(id) && seen.insert(id))
}

/// Install `order` as the paint order and renumber z-indices from it.
fn apply_order(doc: &mut CanvasDocument, order: Vec<BlockId>) {
    for (index, id) in order.iter().enumerate() {
        if let Some(block) = doc.blocks_by_id.get_mut(id) {
            block.z_index = index as i64 + 1;
        }
    }
    doc.block_order = order;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use serde_json::json;

    fn add_text(store: &mut DocumentStore, text: &str, x: f64, y: f64) -> BlockId {
        store
            .add_block(BlockKind::Text, Point::new(x, y), json!({ "text": text }), None)
            .unwrap()
    }

    fn order_matches_map(store: &DocumentStore) -> bool {
        let doc = store.document();
        let keys: HashSet<&BlockId> = doc.blocks_by_id.keys().collect();
        let order: HashSet<&BlockId> = doc.block_order.iter().collect();
        keys == order && doc.block_order.len() == order.len()
    }

    #[test]
    fn test_add_block_assigns_increasing_z() {
        let mut store = DocumentStore::default();
        let a = add_text(&mut store, "Hi", 24.0, 80.0);
        let b = add_text(&mut store, "There", 24.0, 160.0);

        let doc = store.document();
        assert_eq!(doc.len(), 2);
        assert!(doc.get_block(&b).unwrap().z_index > doc.get_block(&a).unwrap().z_index);
        assert_eq!(doc.block_order, vec![a.clone(), b]);
        assert_eq!(doc.get_block(&a).unwrap().content.as_text(), Some("Hi"));
        assert_eq!(store.revision(), 2);
        assert!(store.can_undo());
    }

    #[test]
    fn test_add_block_with_overrides() {
        let mut store = DocumentStore::default();
        let overrides = BlockPatch {
            size: Some(Size::new(200.0, 3.0)),
            locked: Some(true),
            ..Default::default()
        };
        let id = store
            .add_block(BlockKind::Divider, Point::new(-5.0, 10.0), Value::Null, Some(&overrides))
            .unwrap();
        let block = store.block(&id).unwrap();
        assert_eq!(block.size, Size::new(200.0, MIN_BLOCK_DIMENSION));
        assert_eq!(block.position, Point::new(0.0, 10.0));
        assert!(block.locked);
    }

    #[test]
    fn test_add_block_rejects_bad_content() {
        let mut store = DocumentStore::default();
        assert!(store.add_block(BlockKind::Text, Point::ZERO, json!([1]), None).is_none());
        assert!(store.document().is_empty());
        assert!(!store.can_undo());
    }

    #[test]
    fn test_undo_redo_restores_documents() {
        let mut store = DocumentStore::default();
        let id = add_text(&mut store, "Hi", 0.0, 0.0);
        let before_move = store.document().clone();

        assert!(store.move_block(&id, Point::new(40.0, 40.0)));
        let after_move = store.document().clone();

        assert!(store.undo());
        assert_eq!(store.document(), &before_move);
        assert!(store.redo());
        assert_eq!(store.document(), &after_move);
        assert_eq!(store.revision(), 4);
    }

    #[test]
    fn test_noop_mutations_skip_history() {
        let mut store = DocumentStore::default();
        let id = add_text(&mut store, "Hi", 8.0, 8.0);
        let undo_len = store.history().undo_len();

        assert!(!store.move_block("missing", Point::new(1.0, 1.0)));
        assert!(!store.move_block(&id, Point::new(8.0, 8.0)));
        assert!(!store.resize_block("missing", Size::new(50.0, 50.0)));
        assert!(!store.remove_block("missing"));
        assert_eq!(store.history().undo_len(), undo_len);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_new_mutation_clears_redo() {
        let mut store = DocumentStore::default();
        let id = add_text(&mut store, "Hi", 0.0, 0.0);
        store.move_block(&id, Point::new(10.0, 0.0));
        store.undo();
        assert!(store.can_redo());
        store.resize_block(&id, Size::new(100.0, 100.0));
        assert!(!store.can_redo());
    }

    #[test]
    fn test_remove_block_while_editing() {
        let mut store = DocumentStore::default();
        let id = add_text(&mut store, "Hi", 0.0, 0.0);
        let other = add_text(&mut store, "Other", 0.0, 100.0);
        store.select_block(&other, false);
        store.select_block(&id, true);
        assert!(store.start_editing(&id));
        assert!(store.open_popover(&id));

        assert!(store.remove_block(&id));
        assert_eq!(store.selection().editing(), None);
        assert_eq!(store.selection().popover(), None);
        assert!(!store.selection().is_selected(&id));
        assert!(store.selection().is_selected(&other));
        assert!(order_matches_map(&store));
    }

    #[test]
    fn test_undo_prunes_selection() {
        let mut store = DocumentStore::default();
        let id = add_text(&mut store, "Hi", 0.0, 0.0);
        store.select_block(&id, false);
        store.start_editing(&id);
        store.undo();
        assert!(store.selection().is_empty());
        assert_eq!(store.selection().editing(), None);
    }

    #[test]
    fn test_order_invariant_over_add_remove() {
        let mut store = DocumentStore::default();
        let mut ids = Vec::new();
        for i in 0..12 {
            ids.push(add_text(&mut store, "x", i as f64 * 10.0, 0.0));
            if i % 3 == 2 {
                let victim = ids.remove(i / 3);
                assert!(store.remove_block(&victim));
            }
            assert!(order_matches_map(&store));
        }
        while store.undo() {
            assert!(order_matches_map(&store));
        }
        assert!(store.document().is_empty());
    }

    #[test]
    fn test_move_clamps_negative() {
        let mut store = DocumentStore::default();
        let id = add_text(&mut store, "Hi", 30.0, 30.0);
        store.move_block(&id, Point::new(-20.0, 5.0));
        assert_eq!(store.block(&id).unwrap().position, Point::new(0.0, 5.0));
    }

    #[test]
    fn test_resize_clamps_minimum() {
        let mut store = DocumentStore::default();
        let id = add_text(&mut store, "Hi", 0.0, 0.0);
        store.resize_block(&id, Size::new(3.0, -1.0));
        assert_eq!(store.block(&id).unwrap().size, Size::new(10.0, 10.0));
    }

    #[test]
    fn test_restyle_merges_and_removes() {
        let mut store = DocumentStore::default();
        let id = add_text(&mut store, "Hi", 0.0, 0.0);
        let mut patch = StyleMap::new();
        patch.insert("fontSize".into(), json!(24));
        patch.insert("color".into(), json!("#333"));
        assert!(store.restyle_block(&id, &patch));

        let mut patch = StyleMap::new();
        patch.insert("color".into(), Value::Null);
        assert!(store.restyle_block(&id, &patch));

        let block = store.block(&id).unwrap();
        assert_eq!(block.style_number("fontSize"), Some(24.0));
        assert!(!block.style.contains_key("color"));
    }

    #[test]
    fn test_update_content_kind_mismatch() {
        let mut store = DocumentStore::default();
        let id = add_text(&mut store, "Hi", 0.0, 0.0);
        let err = store
            .update_content(&id, BlockContent::image("a.png", ""))
            .unwrap_err();
        assert!(matches!(err, ContentError::KindMismatch { .. }));

        assert!(store.update_content(&id, BlockContent::text("Hello")).unwrap());
        assert_eq!(store.block(&id).unwrap().content.as_text(), Some("Hello"));
    }

    #[test]
    fn test_update_block_patch() {
        let mut store = DocumentStore::default();
        let id = add_text(&mut store, "Hi", 0.0, 0.0);
        let patch = BlockPatch {
            content: Some(json!({"text": "Suggested"})),
            section_id: Some(Some("hero".into())),
            ..Default::default()
        };
        assert!(store.update_block(&id, &patch).unwrap());
        let block = store.block(&id).unwrap();
        assert_eq!(block.content.as_text(), Some("Suggested"));
        assert_eq!(block.section_id.as_deref(), Some("hero"));

        let bad = BlockPatch::default().with_content(json!("nope"));
        assert!(store.update_block(&id, &bad).is_err());
        assert!(!store.update_block("missing", &patch).unwrap());
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let mut store = DocumentStore::default();
        let a = add_text(&mut store, "a", 0.0, 0.0);
        let b = add_text(&mut store, "b", 0.0, 0.0);
        let c = add_text(&mut store, "c", 0.0, 0.0);

        assert!(!store.reorder_blocks(&[a.clone(), b.clone()]));
        assert!(!store.reorder_blocks(&[a.clone(), a.clone(), b.clone()]));
        assert!(!store.reorder_blocks(&[a.clone(), b.clone(), "zzz".into()]));

        assert!(store.reorder_blocks(&[c.clone(), a.clone(), b.clone()]));
        let doc = store.document();
        assert_eq!(doc.block_order, vec![c.clone(), a.clone(), b.clone()]);
        assert_eq!(doc.get_block(&c).unwrap().z_index, 1);
        assert_eq!(doc.get_block(&b).unwrap().z_index, 3);
    }

    #[test]
    fn test_z_order_operations() {
        let mut store = DocumentStore::default();
        let a = add_text(&mut store, "a", 0.0, 0.0);
        let b = add_text(&mut store, "b", 0.0, 0.0);
        let c = add_text(&mut store, "c", 0.0, 0.0);

        assert!(store.bring_to_front(&a));
        assert_eq!(store.document().block_order, vec![b.clone(), c.clone(), a.clone()]);
        assert!(!store.bring_forward(&a));
        assert!(store.send_backward(&a));
        assert_eq!(store.document().block_order, vec![b.clone(), a.clone(), c.clone()]);
        assert!(store.send_to_back(&c));
        assert_eq!(store.document().block_order, vec![c.clone(), b.clone(), a.clone()]);
        assert!(!store.send_backward(&c));
    }

    #[test]
    fn test_duplicate_block() {
        let mut store = DocumentStore::default();
        let a = add_text(&mut store, "a", 20.0, 30.0);
        let copy = store.duplicate_block(&a).unwrap();
        assert_ne!(copy, a);
        let doc = store.document();
        let (orig, dup) = (doc.get_block(&a).unwrap(), doc.get_block(&copy).unwrap());
        assert_eq!(dup.position, Point::new(30.0, 40.0));
        assert_eq!(dup.content, orig.content);
        assert!(dup.z_index > orig.z_index);
        assert_eq!(doc.block_order.last(), Some(&copy));
    }

    #[test]
    fn test_nudge_skips_locked_single_entry() {
        let mut store = DocumentStore::default();
        let a = add_text(&mut store, "a", 10.0, 10.0);
        let b = add_text(&mut store, "b", 50.0, 10.0);
        store
            .update_block(&b, &BlockPatch::default().with_locked(true))
            .unwrap();
        let undo_len = store.history().undo_len();

        assert!(store.nudge_blocks(&[a.clone(), b.clone()], Vec2::new(8.0, 0.0)));
        assert_eq!(store.block(&a).unwrap().position, Point::new(18.0, 10.0));
        assert_eq!(store.block(&b).unwrap().position, Point::new(50.0, 10.0));
        assert_eq!(store.history().undo_len(), undo_len + 1);

        assert!(!store.nudge_blocks(&[b], Vec2::new(8.0, 0.0)));
    }

    #[test]
    fn test_remove_blocks_locked_rules() {
        let mut store = DocumentStore::default();
        let a = add_text(&mut store, "a", 0.0, 0.0);
        let b = add_text(&mut store, "b", 0.0, 0.0);
        store
            .update_block(&b, &BlockPatch::default().with_locked(true))
            .unwrap();

        assert!(store.remove_blocks(&[a.clone(), b.clone()]));
        assert!(!store.document().contains(&a));
        assert!(store.document().contains(&b));

        assert!(store.remove_blocks(&[b.clone()]));
        assert!(store.document().is_empty());
    }

    #[test]
    fn test_group_moves_children() {
        let mut store = DocumentStore::default();
        let a = add_text(&mut store, "a", 10.0, 10.0);
        let b = add_text(&mut store, "b", 100.0, 200.0);
        let group = store.group_blocks(&[b.clone(), a.clone()]).unwrap();

        let doc = store.document();
        let g = doc.get_block(&group).unwrap();
        assert_eq!(g.position, Point::new(10.0, 10.0));
        assert_eq!(g.children.as_deref(), Some(&[a.clone(), b.clone()][..]));
        assert_eq!(doc.get_block(&a).unwrap().parent_id.as_deref(), Some(group.as_str()));
        assert_eq!(doc.block_order[0], group);
        assert!(g.z_index < doc.get_block(&a).unwrap().z_index);

        let undo_len = store.history().undo_len();
        assert!(store.move_block(&group, Point::new(20.0, 30.0)));
        assert_eq!(store.history().undo_len(), undo_len + 1);
        assert_eq!(store.block(&a).unwrap().position, Point::new(20.0, 30.0));
        assert_eq!(store.block(&b).unwrap().position, Point::new(110.0, 220.0));
    }

    #[test]
    fn test_ungroup_and_remove_group_member() {
        let mut store = DocumentStore::default();
        let a = add_text(&mut store, "a", 0.0, 0.0);
        let b = add_text(&mut store, "b", 0.0, 100.0);
        let c = add_text(&mut store, "c", 0.0, 200.0);
        let group = store.group_blocks(&[a.clone(), b.clone(), c.clone()]).unwrap();

        assert!(store.remove_block(&b));
        let children = store.block(&group).unwrap().children.clone().unwrap();
        assert_eq!(children, vec![a.clone(), c.clone()]);

        assert!(!store.ungroup_block(&a));
        assert!(store.ungroup_block(&group));
        assert!(!store.document().contains(&group));
        assert_eq!(store.block(&a).unwrap().parent_id, None);
        assert!(order_matches_map(&store));
    }

    #[test]
    fn test_group_needs_two_members() {
        let mut store = DocumentStore::default();
        let a = add_text(&mut store, "a", 0.0, 0.0);
        assert!(store.group_blocks(&[a.clone(), "missing".into()]).is_none());
        assert!(store.duplicate_block("missing").is_none());
    }

    #[test]
    fn test_grid_spacing_and_tokens() {
        let mut store = DocumentStore::default();
        assert!(store.set_grid_spacing(0.25));
        assert_eq!(store.document().grid_spacing(), 1.0);
        assert!(!store.set_grid_spacing(-3.0));

        assert!(store.update_design_token(TokenSection::Colors, "primary", "#aa3355"));
        assert!(!store.update_design_token(TokenSection::Colors, "primary", "#aa3355"));
        assert_eq!(
            store.document().design_tokens.colors.get("primary").map(String::as_str),
            Some("#aa3355")
        );
    }

    #[test]
    fn test_selection_does_not_enter_history() {
        let mut store = DocumentStore::default();
        let a = add_text(&mut store, "a", 0.0, 0.0);
        let img = store
            .add_block(BlockKind::Image, Point::ZERO, json!({"src": "a.png"}), None)
            .unwrap();
        let revision = store.revision();

        store.select_all();
        assert_eq!(store.selection().selected(), [a.as_str(), img.as_str()]);
        assert!(!store.start_editing(&img));
        assert!(store.start_editing(&a));
        store.clear_selection();
        assert!(!store.select_block("missing", false));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_history_limit_is_configurable() {
        let mut store = DocumentStore::with_history_limit(CanvasDocument::new(), 3);
        for i in 0..5 {
            add_text(&mut store, "x", i as f64, 0.0);
        }
        assert_eq!(store.history().undo_len(), 3);
    }
}
