//! Host-facing editor session.
//!
//! [`EditorSession`] wires the store to the per-block drag controllers, the
//! active resize, the keyboard controller and the auto-save pipeline. The
//! host feeds it clicks, pointer samples, key events and animation frames;
//! every committed mutation is forwarded to auto-save.

use crate::block::{Block, BlockId, BlockPatch, ContentError};
use crate::config::EditorConfig;
use crate::document::CanvasDocument;
use crate::drag::{DragController, DragPreview, ScrollViewport, SnapContext};
use crate::geometry::{Position, Size};
use crate::input::{KeyEvent, Modifiers, PointerEvent};
use crate::keyboard::{FocusTarget, KeyboardController};
use crate::resize::{HANDLE_TOLERANCE, ResizeController, hit_test_handle};
use crate::selection::SelectionState;
use crate::snap::GuideLine;
use crate::storage::{AutoSave, RemoteStore, SaveState, Storage, StorageResult, restore};
use crate::store::DocumentStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Produces a suggested edit for a block. The session applies the returned
/// patch as an ordinary `update_block`.
pub trait ContentSuggester {
    fn suggest(&self, block: &Block) -> BlockPatch;
}

impl<F> ContentSuggester for F
where
    F: Fn(&Block) -> BlockPatch,
{
    fn suggest(&self, block: &Block) -> BlockPatch {
        self(block)
    }
}

/// What the host should do after a pointer event on a block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerResponse {
    pub capture: bool,
    pub release: bool,
    /// Keep the press away from other handlers (resize handle presses).
    pub stop_propagation: bool,
    pub autoscroll: Option<f64>,
    /// Live size while resizing; emitted on every move.
    pub resize_preview: Option<Size>,
    /// The gesture ended with a store mutation.
    pub committed: bool,
}

/// One editing session over a single document.
pub struct EditorSession {
    store: DocumentStore,
    config: EditorConfig,
    keyboard: KeyboardController,
    drags: BTreeMap<BlockId, DragController>,
    resize: Option<(BlockId, ResizeController)>,
    autosave: Option<AutoSave>,
    notified_revision: u64,
    guides: Vec<GuideLine>,
}

impl EditorSession {
    pub fn new(document: CanvasDocument, config: EditorConfig) -> Self {
        let store = DocumentStore::with_history_limit(document, config.history_limit);
        Self {
            notified_revision: store.revision(),
            keyboard: config.keyboard(),
            store,
            config,
            drags: BTreeMap::new(),
            resize: None,
            autosave: None,
            guides: Vec::new(),
        }
    }

    /// Restore `document_id` from the local tier (or start an empty document
    /// under that id) and attach an auto-save pipeline to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn open(
        document_id: &str,
        config: EditorConfig,
        storage: Arc<dyn Storage>,
        remote: Option<Arc<dyn RemoteStore>>,
        credential: Option<String>,
    ) -> StorageResult<Self> {
        let document = match restore(storage.as_ref(), document_id).await? {
            Some(document) => {
                log::info!("Restored document {document_id} ({} blocks)", document.len());
                document
            }
            None => {
                let mut document = CanvasDocument::new();
                document.id = document_id.to_string();
                document
            }
        };
        let mut autosave = config.autosave(document_id);
        autosave.credential = credential;
        let autosave = AutoSave::spawn(autosave, storage, remote);
        Ok(Self::new(document, config).with_autosave(autosave))
    }

    /// Attach an auto-save pipeline. Only changes made after this point are
    /// reported to it.
    pub fn with_autosave(mut self, autosave: AutoSave) -> Self {
        if autosave.document_id() != self.store.document().id {
            log::warn!(
                "Auto-save keyed as {} for document {}",
                autosave.document_id(),
                self.store.document().id
            );
        }
        self.autosave = Some(autosave);
        self.notified_revision = self.store.revision();
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn document(&self) -> &CanvasDocument {
        self.store.document()
    }

    pub fn selection(&self) -> &SelectionState {
        self.store.selection()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn autosave(&self) -> Option<&AutoSave> {
        self.autosave.as_ref()
    }

    pub fn save_state(&self) -> Option<SaveState> {
        self.autosave.as_ref().map(AutoSave::status)
    }

    /// Guide lines from the latest drag preview.
    pub fn guides(&self) -> &[GuideLine] {
        &self.guides
    }

    /// Run `f` against the store, then forward any committed change.
    pub fn mutate<R>(&mut self, f: impl FnOnce(&mut DocumentStore) -> R) -> R {
        let result = f(&mut self.store);
        self.sync();
        result
    }

    fn sync(&mut self) {
        let revision = self.store.revision();
        if revision == self.notified_revision {
            return;
        }
        self.notified_revision = revision;

        let document = self.store.document();
        self.drags.retain(|id, _| document.contains(id));
        if self
            .resize
            .as_ref()
            .is_some_and(|(id, _)| !document.contains(id))
        {
            self.resize = None;
        }
        if let Some(autosave) = &self.autosave {
            autosave.document_changed(document);
        }
    }

    // --- Clicks ---

    /// Click on a block: select it, or toggle it with shift.
    pub fn click_block(&mut self, id: &str, modifiers: Modifiers) -> bool {
        if !self.store.document().contains(id) {
            return false;
        }
        if self
            .store
            .selection()
            .editing()
            .is_some_and(|editing| editing != id)
        {
            self.store.stop_editing();
        }
        self.store.select_block(id, modifiers.shift)
    }

    /// Double-click: text-like blocks enter inline editing, others are
    /// selected.
    pub fn double_click_block(&mut self, id: &str) -> bool {
        self.store.start_editing(id) || self.store.select_block(id, false)
    }

    /// Click on empty canvas.
    pub fn click_canvas(&mut self) {
        self.store.clear_selection();
    }

    pub fn open_popover(&mut self, id: &str) -> bool {
        self.store.open_popover(id)
    }

    pub fn dismiss_popover(&mut self) {
        self.store.dismiss_popover();
    }

    // --- Pointer gestures ---

    /// Press on a block. A press on the resize handle of a selected block
    /// starts a resize; any other press goes to the block's drag controller.
    /// Locked blocks ignore presses. A primary press first drops any gesture
    /// left over from a release that never arrived.
    pub fn pointer_down(&mut self, id: &str, event: &PointerEvent) -> PointerResponse {
        if !event.button.is_primary() {
            return PointerResponse::default();
        }
        let stale = self.abandon_gestures();
        let Some(block) = self.store.block(id) else {
            return PointerResponse {
                release: stale,
                ..PointerResponse::default()
            };
        };
        if block.locked {
            return PointerResponse {
                release: stale,
                ..PointerResponse::default()
            };
        }
        let (origin, size, bounds) = (block.position, block.size, block.bounds());

        if self.store.selection().is_selected(id)
            && hit_test_handle(bounds, event.position, HANDLE_TOLERANCE)
        {
            let mut resize = ResizeController::new(self.config.min_resize);
            let start = resize.pointer_down(event, size);
            if start.capture {
                self.resize = Some((id.to_string(), resize));
            }
            return PointerResponse {
                capture: start.capture,
                release: stale,
                stop_propagation: start.stop_propagation,
                ..PointerResponse::default()
            };
        }

        let settings = self.config.drag_settings();
        let drag = self
            .drags
            .entry(id.to_string())
            .or_insert_with(|| DragController::new(settings));
        let response = drag.pointer_down(event, origin, size);
        PointerResponse {
            capture: response.capture,
            release: stale || response.release,
            ..PointerResponse::default()
        }
    }

    /// Drop every tracked press and resize without committing. Returns true
    /// if any of them held the pointer capture.
    fn abandon_gestures(&mut self) -> bool {
        let mut captured = self.resize.take().is_some();
        for drag in self.drags.values_mut() {
            captured |= drag.abandon();
        }
        if captured {
            self.guides.clear();
        }
        captured
    }

    pub fn pointer_move(
        &mut self,
        id: &str,
        event: &PointerEvent,
        viewport: Option<ScrollViewport>,
    ) -> PointerResponse {
        if let Some((resizing, resize)) = &mut self.resize {
            if resizing.as_str() == id {
                return PointerResponse {
                    resize_preview: resize.pointer_move(event),
                    ..PointerResponse::default()
                };
            }
        }

        let ctx = self.snap_context(id);
        let Some(drag) = self.drags.get_mut(id) else {
            return PointerResponse::default();
        };
        let response = drag.pointer_move(event, &ctx, viewport);
        PointerResponse {
            capture: response.capture,
            release: response.release,
            autoscroll: response.autoscroll,
            ..PointerResponse::default()
        }
    }

    /// Release. Commits the gesture's final value into the store.
    pub fn pointer_up(&mut self, id: &str, event: &PointerEvent) -> PointerResponse {
        if self.resize.as_ref().is_some_and(|(r, _)| r == id) {
            let size = self
                .resize
                .take()
                .and_then(|(_, mut resize)| resize.pointer_up(event));
            return self.commit_resize(id, size);
        }

        let ctx = self.snap_context(id);
        let Some(drag) = self.drags.get_mut(id) else {
            return PointerResponse::default();
        };
        let response = drag.pointer_up(event, &ctx);
        self.finish_drag(id, response.release, response.commit.map(|c| c.position))
    }

    pub fn pointer_cancel(&mut self, id: &str) -> PointerResponse {
        if self.resize.as_ref().is_some_and(|(r, _)| r == id) {
            let size = self
                .resize
                .take()
                .and_then(|(_, mut resize)| resize.pointer_cancel());
            return self.commit_resize(id, size);
        }

        let ctx = self.snap_context(id);
        let Some(drag) = self.drags.get_mut(id) else {
            return PointerResponse::default();
        };
        let response = drag.pointer_cancel(&ctx);
        self.finish_drag(id, response.release, response.commit.map(|c| c.position))
    }

    fn commit_resize(&mut self, id: &str, size: Option<Size>) -> PointerResponse {
        let committed = size.is_some_and(|size| self.mutate(|store| store.resize_block(id, size)));
        PointerResponse {
            release: true,
            committed,
            ..PointerResponse::default()
        }
    }

    fn finish_drag(
        &mut self,
        id: &str,
        release: bool,
        position: Option<Position>,
    ) -> PointerResponse {
        self.guides.clear();
        let committed =
            position.is_some_and(|position| self.mutate(|store| store.move_block(id, position)));
        PointerResponse {
            release: release || position.is_some(),
            committed,
            ..PointerResponse::default()
        }
    }

    /// Snap inputs read from the current document.
    fn snap_context(&self, id: &str) -> SnapContext {
        let document = self.store.document();
        SnapContext {
            siblings: document.sibling_bounds(&document.linked_ids(id)),
            grid_size: document.grid_spacing(),
            threshold: self.config.snap_threshold,
        }
    }

    /// Collect at most one preview per dragged block for this frame.
    pub fn animation_frame(&mut self) -> Vec<(BlockId, DragPreview)> {
        let previews: Vec<(BlockId, DragPreview)> = self
            .drags
            .iter_mut()
            .filter_map(|(id, drag)| drag.on_animation_frame().map(|p| (id.clone(), p)))
            .collect();
        if !previews.is_empty() {
            self.guides = previews
                .iter()
                .flat_map(|(_, preview)| preview.guides.iter().copied())
                .collect();
        }
        previews
    }

    /// Advance long-press timers. Returns the blocks whose drag activated.
    pub fn tick(&mut self, now: Instant) -> Vec<BlockId> {
        self.drags
            .iter_mut()
            .filter_map(|(id, drag)| drag.tick(now).then(|| id.clone()))
            .collect()
    }

    // --- Keyboard ---

    /// Returns true when the event was consumed.
    pub fn handle_key(&mut self, event: &KeyEvent, focus: FocusTarget) -> bool {
        let keyboard = self.keyboard;
        self.mutate(|store| keyboard.handle(event, focus, store))
    }

    // --- Suggestions ---

    /// Ask `suggester` for an edit of block `id` and apply it.
    pub fn apply_suggestion(
        &mut self,
        id: &str,
        suggester: &dyn ContentSuggester,
    ) -> Result<bool, ContentError> {
        let Some(block) = self.store.block(id) else {
            return Ok(false);
        };
        let patch = suggester.suggest(block);
        if patch.is_empty() {
            return Ok(false);
        }
        self.mutate(|store| store.update_block(id, &patch))
    }

    // --- Persistence ---

    /// Save the current document without waiting for the debounce.
    pub fn save_now(&mut self) {
        if let Some(autosave) = &self.autosave {
            autosave.save_now(self.store.document());
        }
    }

    pub fn set_credential(&self, credential: Option<String>) {
        if let Some(autosave) = &self.autosave {
            autosave.set_credential(credential);
        }
    }

    /// Save outstanding changes and wait for the pipeline to go idle.
    pub async fn flush(&self) -> Option<SaveState> {
        match &self.autosave {
            Some(autosave) => Some(autosave.flush().await),
            None => None,
        }
    }

    /// Flush and stop auto-save, returning the final document.
    pub async fn close(mut self) -> (CanvasDocument, Option<SaveState>) {
        let state = match self.autosave.take() {
            Some(autosave) => Some(autosave.shutdown().await),
            None => None,
        };
        (self.store.document().clone(), state)
    }
}
