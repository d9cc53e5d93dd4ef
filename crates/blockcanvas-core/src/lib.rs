//! BlockCanvas Core Library
//!
//! Headless direct-manipulation canvas engine: the block/document model,
//! drag and resize controllers with snap guides, selection and inline
//! editing, undo/redo history and debounced two-tier auto-save.

pub mod block;
pub mod config;
pub mod document;
pub mod drag;
pub mod geometry;
pub mod history;
pub mod input;
pub mod keyboard;
pub mod resize;
pub mod selection;
pub mod session;
pub mod snap;
pub mod storage;
pub mod store;

pub use block::{Block, BlockContent, BlockId, BlockKind, BlockPatch, ContentError, StyleMap};
pub use config::EditorConfig;
pub use document::{CanvasDocument, DesignTokens, TokenSection};
pub use drag::{DragCommit, DragController, DragPreview, DragResponse, ScrollViewport, SnapContext};
pub use geometry::{Point, Position, Rect, Size, Vec2};
pub use history::History;
pub use input::{Key, KeyEvent, Modifiers, MouseButton, PointerEvent, PointerKind};
pub use keyboard::{FocusTarget, KeyAction, KeyboardController, Shortcut, ShortcutRegistry};
pub use resize::{ResizeController, ResizeStart};
pub use selection::{BlockState, SelectionState};
pub use session::{ContentSuggester, EditorSession, PointerResponse};
pub use snap::{GuideAxis, GuideLine, SNAP_THRESHOLD, SnapOutcome, snap_position, snap_to_grid};
pub use storage::{
    AutoSave, AutoSaveConfig, FileStorage, MemoryRemote, MemoryStorage, RemoteStore, SaveState,
    SaveStatus, Storage, StorageError,
};
pub use store::DocumentStore;
