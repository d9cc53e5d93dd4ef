//! Scripted editing sessions.
//!
//! A script is a JSON file `{ "document"?: ..., "commands": [...] }`. Each
//! command is tagged by `op`. Blocks created by `add` can be given a `name`
//! that later commands use in place of the generated id.

use anyhow::{Context, Result, anyhow, bail};
use blockcanvas_core::{
    BlockId, BlockKind, BlockPatch, CanvasDocument, EditorSession, FocusTarget, KeyEvent,
    Modifiers, PointerEvent, Position, Size, StyleMap, TokenSection, Vec2,
};
use kurbo::Point;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Pointer samples fed between press and release of a scripted drag.
const DRAG_STEPS: u32 = 4;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Seed document. Without one the last local document is restored.
    #[serde(default)]
    pub document: Option<CanvasDocument>,
    pub commands: Vec<SessionCommand>,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid script")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum SessionCommand {
    Add {
        #[serde(rename = "type")]
        kind: BlockKind,
        x: f64,
        y: f64,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        overrides: Option<BlockPatch>,
        #[serde(default)]
        name: Option<String>,
    },
    Remove {
        block: String,
    },
    Duplicate {
        block: String,
        #[serde(default)]
        name: Option<String>,
    },
    Move {
        block: String,
        x: f64,
        y: f64,
    },
    Resize {
        block: String,
        width: f64,
        height: f64,
    },
    Restyle {
        block: String,
        style: StyleMap,
    },
    Content {
        block: String,
        content: Value,
    },
    Update {
        block: String,
        patch: BlockPatch,
    },
    Front {
        block: String,
    },
    Back {
        block: String,
    },
    Group {
        blocks: Vec<String>,
        #[serde(default)]
        name: Option<String>,
    },
    Ungroup {
        block: String,
    },
    Token {
        section: TokenSection,
        key: String,
        value: String,
    },
    Grid {
        spacing: f64,
    },
    Select {
        block: String,
        #[serde(default)]
        additive: bool,
    },
    Click {
        block: String,
        #[serde(default)]
        shift: bool,
    },
    ClickCanvas,
    DoubleClick {
        block: String,
    },
    /// Press at the block's center, move by `(dx, dy)`, release.
    Drag {
        block: String,
        dx: f64,
        dy: f64,
        #[serde(default)]
        shift: bool,
    },
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
        /// Deliver while a text field has focus.
        #[serde(default)]
        text_focus: bool,
    },
    Undo,
    Redo,
    SaveNow,
    Wait {
        ms: u64,
    },
}

/// Applies commands to a session, tracking block names.
#[derive(Debug, Default)]
pub struct Replayer {
    names: HashMap<String, BlockId>,
}

impl Replayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name given to `id` in the script, if any.
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, block)| block.as_str() == id)
            .map(|(name, _)| name.as_str())
    }

    fn resolve(&self, session: &EditorSession, block: &str) -> Result<BlockId> {
        if let Some(id) = self.names.get(block) {
            return Ok(id.clone());
        }
        if session.document().contains(block) {
            return Ok(block.to_string());
        }
        Err(anyhow!("unknown block `{block}`"))
    }

    fn remember(&mut self, name: Option<String>, id: Option<BlockId>) -> Result<()> {
        let id = id.ok_or_else(|| anyhow!("command was refused"))?;
        if let Some(name) = name {
            self.names.insert(name, id);
        }
        Ok(())
    }

    pub async fn run(&mut self, session: &mut EditorSession, command: SessionCommand) -> Result<()> {
        log::debug!("Replaying {command:?}");
        match command {
            SessionCommand::Add {
                kind,
                x,
                y,
                content,
                overrides,
                name,
            } => {
                let id = session.mutate(|s| s.add_block(kind, Position::new(x, y), content, overrides.as_ref()));
                self.remember(name, id)?;
            }
            SessionCommand::Remove { block } => {
                let id = self.resolve(session, &block)?;
                session.mutate(|s| s.remove_block(&id));
            }
            SessionCommand::Duplicate { block, name } => {
                let id = self.resolve(session, &block)?;
                let copy = session.mutate(|s| s.duplicate_block(&id));
                self.remember(name, copy)?;
            }
            SessionCommand::Move { block, x, y } => {
                let id = self.resolve(session, &block)?;
                session.mutate(|s| s.move_block(&id, Position::new(x, y)));
            }
            SessionCommand::Resize { block, width, height } => {
                let id = self.resolve(session, &block)?;
                session.mutate(|s| s.resize_block(&id, Size::new(width, height)));
            }
            SessionCommand::Restyle { block, style } => {
                let id = self.resolve(session, &block)?;
                session.mutate(|s| s.restyle_block(&id, &style));
            }
            SessionCommand::Content { block, content } => {
                let id = self.resolve(session, &block)?;
                let patch = BlockPatch::default().with_content(content);
                session
                    .mutate(|s| s.update_block(&id, &patch))
                    .with_context(|| format!("content rejected for `{block}`"))?;
            }
            SessionCommand::Update { block, patch } => {
                let id = self.resolve(session, &block)?;
                session
                    .mutate(|s| s.update_block(&id, &patch))
                    .with_context(|| format!("patch rejected for `{block}`"))?;
            }
            SessionCommand::Front { block } => {
                let id = self.resolve(session, &block)?;
                session.mutate(|s| s.bring_to_front(&id));
            }
            SessionCommand::Back { block } => {
                let id = self.resolve(session, &block)?;
                session.mutate(|s| s.send_to_back(&id));
            }
            SessionCommand::Group { blocks, name } => {
                let ids = blocks
                    .iter()
                    .map(|b| self.resolve(session, b))
                    .collect::<Result<Vec<_>>>()?;
                let group = session.mutate(|s| s.group_blocks(&ids));
                self.remember(name, group)?;
            }
            SessionCommand::Ungroup { block } => {
                let id = self.resolve(session, &block)?;
                session.mutate(|s| s.ungroup_block(&id));
            }
            SessionCommand::Token { section, key, value } => {
                session.mutate(|s| s.update_design_token(section, key, value));
            }
            SessionCommand::Grid { spacing } => {
                session.mutate(|s| s.set_grid_spacing(spacing));
            }
            SessionCommand::Select { block, additive } => {
                let id = self.resolve(session, &block)?;
                session.mutate(|s| s.select_block(&id, additive));
            }
            SessionCommand::Click { block, shift } => {
                let id = self.resolve(session, &block)?;
                let modifiers = if shift { Modifiers::shift() } else { Modifiers::NONE };
                session.click_block(&id, modifiers);
            }
            SessionCommand::ClickCanvas => session.click_canvas(),
            SessionCommand::DoubleClick { block } => {
                let id = self.resolve(session, &block)?;
                session.double_click_block(&id);
            }
            SessionCommand::Drag { block, dx, dy, shift } => {
                let id = self.resolve(session, &block)?;
                drag(session, &id, Vec2::new(dx, dy), shift)?;
            }
            SessionCommand::Key {
                key,
                modifiers,
                text_focus,
            } => {
                let focus = if text_focus {
                    FocusTarget::TextInput
                } else {
                    FocusTarget::Canvas
                };
                let consumed = session.handle_key(&KeyEvent::new(key.as_str(), modifiers), focus);
                log::debug!("Key {key} consumed: {consumed}");
            }
            SessionCommand::Undo => {
                session.mutate(|s| s.undo());
            }
            SessionCommand::Redo => {
                session.mutate(|s| s.redo());
            }
            SessionCommand::SaveNow => session.save_now(),
            SessionCommand::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
        Ok(())
    }
}

fn drag(session: &mut EditorSession, id: &str, delta: Vec2, shift: bool) -> Result<()> {
    let Some(block) = session.document().get_block(id) else {
        bail!("unknown block `{id}`");
    };
    let start = block.bounds().center();
    let modifiers = if shift { Modifiers::shift() } else { Modifiers::NONE };
    let press = PointerEvent::mouse(start).with_modifiers(modifiers);

    session.pointer_down(id, &press);
    for step in 1..=DRAG_STEPS {
        let at: Point = start + delta * (f64::from(step) / f64::from(DRAG_STEPS));
        session.pointer_move(id, &press.at(at), None);
        session.animation_frame();
    }
    let response = session.pointer_up(id, &press.at(start + delta));
    if !response.committed {
        log::info!("Drag of {id} did not move it");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockcanvas_core::{EditorConfig, MemoryStorage, SaveStatus};
    use std::sync::Arc;

    const SCRIPT: &str = r##"{
        "commands": [
            { "op": "add", "type": "heading", "x": 24, "y": 40, "content": { "text": "Our day" }, "name": "title" },
            { "op": "add", "type": "image", "x": 24, "y": 200, "content": { "src": "a.jpg" }, "name": "photo" },
            { "op": "click", "block": "title" },
            { "op": "click", "block": "photo", "shift": true },
            { "op": "key", "key": "ArrowDown" },
            { "op": "drag", "block": "photo", "dx": 100, "dy": 0, "shift": true },
            { "op": "content", "block": "title", "content": { "text": "Our big day" } },
            { "op": "token", "section": "colors", "key": "accent", "value": "#c0392b" },
            { "op": "wait", "ms": 2000 }
        ]
    }"##;

    #[tokio::test(start_paused = true)]
    async fn test_replay_script() {
        let script = Script::from_json(SCRIPT).unwrap();
        let storage = Arc::new(MemoryStorage::new());
        let mut session = EditorSession::open("wedding", EditorConfig::default(), storage, None, None)
            .await
            .unwrap();
        let mut replayer = Replayer::new();
        for command in script.commands {
            replayer.run(&mut session, command).await.unwrap();
        }

        let doc = session.document();
        let title = doc.get_block(replayer.names.get("title").unwrap()).unwrap();
        let photo = doc.get_block(replayer.names.get("photo").unwrap()).unwrap();
        assert_eq!(title.position, Position::new(24.0, 48.0));
        assert_eq!(photo.position, Position::new(124.0, 208.0));
        assert_eq!(title.content.as_text(), Some("Our big day"));
        assert_eq!(doc.design_tokens.colors.get("accent").map(String::as_str), Some("#c0392b"));
        assert_eq!(replayer.name_of(&photo.id), Some("photo"));
        assert_eq!(session.save_state().unwrap().status, SaveStatus::Saved);
    }

    #[tokio::test]
    async fn test_unknown_block_is_an_error() {
        let mut session = EditorSession::new(CanvasDocument::new(), EditorConfig::default());
        let mut replayer = Replayer::new();
        let err = replayer
            .run(&mut session, SessionCommand::Remove { block: "ghost".into() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_parse_errors_are_reported() {
        assert!(Script::from_json(r#"{ "commands": [{ "op": "fly" }] }"#).is_err());
    }
}
