//! Block definitions for the canvas.

mod content;
mod patch;

pub use content::{
    BlockContent, ContentError, CountdownContent, Fields, GalleryContent, ImageContent,
    MapContent, TextContent,
};
pub use patch::BlockPatch;

use crate::geometry::{MIN_BLOCK_DIMENSION, Position, Rect, Size, block_bounds, clamp_size};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a block within a document.
pub type BlockId = String;

/// Free-form CSS-like style overrides (`fontSize`, `opacity`, ...).
pub type StyleMap = serde_json::Map<String, Value>;

/// Generate a fresh block identifier.
pub fn new_block_id() -> BlockId {
    Uuid::new_v4().to_string()
}

/// Closed set of block types. Selects the rendering and the content shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Heading,
    Image,
    Divider,
    Gallery,
    Timeline,
    Map,
    Countdown,
    Form,
    Group,
    Decorative,
    Button,
    Video,
}

impl BlockKind {
    pub const ALL: [BlockKind; 13] = [
        BlockKind::Text,
        BlockKind::Heading,
        BlockKind::Image,
        BlockKind::Divider,
        BlockKind::Gallery,
        BlockKind::Timeline,
        BlockKind::Map,
        BlockKind::Countdown,
        BlockKind::Form,
        BlockKind::Group,
        BlockKind::Decorative,
        BlockKind::Button,
        BlockKind::Video,
    ];

    /// Tag used in the persisted document.
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Heading => "heading",
            BlockKind::Image => "image",
            BlockKind::Divider => "divider",
            BlockKind::Gallery => "gallery",
            BlockKind::Timeline => "timeline",
            BlockKind::Map => "map",
            BlockKind::Countdown => "countdown",
            BlockKind::Form => "form",
            BlockKind::Group => "group",
            BlockKind::Decorative => "decorative",
            BlockKind::Button => "button",
            BlockKind::Video => "video",
        }
    }

    /// Whether the block supports inline text editing.
    pub fn is_text_like(self) -> bool {
        matches!(self, BlockKind::Text | BlockKind::Heading)
    }

    /// Size given to a freshly added block of this kind.
    pub fn default_size(self) -> Size {
        match self {
            BlockKind::Text => Size::new(320.0, 48.0),
            BlockKind::Heading => Size::new(480.0, 72.0),
            BlockKind::Image => Size::new(320.0, 240.0),
            BlockKind::Divider => Size::new(400.0, 10.0),
            BlockKind::Gallery => Size::new(480.0, 320.0),
            BlockKind::Timeline => Size::new(480.0, 360.0),
            BlockKind::Map => Size::new(400.0, 300.0),
            BlockKind::Countdown => Size::new(360.0, 120.0),
            BlockKind::Form => Size::new(400.0, 320.0),
            BlockKind::Group => Size::new(200.0, 200.0),
            BlockKind::Decorative => Size::new(120.0, 120.0),
            BlockKind::Button => Size::new(160.0, 48.0),
            BlockKind::Video => Size::new(480.0, 270.0),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown block type `{s}`"))
    }
}

/// One positioned, typed content unit on the canvas.
///
/// Blocks are owned by the document's flat map. `children` and `parent_id`
/// describe a relation looked up by id, never a containment hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBlock", into = "RawBlock")]
pub struct Block {
    pub id: BlockId,
    /// Typed payload; its variant is the block's kind.
    pub content: BlockContent,
    pub position: Position,
    pub size: Size,
    /// Paint order index. Need not be contiguous.
    pub z_index: i64,
    pub style: StyleMap,
    pub animation: Option<String>,
    /// Locked blocks cannot be dragged, resized or nudged.
    pub locked: bool,
    pub semantic: Option<String>,
    pub section_id: Option<String>,
    /// Ordered child ids, only meaningful for `group` blocks.
    pub children: Option<Vec<BlockId>>,
    pub parent_id: Option<BlockId>,
}

impl Block {
    /// Create a block with a fresh id and the kind's default size.
    pub fn new(content: BlockContent, position: Position) -> Self {
        let size = content.kind().default_size();
        Self {
            id: new_block_id(),
            content,
            position,
            size,
            z_index: 0,
            style: StyleMap::new(),
            animation: None,
            locked: false,
            semantic: None,
            section_id: None,
            children: None,
            parent_id: None,
        }
    }

    /// The block's type tag.
    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }

    /// Bounding rectangle in canvas space.
    pub fn bounds(&self) -> Rect {
        block_bounds(self.position, self.size)
    }

    pub fn is_group(&self) -> bool {
        self.kind() == BlockKind::Group
    }

    /// Numeric style value, e.g. `fontSize` or `opacity`.
    pub fn style_number(&self, key: &str) -> Option<f64> {
        self.style.get(key).and_then(Value::as_f64)
    }

    /// Apply a patch in place. Returns an error if the patch content does not
    /// fit this block's kind; the block is left untouched in that case.
    pub fn apply_patch(&mut self, patch: &BlockPatch) -> Result<(), ContentError> {
        let content = match &patch.content {
            Some(value) => Some(BlockContent::from_value(self.kind(), value.clone())?),
            None => None,
        };
        if let Some(content) = content {
            self.content = content;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(size) = patch.size {
            self.size = clamp_size(size, MIN_BLOCK_DIMENSION);
        }
        if let Some(z_index) = patch.z_index {
            self.z_index = z_index;
        }
        if let Some(style) = &patch.style {
            self.style = style.clone();
        }
        if let Some(animation) = &patch.animation {
            self.animation = animation.clone();
        }
        if let Some(locked) = patch.locked {
            self.locked = locked;
        }
        if let Some(semantic) = &patch.semantic {
            self.semantic = semantic.clone();
        }
        if let Some(section_id) = &patch.section_id {
            self.section_id = section_id.clone();
        }
        Ok(())
    }
}

/// Wire shape of a block: `type` tag plus an untyped `content` map.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
    id: BlockId,
    #[serde(rename = "type")]
    kind: BlockKind,
    position: Position,
    size: Size,
    #[serde(default)]
    z_index: i64,
    #[serde(default)]
    content: Value,
    #[serde(default)]
    style: StyleMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    animation: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    semantic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<BlockId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<BlockId>,
}

impl TryFrom<RawBlock> for Block {
    type Error = ContentError;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        Ok(Self {
            content: BlockContent::from_value(raw.kind, raw.content)?,
            id: raw.id,
            position: raw.position,
            size: raw.size,
            z_index: raw.z_index,
            style: raw.style,
            animation: raw.animation,
            locked: raw.locked,
            semantic: raw.semantic,
            section_id: raw.section_id,
            children: raw.children,
            parent_id: raw.parent_id,
        })
    }
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        Self {
            id: block.id,
            kind: block.content.kind(),
            content: block.content.to_value(),
            position: block.position,
            size: block.size,
            z_index: block.z_index,
            style: block.style,
            animation: block.animation,
            locked: block.locked,
            semantic: block.semantic,
            section_id: block.section_id,
            children: block.children,
            parent_id: block.parent_id,
        }
    }
}
