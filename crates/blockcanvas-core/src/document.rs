//! Canvas document: blocks, paint order, canvas size and design tokens.

use crate::block::{Block, BlockId};
use crate::geometry::{Point, Rect, Size};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// Default grid unit in pixels.
pub const DEFAULT_GRID_SPACING: f64 = 8.0;

/// Default canvas size for new documents.
pub const DEFAULT_CANVAS_SIZE: Size = Size::new(1200.0, 2000.0);

/// Shared design tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignTokens {
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    #[serde(default)]
    pub fonts: BTreeMap<String, String>,
    /// Grid unit used for snapping.
    #[serde(default = "default_spacing")]
    pub spacing: f64,
}

fn default_spacing() -> f64 {
    DEFAULT_GRID_SPACING
}

impl Default for DesignTokens {
    fn default() -> Self {
        Self {
            colors: BTreeMap::new(),
            fonts: BTreeMap::new(),
            spacing: DEFAULT_GRID_SPACING,
        }
    }
}

/// Which keyed token map a token update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSection {
    Colors,
    Fonts,
}

/// Document timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub created_at: DateTime<Utc>,
    /// Bumped on every committed mutation.
    pub updated_at: DateTime<Utc>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }
}

/// A canvas document containing all blocks.
///
/// Every id in `block_order` has exactly one entry in `blocks_by_id` and vice
/// versa. Mutate through [`DocumentStore`](crate::store::DocumentStore) to keep
/// that invariant and the history intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasDocument {
    /// Document identity, also the persistence key.
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
    pub canvas: Size,
    #[serde(default)]
    pub blocks_by_id: HashMap<BlockId, Block>,
    /// Paint order (back to front); also the default tab order.
    #[serde(default)]
    pub block_order: Vec<BlockId>,
    #[serde(default)]
    pub design_tokens: DesignTokens,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    /// Provenance tag, opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

fn default_name() -> String {
    "Untitled".to_string()
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: default_name(),
            canvas: DEFAULT_CANVAS_SIZE,
            blocks_by_id: HashMap::new(),
            block_order: Vec::new(),
            design_tokens: DesignTokens::default(),
            metadata: DocumentMetadata::default(),
            template_id: None,
        }
    }

    /// Get a block by ID.
    pub fn get_block(&self, id: &str) -> Option<&Block> {
        self.blocks_by_id.get(id)
    }

    /// Get a mutable reference to a block by ID.
    pub fn get_block_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks_by_id.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks_by_id.contains_key(id)
    }

    /// Blocks in paint order (back to front).
    pub fn blocks_ordered(&self) -> impl Iterator<Item = &Block> {
        self.block_order.iter().filter_map(|id| self.blocks_by_id.get(id))
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks_by_id.is_empty()
    }

    /// Get the number of blocks.
    pub fn len(&self) -> usize {
        self.blocks_by_id.len()
    }

    /// Grid unit for snapping.
    pub fn grid_spacing(&self) -> f64 {
        self.design_tokens.spacing
    }

    /// Highest z-index in use, if any block exists.
    pub fn max_z_index(&self) -> Option<i64> {
        self.blocks_by_id.values().map(|b| b.z_index).max()
    }

    /// Z-index for a block placed on top of everything else.
    pub fn next_z_index(&self) -> i64 {
        self.max_z_index().map_or(1, |z| z + 1)
    }

    /// Ids that travel with `id` or enclose it: the block, its children and
    /// its ancestor groups. None of them is a snap target for `id`.
    pub fn linked_ids(&self, id: &str) -> HashSet<BlockId> {
        let mut linked = HashSet::new();
        let Some(block) = self.get_block(id) else {
            return linked;
        };
        linked.insert(block.id.clone());
        linked.extend(block.children.iter().flatten().cloned());

        let mut parent = block.parent_id.as_deref();
        while let Some(parent_id) = parent {
            if !linked.insert(parent_id.to_string()) {
                break;
            }
            parent = self.get_block(parent_id).and_then(|p| p.parent_id.as_deref());
        }
        linked
    }

    /// Bounds of every block not in `exclude`, in paint order.
    pub fn sibling_bounds(&self, exclude: &HashSet<BlockId>) -> Vec<Rect> {
        self.blocks_ordered()
            .filter(|b| !exclude.contains(&b.id))
            .map(Block::bounds)
            .collect()
    }

    /// Get the bounding box of all blocks.
    pub fn bounds(&self) -> Option<Rect> {
        self.blocks_by_id
            .values()
            .map(Block::bounds)
            .reduce(|acc, r| acc.union(r))
    }

    /// Blocks under a point, front to back.
    pub fn blocks_at_point(&self, point: Point) -> Vec<BlockId> {
        self.block_order
            .iter()
            .rev()
            .filter(|id| {
                self.blocks_by_id
                    .get(*id)
                    .is_some_and(|b| b.bounds().contains(point))
            })
            .cloned()
            .collect()
    }

    /// Bump `metadata.updated_at`.
    pub fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }

    /// Whether the order list and the block map agree exactly.
    pub fn is_consistent(&self) -> bool {
        if self.block_order.len() != self.blocks_by_id.len() {
            return false;
        }
        let mut seen = HashSet::with_capacity(self.block_order.len());
        self.block_order
            .iter()
            .all(|id| self.blocks_by_id.contains_key(id) && seen.insert(id))
    }

    /// Restore the order/map invariant on a document from outside the store.
    ///
    /// Drops dangling and duplicate order entries and appends unordered blocks
    /// by ascending z-index. Returns true if anything changed.
    pub fn repair(&mut self) -> bool {
        if self.is_consistent() {
            return false;
        }
        let mut seen = HashSet::new();
        let blocks = &self.blocks_by_id;
        self.block_order
            .retain(|id| blocks.contains_key(id) && seen.insert(id.clone()));

        let mut missing: Vec<&Block> = self
            .blocks_by_id
            .values()
            .filter(|b| !seen.contains(&b.id))
            .collect();
        missing.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        let missing: Vec<BlockId> = missing.into_iter().map(|b| b.id.clone()).collect();
        self.block_order.extend(missing);
        true
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
