//! Partial block updates.

use super::StyleMap;
use crate::geometry::{Position, Size};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A shallow patch over block fields.
///
/// `None` leaves a field alone. For nullable fields (`animation`, `semantic`,
/// `sectionId`) `Some(None)` clears the value, which on the wire is an
/// explicit `null`. `content` is parsed against the target block's kind when
/// the patch is applied; `style` replaces the whole map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleMap>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub animation: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub semantic: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub section_id: Option<Option<String>>,
}

impl BlockPatch {
    /// Whether applying the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    pub fn with_content(mut self, content: Value) -> Self {
        self.content = Some(content);
        self
    }
}

/// Distinguishes an absent field from an explicit `null`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
