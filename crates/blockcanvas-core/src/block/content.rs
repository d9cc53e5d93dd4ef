//! Typed content payloads, one shape per block kind.
//!
//! Every payload keeps the fields it does not know about in `extra`, so
//! renderer-only fields survive a load/save cycle untouched.

use super::BlockKind;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Free-form key/value payload.
pub type Fields = Map<String, Value>;

/// Errors raised when a content payload does not fit its block kind.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content for `{kind}` blocks must be an object, got {found}")]
    NotAnObject { kind: BlockKind, found: &'static str },
    #[error("invalid `{kind}` content: {source}")]
    Invalid {
        kind: BlockKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{found}` content cannot be stored on a `{expected}` block")]
    KindMismatch { expected: BlockKind, found: BlockKind },
}

/// Content of `text` and `heading` blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(flatten)]
    pub extra: Fields,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            extra: Fields::new(),
        }
    }
}

/// Content of `image` blocks, also used for gallery entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub src: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alt: String,
    #[serde(flatten)]
    pub extra: Fields,
}

impl ImageContent {
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
            extra: Fields::new(),
        }
    }
}

/// Content of `gallery` blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryContent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<ImageContent>,
    #[serde(flatten)]
    pub extra: Fields,
}

/// Content of `countdown` blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownContent {
    /// Target instant as an ISO-8601 string; interpreted by the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

/// Content of `map` blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

/// Content payload of a block. The variant determines the block's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Text(TextContent),
    Heading(TextContent),
    Image(ImageContent),
    Divider(Fields),
    Gallery(GalleryContent),
    Timeline(Fields),
    Map(MapContent),
    Countdown(CountdownContent),
    Form(Fields),
    Group(Fields),
    Decorative(Fields),
    Button(Fields),
    Video(Fields),
}

impl BlockContent {
    /// Empty content for the given kind.
    pub fn empty(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Text => Self::Text(TextContent::default()),
            BlockKind::Heading => Self::Heading(TextContent::default()),
            BlockKind::Image => Self::Image(ImageContent::default()),
            BlockKind::Divider => Self::Divider(Fields::new()),
            BlockKind::Gallery => Self::Gallery(GalleryContent::default()),
            BlockKind::Timeline => Self::Timeline(Fields::new()),
            BlockKind::Map => Self::Map(MapContent::default()),
            BlockKind::Countdown => Self::Countdown(CountdownContent::default()),
            BlockKind::Form => Self::Form(Fields::new()),
            BlockKind::Group => Self::Group(Fields::new()),
            BlockKind::Decorative => Self::Decorative(Fields::new()),
            BlockKind::Button => Self::Button(Fields::new()),
            BlockKind::Video => Self::Video(Fields::new()),
        }
    }

    /// Text content for a `text` block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextContent::new(text))
    }

    /// Text content for a `heading` block.
    pub fn heading(text: impl Into<String>) -> Self {
        Self::Heading(TextContent::new(text))
    }

    /// Image content.
    pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self::Image(ImageContent::new(src, alt))
    }

    /// The block kind this content belongs to.
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Text(_) => BlockKind::Text,
            Self::Heading(_) => BlockKind::Heading,
            Self::Image(_) => BlockKind::Image,
            Self::Divider(_) => BlockKind::Divider,
            Self::Gallery(_) => BlockKind::Gallery,
            Self::Timeline(_) => BlockKind::Timeline,
            Self::Map(_) => BlockKind::Map,
            Self::Countdown(_) => BlockKind::Countdown,
            Self::Form(_) => BlockKind::Form,
            Self::Group(_) => BlockKind::Group,
            Self::Decorative(_) => BlockKind::Decorative,
            Self::Button(_) => BlockKind::Button,
            Self::Video(_) => BlockKind::Video,
        }
    }

    /// Parse a raw payload for `kind`. `null` yields empty content.
    pub fn from_value(kind: BlockKind, value: Value) -> Result<Self, ContentError> {
        let fields = match value {
            Value::Null => return Ok(Self::empty(kind)),
            Value::Object(fields) => fields,
            other => {
                return Err(ContentError::NotAnObject {
                    kind,
                    found: value_type_name(&other),
                });
            }
        };

        let invalid = |source| ContentError::Invalid { kind, source };
        let content = match kind {
            BlockKind::Text => Self::Text(parse(fields).map_err(invalid)?),
            BlockKind::Heading => Self::Heading(parse(fields).map_err(invalid)?),
            BlockKind::Image => Self::Image(parse(fields).map_err(invalid)?),
            BlockKind::Gallery => Self::Gallery(parse(fields).map_err(invalid)?),
            BlockKind::Map => Self::Map(parse(fields).map_err(invalid)?),
            BlockKind::Countdown => Self::Countdown(parse(fields).map_err(invalid)?),
            BlockKind::Divider => Self::Divider(fields),
            BlockKind::Timeline => Self::Timeline(fields),
            BlockKind::Form => Self::Form(fields),
            BlockKind::Group => Self::Group(fields),
            BlockKind::Decorative => Self::Decorative(fields),
            BlockKind::Button => Self::Button(fields),
            BlockKind::Video => Self::Video(fields),
        };
        Ok(content)
    }

    /// Serialize back into a raw key/value payload.
    pub fn to_value(&self) -> Value {
        let result = match self {
            Self::Text(c) | Self::Heading(c) => serde_json::to_value(c),
            Self::Image(c) => serde_json::to_value(c),
            Self::Gallery(c) => serde_json::to_value(c),
            Self::Map(c) => serde_json::to_value(c),
            Self::Countdown(c) => serde_json::to_value(c),
            Self::Divider(f)
            | Self::Timeline(f)
            | Self::Form(f)
            | Self::Group(f)
            | Self::Decorative(f)
            | Self::Button(f)
            | Self::Video(f) => return Value::Object(f.clone()),
        };
        // Plain structs of strings and maps always serialize.
        result.unwrap_or_else(|_| Value::Object(Fields::new()))
    }

    /// The editable text, for text-like blocks.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(c) | Self::Heading(c) => Some(&c.text),
            _ => None,
        }
    }
}

/// An explicit `null` reads as the field's default, like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn parse<T: serde::de::DeserializeOwned>(fields: Fields) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(fields))
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_content_keeps_unknown_fields() {
        let content =
            BlockContent::from_value(BlockKind::Text, json!({"text": "Hi", "richText": [1, 2]}))
                .unwrap();
        assert_eq!(content.as_text(), Some("Hi"));
        assert_eq!(content.to_value(), json!({"text": "Hi", "richText": [1, 2]}));
    }

    #[test]
    fn test_null_content_defaults() {
        let content = BlockContent::from_value(BlockKind::Image, Value::Null).unwrap();
        assert_eq!(content, BlockContent::Image(ImageContent::default()));
    }

    #[test]
    fn test_missing_fields_default() {
        let content = BlockContent::from_value(BlockKind::Image, json!({"src": "a.png"})).unwrap();
        match content {
            BlockContent::Image(image) => {
                assert_eq!(image.src, "a.png");
                assert_eq!(image.alt, "");
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[test]
    fn test_null_fields_default() {
        let content = BlockContent::from_value(BlockKind::Text, json!({"text": null})).unwrap();
        assert_eq!(content.as_text(), Some(""));

        let content = BlockContent::from_value(
            BlockKind::Gallery,
            json!({"images": [{"src": "a.png", "alt": null}], "caption": null}),
        )
        .unwrap();
        match content {
            BlockContent::Gallery(gallery) => {
                assert_eq!(gallery.images, vec![ImageContent::new("a.png", "")]);
                assert_eq!(gallery.extra.get("caption"), Some(&Value::Null));
            }
            other => panic!("unexpected content {other:?}"),
        }

        let content = BlockContent::from_value(BlockKind::Gallery, json!({"images": null})).unwrap();
        assert_eq!(content, BlockContent::Gallery(GalleryContent::default()));
    }

    #[test]
    fn test_non_object_rejected() {
        let err = BlockContent::from_value(BlockKind::Text, json!("Hi")).unwrap_err();
        assert!(matches!(err, ContentError::NotAnObject { found: "a string", .. }));
    }

    #[test]
    fn test_wrong_field_type_rejected() {
        let err = BlockContent::from_value(BlockKind::Gallery, json!({"images": 3})).unwrap_err();
        assert!(matches!(err, ContentError::Invalid { kind: BlockKind::Gallery, .. }));
    }

    #[test]
    fn test_countdown_uses_camel_case() {
        let content = BlockContent::from_value(
            BlockKind::Countdown,
            json!({"targetDate": "2027-06-01T16:00:00Z", "label": "Ceremony"}),
        )
        .unwrap();
        assert_eq!(
            content.to_value(),
            json!({"targetDate": "2027-06-01T16:00:00Z", "label": "Ceremony"})
        );
    }

    #[test]
    fn test_kind_follows_variant() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockContent::empty(kind).kind(), kind);
        }
    }
}
