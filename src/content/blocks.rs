/**
 * Content Blocks
 * Typed content for each block type of the visual page builder
 */
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

use crate::content::is_hex_color;
use crate::render::embed::{self, EmbedProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Hero,
    Text,
    Image,
    ImageTextLeft,
    ImageTextRight,
    Portfolio,
    Contact,
    Video,
    Embed,
    // Reserved: recognized, never stored.
    Gallery,
    Spacer,
    Testimonial,
}

impl BlockType {
    pub const ALL: [BlockType; 12] = [
        BlockType::Hero,
        BlockType::Text,
        BlockType::Image,
        BlockType::ImageTextLeft,
        BlockType::ImageTextRight,
        BlockType::Portfolio,
        BlockType::Contact,
        BlockType::Video,
        BlockType::Embed,
        BlockType::Gallery,
        BlockType::Spacer,
        BlockType::Testimonial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Hero => "hero",
            BlockType::Text => "text",
            BlockType::Image => "image",
            BlockType::ImageTextLeft => "image_text_left",
            BlockType::ImageTextRight => "image_text_right",
            BlockType::Portfolio => "portfolio",
            BlockType::Contact => "contact",
            BlockType::Video => "video",
            BlockType::Embed => "embed",
            BlockType::Gallery => "gallery",
            BlockType::Spacer => "spacer",
            BlockType::Testimonial => "testimonial",
        }
    }

    pub fn is_reserved(&self) -> bool {
        matches!(
            self,
            BlockType::Gallery | BlockType::Spacer | BlockType::Testimonial
        )
    }

    /// Keys older editor revisions wrote, paired with the current key.
    fn legacy_keys(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            BlockType::Text => &[("text", "content")],
            BlockType::Image => &[("image_url", "src"), ("alt_text", "alt")],
            BlockType::ImageTextLeft | BlockType::ImageTextRight => {
                &[("image_url", "image_src"), ("alt_text", "image_alt")]
            }
            _ => &[],
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = BlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BlockError::UnknownType(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("unknown block type '{0}'")]
    UnknownType(String),

    #[error("block type '{0}' is not supported")]
    Unsupported(BlockType),

    #[error("invalid {block_type} block content: {message}")]
    Malformed {
        block_type: BlockType,
        message: String,
    },

    #[error("invalid {block_type} block: {field} {reason}")]
    Invalid {
        block_type: BlockType,
        field: &'static str,
        reason: &'static str,
    },
}

// ============================================================================
// Per-type content
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioLayout {
    Grid,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedKind {
    Auto,
    Youtube,
    Vimeo,
    Twitter,
    Codepen,
    Googledrive,
    Iframe,
}

impl EmbedKind {
    fn provider(&self) -> Option<EmbedProvider> {
        match self {
            EmbedKind::Auto => None,
            EmbedKind::Youtube => Some(EmbedProvider::Youtube),
            EmbedKind::Vimeo => Some(EmbedProvider::Vimeo),
            EmbedKind::Twitter => Some(EmbedProvider::Twitter),
            EmbedKind::Codepen => Some(EmbedProvider::Codepen),
            EmbedKind::Googledrive => Some(EmbedProvider::Googledrive),
            EmbedKind::Iframe => Some(EmbedProvider::Iframe),
        }
    }
}

/// Section background shared by every block type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroContent {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(flatten)]
    pub style: BlockStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(flatten)]
    pub style: BlockStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(
        default,
        rename = "percentageWidth",
        skip_serializing_if = "Option::is_none"
    )]
    pub percentage_width: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(flatten)]
    pub style: BlockStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageTextContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_src: String,
    #[serde(default)]
    pub image_alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_alignment: Option<Alignment>,
    #[serde(flatten)]
    pub style: BlockStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub show_featured_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<PortfolioLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_row: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter: Option<String>,
    #[serde(flatten)]
    pub style: BlockStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub show_form: bool,
    #[serde(flatten)]
    pub style: BlockStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default)]
    pub autoplay: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls: Option<bool>,
    #[serde(flatten)]
    pub style: BlockStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_type: Option<EmbedKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_fullscreen: Option<bool>,
    #[serde(flatten)]
    pub style: BlockStyle,
}

// ============================================================================
// BlockContent
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Hero(HeroContent),
    Text(TextContent),
    Image(ImageContent),
    ImageTextLeft(ImageTextContent),
    ImageTextRight(ImageTextContent),
    Portfolio(PortfolioContent),
    Contact(ContactContent),
    Video(VideoContent),
    Embed(EmbedContent),
}

fn parse_as<T: DeserializeOwned>(block_type: BlockType, content: Value) -> Result<T, BlockError> {
    serde_json::from_value(content).map_err(|e| BlockError::Malformed {
        block_type,
        message: e.to_string(),
    })
}

/// Move legacy keys onto their current names. A current key that is already
/// set wins; the legacy key is dropped either way.
fn fold_legacy_keys(block_type: BlockType, map: &mut Map<String, Value>) {
    for (legacy, current) in block_type.legacy_keys() {
        let Some(value) = map.remove(*legacy) else {
            continue;
        };
        let current_is_empty = match map.get(*current) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if current_is_empty {
            map.insert((*current).to_string(), value);
        }
    }
}

impl BlockContent {
    /// Parse the stored or submitted `content` map for `block_type`.
    pub fn parse(block_type: BlockType, content: Value) -> Result<Self, BlockError> {
        if block_type.is_reserved() {
            return Err(BlockError::Unsupported(block_type));
        }

        let mut map = match content {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(BlockError::Malformed {
                    block_type,
                    message: format!("expected an object, found {}", other),
                })
            }
        };
        fold_legacy_keys(block_type, &mut map);
        let content = Value::Object(map);

        let block = match block_type {
            BlockType::Hero => BlockContent::Hero(parse_as(block_type, content)?),
            BlockType::Text => BlockContent::Text(parse_as(block_type, content)?),
            BlockType::Image => BlockContent::Image(parse_as(block_type, content)?),
            BlockType::ImageTextLeft => BlockContent::ImageTextLeft(parse_as(block_type, content)?),
            BlockType::ImageTextRight => {
                BlockContent::ImageTextRight(parse_as(block_type, content)?)
            }
            BlockType::Portfolio => BlockContent::Portfolio(parse_as(block_type, content)?),
            BlockType::Contact => BlockContent::Contact(parse_as(block_type, content)?),
            BlockType::Video => BlockContent::Video(parse_as(block_type, content)?),
            BlockType::Embed => BlockContent::Embed(parse_as(block_type, content)?),
            BlockType::Gallery | BlockType::Spacer | BlockType::Testimonial => {
                return Err(BlockError::Unsupported(block_type))
            }
        };
        Ok(block)
    }

    /// Parse and validate in one step.
    pub fn parse_valid(block_type: BlockType, content: Value) -> Result<Self, BlockError> {
        let block = Self::parse(block_type, content)?;
        block.validate()?;
        Ok(block)
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            BlockContent::Hero(_) => BlockType::Hero,
            BlockContent::Text(_) => BlockType::Text,
            BlockContent::Image(_) => BlockType::Image,
            BlockContent::ImageTextLeft(_) => BlockType::ImageTextLeft,
            BlockContent::ImageTextRight(_) => BlockType::ImageTextRight,
            BlockContent::Portfolio(_) => BlockType::Portfolio,
            BlockContent::Contact(_) => BlockType::Contact,
            BlockContent::Video(_) => BlockType::Video,
            BlockContent::Embed(_) => BlockType::Embed,
        }
    }

    /// Normalized `content` map as stored.
    pub fn to_value(&self) -> Value {
        let value = match self {
            BlockContent::Hero(c) => serde_json::to_value(c),
            BlockContent::Text(c) => serde_json::to_value(c),
            BlockContent::Image(c) => serde_json::to_value(c),
            BlockContent::ImageTextLeft(c) | BlockContent::ImageTextRight(c) => {
                serde_json::to_value(c)
            }
            BlockContent::Portfolio(c) => serde_json::to_value(c),
            BlockContent::Contact(c) => serde_json::to_value(c),
            BlockContent::Video(c) => serde_json::to_value(c),
            BlockContent::Embed(c) => serde_json::to_value(c),
        };
        // Plain data structs with string keys always serialize.
        value.unwrap_or(Value::Object(Map::new()))
    }

    pub fn style(&self) -> &BlockStyle {
        match self {
            BlockContent::Hero(c) => &c.style,
            BlockContent::Text(c) => &c.style,
            BlockContent::Image(c) => &c.style,
            BlockContent::ImageTextLeft(c) | BlockContent::ImageTextRight(c) => &c.style,
            BlockContent::Portfolio(c) => &c.style,
            BlockContent::Contact(c) => &c.style,
            BlockContent::Video(c) => &c.style,
            BlockContent::Embed(c) => &c.style,
        }
    }

    pub fn validate(&self) -> Result<(), BlockError> {
        let block_type = self.block_type();
        let invalid = |field, reason| BlockError::Invalid {
            block_type,
            field,
            reason,
        };

        let style = self.style();
        if let Some(color) = &style.background_color {
            if !is_hex_color(color) {
                return Err(invalid("backgroundColor", "must be a hex color"));
            }
        }
        if style.opacity.is_some_and(|o| o > 100) {
            return Err(invalid("opacity", "must be between 0 and 100"));
        }

        match self {
            BlockContent::Hero(c) if c.title.trim().is_empty() => {
                Err(invalid("title", "is required"))
            }
            BlockContent::Image(c) if c.percentage_width.is_some_and(|w| w == 0 || w > 100) => {
                Err(invalid("percentageWidth", "must be between 1 and 100"))
            }
            BlockContent::Portfolio(c) if c.items_per_row.is_some_and(|n| n == 0 || n > 6) => {
                Err(invalid("itemsPerRow", "must be between 1 and 6"))
            }
            _ => Ok(()),
        }
    }

    /// Author text rendered through the markdown renderer on public pages.
    /// For hero blocks this is the description.
    pub fn text_body(&self) -> Option<&str> {
        match self {
            BlockContent::Hero(c) => c.description.as_deref(),
            BlockContent::Text(c) => Some(&c.content),
            BlockContent::ImageTextLeft(c) | BlockContent::ImageTextRight(c) => Some(&c.content),
            _ => None,
        }
    }

    /// Player URL for video and embed blocks. A video that is not on YouTube
    /// plays its source directly.
    pub fn embed_url(&self) -> Option<String> {
        match self {
            BlockContent::Video(c) if !c.src.is_empty() => {
                Some(embed::youtube_embed_url(&c.src).unwrap_or_else(|| c.src.clone()))
            }
            BlockContent::Embed(c) if !c.url.is_empty() => Some(embed::resolve_embed_url(
                &c.url,
                c.embed_type.and_then(|k| k.provider()),
            )),
            _ => None,
        }
    }

    /// Starter content the editor inserts for a freshly added block.
    pub fn starter(block_type: BlockType) -> Result<Self, BlockError> {
        let block = match block_type {
            BlockType::Hero => BlockContent::Hero(HeroContent {
                title: "Hero Title".to_string(),
                subtitle: Some("Hero Subtitle".to_string()),
                description: Some("Hero description text goes here".to_string()),
                button_text: Some("Call to Action".to_string()),
                button_link: Some("#".to_string()),
                ..Default::default()
            }),
            BlockType::Text => BlockContent::Text(TextContent {
                title: Some("Text Block Title".to_string()),
                content: "Your text content goes here...".to_string(),
                alignment: Some(Alignment::Left),
                ..Default::default()
            }),
            BlockType::Image => BlockContent::Image(ImageContent {
                src: "/placeholder.svg?height=400&width=600".to_string(),
                alt: "Image description".to_string(),
                caption: Some(String::new()),
                ..Default::default()
            }),
            BlockType::ImageTextLeft | BlockType::ImageTextRight => {
                let content = ImageTextContent {
                    title: Some("Section Title".to_string()),
                    content: "Your text content goes here.".to_string(),
                    image_src: "/placeholder.svg?height=400&width=600".to_string(),
                    image_alt: "Section image description".to_string(),
                    text_alignment: Some(Alignment::Left),
                    ..Default::default()
                };
                if block_type == BlockType::ImageTextLeft {
                    BlockContent::ImageTextLeft(content)
                } else {
                    BlockContent::ImageTextRight(content)
                }
            }
            BlockType::Portfolio => BlockContent::Portfolio(PortfolioContent {
                title: Some("Portfolio".to_string()),
                show_featured_only: false,
                layout: Some(PortfolioLayout::Grid),
                items_per_row: Some(3),
                ..Default::default()
            }),
            BlockType::Contact => BlockContent::Contact(ContactContent {
                title: Some("Contact Us".to_string()),
                email: Some("hello@example.com".to_string()),
                show_form: true,
                ..Default::default()
            }),
            BlockType::Video => BlockContent::Video(VideoContent {
                title: Some("Video Title".to_string()),
                ..Default::default()
            }),
            BlockType::Embed => BlockContent::Embed(EmbedContent {
                title: Some("Embedded Content".to_string()),
                embed_type: Some(EmbedKind::Auto),
                width: Some("100%".to_string()),
                height: Some("400px".to_string()),
                allow_fullscreen: Some(true),
                ..Default::default()
            }),
            BlockType::Gallery | BlockType::Spacer | BlockType::Testimonial => {
                return Err(BlockError::Unsupported(block_type))
            }
        };
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_type_round_trips_through_str() {
        for block_type in BlockType::ALL {
            assert_eq!(block_type.as_str().parse::<BlockType>().unwrap(), block_type);
        }
        assert!("carousel".parse::<BlockType>().is_err());
    }

    #[test]
    fn test_block_type_serde_uses_snake_case() {
        let s = serde_json::to_string(&BlockType::ImageTextLeft).unwrap();
        assert_eq!(s, "\"image_text_left\"");
    }

    #[test]
    fn test_reserved_types_are_rejected() {
        let err = BlockContent::parse(BlockType::Gallery, json!({})).unwrap_err();
        assert!(matches!(err, BlockError::Unsupported(BlockType::Gallery)));
        assert!(BlockContent::starter(BlockType::Spacer).is_err());
    }

    #[test]
    fn test_legacy_image_keys_are_normalized() {
        let block = BlockContent::parse(
            BlockType::Image,
            json!({ "image_url": "/a.png", "alt_text": "A", "caption": "c" }),
        )
        .unwrap();
        let stored = block.to_value();
        assert_eq!(stored["src"], "/a.png");
        assert_eq!(stored["alt"], "A");
        assert!(stored.get("image_url").is_none());
        assert!(stored.get("alt_text").is_none());
    }

    #[test]
    fn test_current_key_wins_over_legacy_key() {
        let block = BlockContent::parse(
            BlockType::Text,
            json!({ "content": "new body", "text": "old body" }),
        )
        .unwrap();
        assert_eq!(block.text_body(), Some("new body"));

        let legacy_only =
            BlockContent::parse(BlockType::Text, json!({ "text": "old body", "content": "" }))
                .unwrap();
        assert_eq!(legacy_only.text_body(), Some("old body"));
    }

    #[test]
    fn test_null_content_parses_as_empty() {
        let block = BlockContent::parse(BlockType::Text, Value::Null).unwrap();
        assert_eq!(block.text_body(), Some(""));
    }

    #[test]
    fn test_non_object_content_is_malformed() {
        let err = BlockContent::parse(BlockType::Text, json!("body")).unwrap_err();
        assert!(matches!(err, BlockError::Malformed { .. }));
    }

    #[test]
    fn test_validation_rules() {
        let hero = BlockContent::parse(BlockType::Hero, json!({ "title": "  " })).unwrap();
        assert!(hero.validate().is_err());

        let text = BlockContent::parse(
            BlockType::Text,
            json!({ "content": "x", "backgroundColor": "red" }),
        )
        .unwrap();
        assert!(text.validate().is_err());

        let text = BlockContent::parse(
            BlockType::Text,
            json!({ "content": "x", "backgroundColor": "#112233", "opacity": 80 }),
        )
        .unwrap();
        assert!(text.validate().is_ok());

        let portfolio =
            BlockContent::parse(BlockType::Portfolio, json!({ "itemsPerRow": 9 })).unwrap();
        assert!(portfolio.validate().is_err());
    }

    #[test]
    fn test_opacity_over_255_is_malformed() {
        let err = BlockContent::parse(BlockType::Text, json!({ "opacity": 300 })).unwrap_err();
        assert!(matches!(err, BlockError::Malformed { .. }));
    }

    #[test]
    fn test_every_starter_block_is_valid() {
        for block_type in BlockType::ALL.into_iter().filter(|t| !t.is_reserved()) {
            let block = BlockContent::starter(block_type).unwrap();
            assert_eq!(block.block_type(), block_type);
            block.validate().unwrap();
            let reparsed = BlockContent::parse(block_type, block.to_value()).unwrap();
            assert_eq!(reparsed, block);
        }
    }

    #[test]
    fn test_embed_url_for_video_and_embed_blocks() {
        let video = BlockContent::parse(
            BlockType::Video,
            json!({ "src": "https://youtu.be/dQw4w9WgXcQ" }),
        )
        .unwrap();
        assert_eq!(
            video.embed_url().as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );

        let file = BlockContent::parse(BlockType::Video, json!({ "src": "/uploads/a.mp4" })).unwrap();
        assert_eq!(file.embed_url().as_deref(), Some("/uploads/a.mp4"));

        let embed = BlockContent::parse(
            BlockType::Embed,
            json!({ "url": "https://vimeo.com/42", "embed_type": "auto" }),
        )
        .unwrap();
        assert_eq!(
            embed.embed_url().as_deref(),
            Some("https://player.vimeo.com/video/42")
        );

        let empty = BlockContent::parse(BlockType::Embed, json!({})).unwrap();
        assert_eq!(empty.embed_url(), None);
    }
}
