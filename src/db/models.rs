//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::content::hierarchy::TreeNode;

/// Page model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub meta_description: Option<String>,
    pub is_published: bool,
    pub is_homepage: bool,
    pub parent_id: Option<Uuid>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TreeNode for Page {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    fn set_parent_id(&mut self, parent_id: Option<Uuid>) {
        self.parent_id = parent_id;
    }
}

/// Content block row; `content` is interpreted per `block_type`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: Uuid,
    pub page_id: Uuid,
    pub block_type: String,
    pub content: serde_json::Value,
    pub position: i32,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Page with its blocks in position order
#[derive(Debug, Clone, Serialize)]
pub struct PageWithBlocks {
    #[serde(flatten)]
    pub page: Page,
    pub content_blocks: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

/// Post model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub status: String,
    pub featured: bool,
    pub background_color: String,
    pub opacity: i32,
    pub sort_order: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published.as_str()
    }
}

/// Profile setting row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProfileSetting {
    pub setting_key: String,
    pub setting_value: Option<String>,
    pub updated_at: DateTime<Utc>,
}
