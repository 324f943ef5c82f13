/**
 * Public Routes
 * Anonymous, cacheable reads of published pages and posts
 */
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{is_valid_slug, BlockContent, BlockType};
use crate::db::models::{ContentBlock, PageWithBlocks, Post, PostStatus};
use crate::db::{pages, posts};
use crate::error::{ApiError, ApiPath, ApiQuery, ApiResult};
use crate::render::render_markdown;
use crate::routes::posts::ListPostsQuery;
use crate::routes::public_cache;
use crate::AppState;

const HOME_SLUG: &str = "home";

// ============================================================================
// Response Types
// ============================================================================

/// A visible block ready for the public renderer.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicBlock {
    pub id: Uuid,
    pub block_type: String,
    pub position: i32,
    pub content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicPage {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub meta_description: Option<String>,
    pub is_homepage: bool,
    pub content_blocks: Vec<PublicBlock>,
}

#[derive(Debug, Serialize)]
pub struct PublicPost {
    #[serde(flatten)]
    pub post: Post,
    pub content_html: String,
    pub excerpt_html: Option<String>,
}

// ============================================================================
// Presentation
// ============================================================================

/// Normalize a stored block and attach its rendered html and player URL.
/// Blocks that no longer parse are dropped from the public page.
pub fn present_block(block: ContentBlock) -> Option<PublicBlock> {
    let parsed = block
        .block_type
        .parse::<BlockType>()
        .and_then(|block_type| BlockContent::parse(block_type, block.content));
    let content = match parsed {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(block_id = %block.id, error = %e, "skipping unreadable block");
            return None;
        }
    };

    Some(PublicBlock {
        id: block.id,
        block_type: block.block_type,
        position: block.position,
        html: content.text_body().map(render_markdown),
        embed_url: content.embed_url(),
        content: content.to_value(),
    })
}

pub fn present_page(page: PageWithBlocks) -> PublicPage {
    let mut blocks: Vec<PublicBlock> = page
        .content_blocks
        .into_iter()
        .filter(|b| b.is_visible)
        .filter_map(present_block)
        .collect();
    blocks.sort_by_key(|b| b.position);

    PublicPage {
        id: page.page.id,
        title: page.page.title,
        slug: page.page.slug,
        meta_description: page.page.meta_description,
        is_homepage: page.page.is_homepage,
        content_blocks: blocks,
    }
}

pub fn present_post(post: Post) -> PublicPost {
    PublicPost {
        content_html: render_markdown(&post.content),
        excerpt_html: post.excerpt.as_deref().map(render_markdown),
        post,
    }
}

fn check_slug(slug: &str) -> ApiResult<()> {
    if !is_valid_slug(slug) {
        return Err(ApiError::bad_request("Invalid slug"));
    }
    Ok(())
}

async fn published_page(state: &AppState, slug: &str) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let page = pages::get_published_by_slug(pool, slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Page not found"))?;
    Ok((public_cache(state.config.public_cache_secs), Json(present_page(page))))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/public/home
pub async fn home(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    published_page(&state, HOME_SLUG).await
}

/// GET /api/public/pages/{slug}
pub async fn page_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    check_slug(&slug)?;
    published_page(&state, &slug).await
}

/// GET /api/public/posts
pub async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListPostsQuery>,
) -> ApiResult<impl IntoResponse> {
    let mut filter = query.into_filter();
    filter.status = Some(PostStatus::Published);

    let pool = state.pool()?;
    let posts = posts::list(pool, &filter).await?;
    Ok((public_cache(state.config.public_cache_secs), Json(posts)))
}

/// GET /api/public/posts/{slug}
pub async fn post_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    check_slug(&slug)?;
    let pool = state.pool()?;
    let post = posts::get_published_by_slug(pool, &slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Ok((public_cache(state.config.public_cache_secs), Json(present_post(post))))
}
