/**
 * Page Routes
 * Admin CRUD for pages, their block lists, and the page hierarchy
 */
use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::content::{BlockContent, BlockType, Change, HierarchicalPage};
use crate::db::models::{Page, PageWithBlocks};
use crate::db::pages::{self, Direction, NewBlock, NewPage, PageUpdate};
use crate::error::{ApiError, ApiJson, ApiPath, ApiResult};
use crate::routes::auth::verify_auth;
use crate::routes::SuccessResponse;
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

fn default_visible() -> bool {
    true
}

/// One block as submitted by the editor. Its position is its index in the list.
#[derive(Debug, Deserialize)]
pub struct BlockInput {
    pub block_type: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreatePageRequest {
    pub title: String,
    pub slug: Option<String>,
    pub meta_description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_homepage: bool,
    #[serde(default)]
    pub content_blocks: Vec<BlockInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePageRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub meta_description: Option<String>,
    pub is_published: Option<bool>,
    pub is_homepage: Option<bool>,
    pub content_blocks: Option<Vec<BlockInput>>,
}

#[derive(Debug, Serialize)]
pub struct UpdatePageResponse {
    pub success: bool,
    pub page: PageWithBlocks,
}

#[derive(Debug, Deserialize)]
pub struct SetParentRequest {
    #[serde(rename = "parentId", alias = "parent_id", default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderPagesRequest {
    #[serde(rename = "pageIds", alias = "page_ids")]
    pub page_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub direction: Direction,
}

/// Result of a hierarchy operation with the list as it now displays.
#[derive(Debug, Serialize)]
pub struct HierarchyResponse {
    pub changed: bool,
    pub pages: Vec<HierarchicalPage<Page>>,
}

impl From<(Change, Vec<HierarchicalPage<Page>>)> for HierarchyResponse {
    fn from((change, pages): (Change, Vec<HierarchicalPage<Page>>)) -> Self {
        Self {
            changed: change == Change::Applied,
            pages,
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Parse and validate submitted blocks, reporting the first bad one by index.
pub fn parse_blocks(inputs: Vec<BlockInput>) -> ApiResult<Vec<NewBlock>> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| {
            let parsed = input
                .block_type
                .parse::<BlockType>()
                .and_then(|block_type| BlockContent::parse_valid(block_type, input.content));
            match parsed {
                Ok(content) => Ok(NewBlock {
                    content,
                    is_visible: input.is_visible,
                }),
                Err(e) => Err(ApiError::bad_request(format!("Block {}: {}", index, e))),
            }
        })
        .collect()
}

fn require_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }
    Ok(title.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/pages
pub async fn list_pages(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Vec<Page>>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    Ok(Json(pages::list(pool).await?))
}

/// GET /api/pages/hierarchical
pub async fn hierarchical_pages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<HierarchicalPage<Page>>>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    Ok(Json(pages::hierarchical(pool).await?))
}

/// POST /api/pages
pub async fn create_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<CreatePageRequest>,
) -> ApiResult<(StatusCode, Json<PageWithBlocks>)> {
    verify_auth(&state.config.auth, &headers)?;

    let title = require_title(&payload.title)?;
    let blocks = parse_blocks(payload.content_blocks)?;
    let pool = state.pool()?;

    let page = pages::create(
        pool,
        NewPage {
            title,
            slug: payload.slug,
            meta_description: payload.meta_description,
            is_published: payload.is_published,
            is_homepage: payload.is_homepage,
        },
        blocks,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(page)))
}

/// GET /api/pages/{id}
pub async fn get_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<PageWithBlocks>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    pages::get(pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Page not found"))
}

/// PUT /api/pages/{id}
pub async fn update_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdatePageRequest>,
) -> ApiResult<Json<UpdatePageResponse>> {
    verify_auth(&state.config.auth, &headers)?;

    let title = payload.title.as_deref().map(require_title).transpose()?;
    let blocks = payload.content_blocks.map(parse_blocks).transpose()?;
    let pool = state.pool()?;

    let page = pages::update(
        pool,
        id,
        PageUpdate {
            title,
            slug: payload.slug,
            meta_description: payload.meta_description,
            is_published: payload.is_published,
            is_homepage: payload.is_homepage,
        },
        blocks,
    )
    .await?;
    Ok(Json(UpdatePageResponse {
        success: true,
        page,
    }))
}

/// DELETE /api/pages/{id}
pub async fn delete_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    pages::delete(pool, id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// PATCH /api/pages/{id}/parent
pub async fn set_page_parent(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<SetParentRequest>,
) -> ApiResult<Json<Page>> {
    verify_auth(&state.config.auth, &headers)?;
    if payload.parent_id == Some(id) {
        return Err(ApiError::bad_request("A page cannot be its own parent"));
    }
    let pool = state.pool()?;
    Ok(Json(pages::set_parent(pool, id, payload.parent_id).await?))
}

/// POST /api/pages/reorder
pub async fn reorder_pages(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ReorderPagesRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    verify_auth(&state.config.auth, &headers)?;
    crate::db::ensure_distinct(&payload.page_ids)?;
    let pool = state.pool()?;
    pages::reorder(pool, &payload.page_ids).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/pages/{id}/move
pub async fn move_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<MoveRequest>,
) -> ApiResult<Json<HierarchyResponse>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    Ok(Json(pages::move_page(pool, id, payload.direction).await?.into()))
}

/// POST /api/pages/{id}/nest
pub async fn nest_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<HierarchyResponse>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    Ok(Json(pages::nest_page(pool, id).await?.into()))
}

/// POST /api/pages/{id}/unnest
pub async fn unnest_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<HierarchyResponse>> {
    verify_auth(&state.config.auth, &headers)?;
    let pool = state.pool()?;
    Ok(Json(pages::unnest_page(pool, id).await?.into()))
}
