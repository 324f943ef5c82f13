/*!
 * Page Repository
 * Pages, their content blocks, and the hierarchy operations over them
 */
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::content::{
    flatten, generate_slug, is_valid_slug, unique_slug, validate_parent, BlockContent, Change,
    HierarchicalPage, PageList,
};
use crate::db::models::{ContentBlock, Page, PageWithBlocks};
use crate::db::{apply_order, ensure_distinct};
use crate::error::{ApiError, ApiResult};

/// A block to store at the position given by its index in the saved list.
#[derive(Debug, Clone)]
pub struct NewBlock {
    pub content: BlockContent,
    pub is_visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewPage {
    pub title: String,
    pub slug: Option<String>,
    pub meta_description: Option<String>,
    pub is_published: bool,
    pub is_homepage: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub meta_description: Option<String>,
    pub is_published: Option<bool>,
    pub is_homepage: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

const REORDER_SQL: &str = "UPDATE pages SET sort_order = $2, updated_at = now() WHERE id = $1";

pub async fn list(pool: &PgPool) -> ApiResult<Vec<Page>> {
    let pages = sqlx::query_as::<_, Page>(
        r#"
        SELECT id, title, slug, meta_description, is_published, is_homepage, parent_id, sort_order, created_at, updated_at
        FROM pages
        ORDER BY sort_order ASC, created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(pages)
}

pub async fn list_published(pool: &PgPool) -> ApiResult<Vec<Page>> {
    let pages = sqlx::query_as::<_, Page>(
        r#"
        SELECT id, title, slug, meta_description, is_published, is_homepage, parent_id, sort_order, created_at, updated_at
        FROM pages
        WHERE is_published = true
        ORDER BY sort_order ASC, created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(pages)
}

pub async fn hierarchical(pool: &PgPool) -> ApiResult<Vec<HierarchicalPage<Page>>> {
    Ok(flatten(&list(pool).await?))
}

async fn fetch_page(conn: &mut PgConnection, id: Uuid, lock: bool) -> ApiResult<Option<Page>> {
    let sql = if lock {
        r#"
        SELECT id, title, slug, meta_description, is_published, is_homepage, parent_id, sort_order, created_at, updated_at
        FROM pages WHERE id = $1 FOR UPDATE
        "#
    } else {
        r#"
        SELECT id, title, slug, meta_description, is_published, is_homepage, parent_id, sort_order, created_at, updated_at
        FROM pages WHERE id = $1
        "#
    };
    let page = sqlx::query_as::<_, Page>(sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(page)
}

async fn fetch_blocks(
    conn: &mut PgConnection,
    page_id: Uuid,
    visible_only: bool,
) -> ApiResult<Vec<ContentBlock>> {
    let blocks = sqlx::query_as::<_, ContentBlock>(
        r#"
        SELECT id, page_id, block_type, content, position, is_visible, created_at, updated_at
        FROM content_blocks
        WHERE page_id = $1 AND (is_visible OR NOT $2)
        ORDER BY position ASC
        "#,
    )
    .bind(page_id)
    .bind(visible_only)
    .fetch_all(&mut *conn)
    .await?;
    Ok(blocks)
}

pub async fn get(pool: &PgPool, id: Uuid) -> ApiResult<Option<PageWithBlocks>> {
    let mut conn = pool.acquire().await?;
    let Some(page) = fetch_page(&mut conn, id, false).await? else {
        return Ok(None);
    };
    let content_blocks = fetch_blocks(&mut conn, id, false).await?;
    Ok(Some(PageWithBlocks {
        page,
        content_blocks,
    }))
}

/// A published page by slug with only its visible blocks.
pub async fn get_published_by_slug(pool: &PgPool, slug: &str) -> ApiResult<Option<PageWithBlocks>> {
    let mut conn = pool.acquire().await?;
    let page = sqlx::query_as::<_, Page>(
        r#"
        SELECT id, title, slug, meta_description, is_published, is_homepage, parent_id, sort_order, created_at, updated_at
        FROM pages WHERE slug = $1 AND is_published = true
        "#,
    )
    .bind(slug)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(page) = page else {
        return Ok(None);
    };
    let content_blocks = fetch_blocks(&mut conn, page.id, true).await?;
    Ok(Some(PageWithBlocks {
        page,
        content_blocks,
    }))
}

async fn taken_slugs(conn: &mut PgConnection, base: &str, exclude: Option<Uuid>) -> ApiResult<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT slug FROM pages
        WHERE (slug = $1 OR slug LIKE $1 || '-%') AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(base)
    .bind(exclude)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|(s,)| s).collect())
}

/// An explicit slug must be well formed and free; a missing one is derived
/// from the title with a numeric suffix on collision.
async fn resolve_slug(
    conn: &mut PgConnection,
    requested: Option<&str>,
    title: &str,
    exclude: Option<Uuid>,
) -> ApiResult<String> {
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => {
            if !is_valid_slug(slug) {
                return Err(ApiError::bad_request(
                    "Slug must contain only lowercase letters, numbers, and hyphens",
                ));
            }
            let taken = taken_slugs(conn, slug, exclude).await?;
            if taken.iter().any(|s| s == slug) {
                return Err(ApiError::Conflict("Slug already exists".to_string()));
            }
            Ok(slug.to_string())
        }
        None => {
            let base = generate_slug(title);
            let taken = taken_slugs(conn, &base, exclude).await?;
            Ok(unique_slug(&base, &taken))
        }
    }
}

/// Delete every block of the page and insert `blocks` with dense positions.
async fn replace_blocks(
    conn: &mut PgConnection,
    page_id: Uuid,
    blocks: &[NewBlock],
) -> ApiResult<Vec<ContentBlock>> {
    sqlx::query("DELETE FROM content_blocks WHERE page_id = $1")
        .bind(page_id)
        .execute(&mut *conn)
        .await?;

    let mut stored = Vec::with_capacity(blocks.len());
    for (position, block) in blocks.iter().enumerate() {
        let row = sqlx::query_as::<_, ContentBlock>(
            r#"
            INSERT INTO content_blocks (page_id, block_type, content, position, is_visible)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, page_id, block_type, content, position, is_visible, created_at, updated_at
            "#,
        )
        .bind(page_id)
        .bind(block.content.block_type().as_str())
        .bind(block.content.to_value())
        .bind(position as i32)
        .bind(block.is_visible)
        .fetch_one(&mut *conn)
        .await?;
        stored.push(row);
    }
    Ok(stored)
}

/// New pages go to the end of the list.
pub async fn create(pool: &PgPool, new: NewPage, blocks: Vec<NewBlock>) -> ApiResult<PageWithBlocks> {
    let mut tx = pool.begin().await?;

    let slug = resolve_slug(&mut tx, new.slug.as_deref(), &new.title, None).await?;
    let (sort_order,): (i32,) =
        sqlx::query_as("SELECT COALESCE(MAX(sort_order) + 1, 0) FROM pages")
            .fetch_one(&mut *tx)
            .await?;

    let page = sqlx::query_as::<_, Page>(
        r#"
        INSERT INTO pages (title, slug, meta_description, is_published, is_homepage, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, title, slug, meta_description, is_published, is_homepage, parent_id, sort_order, created_at, updated_at
        "#,
    )
    .bind(&new.title)
    .bind(&slug)
    .bind(&new.meta_description)
    .bind(new.is_published)
    .bind(new.is_homepage)
    .bind(sort_order)
    .fetch_one(&mut *tx)
    .await?;

    let content_blocks = replace_blocks(&mut tx, page.id, &blocks).await?;
    tx.commit().await?;

    tracing::info!(page_id = %page.id, slug = %page.slug, blocks = content_blocks.len(), "page created");
    Ok(PageWithBlocks {
        page,
        content_blocks,
    })
}

/// An update with no meta description keeps the stored one; a blank one
/// clears it.
fn merge_meta_description(change: Option<String>, existing: Option<String>) -> Option<String> {
    match change {
        Some(text) if text.trim().is_empty() => None,
        Some(text) => Some(text),
        None => existing,
    }
}

/// Update page fields and, when `blocks` is given, replace the block list in
/// the same transaction.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: PageUpdate,
    blocks: Option<Vec<NewBlock>>,
) -> ApiResult<PageWithBlocks> {
    let mut tx = pool.begin().await?;

    let existing = fetch_page(&mut tx, id, true)
        .await?
        .ok_or_else(|| ApiError::not_found("Page not found"))?;

    let title = changes.title.unwrap_or(existing.title);
    let slug = match changes.slug {
        Some(slug) if slug != existing.slug => resolve_slug(&mut tx, Some(&slug), &title, Some(id)).await?,
        _ => existing.slug,
    };
    let meta_description = merge_meta_description(changes.meta_description, existing.meta_description);
    let is_published = changes.is_published.unwrap_or(existing.is_published);
    let is_homepage = changes.is_homepage.unwrap_or(existing.is_homepage);

    let page = sqlx::query_as::<_, Page>(
        r#"
        UPDATE pages
        SET title = $1, slug = $2, meta_description = $3, is_published = $4, is_homepage = $5, updated_at = now()
        WHERE id = $6
        RETURNING id, title, slug, meta_description, is_published, is_homepage, parent_id, sort_order, created_at, updated_at
        "#,
    )
    .bind(&title)
    .bind(&slug)
    .bind(&meta_description)
    .bind(is_published)
    .bind(is_homepage)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    let content_blocks = match blocks {
        Some(blocks) => replace_blocks(&mut tx, id, &blocks).await?,
        None => fetch_blocks(&mut tx, id, false).await?,
    };
    tx.commit().await?;

    tracing::info!(page_id = %id, slug = %page.slug, "page updated");
    Ok(PageWithBlocks {
        page,
        content_blocks,
    })
}

/// Blocks go with the page; child pages move to the top level.
pub async fn delete(pool: &PgPool, id: Uuid) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM pages WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Page not found"));
    }
    tracing::info!(page_id = %id, "page deleted");
    Ok(())
}

/// Reparent a page, keeping nesting one level deep.
pub async fn set_parent(pool: &PgPool, id: Uuid, parent_id: Option<Uuid>) -> ApiResult<Page> {
    let mut tx = pool.begin().await?;

    let pages = sqlx::query_as::<_, Page>(
        r#"
        SELECT id, title, slug, meta_description, is_published, is_homepage, parent_id, sort_order, created_at, updated_at
        FROM pages
        ORDER BY sort_order ASC, created_at ASC
        FOR UPDATE
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;
    validate_parent(&pages, id, parent_id)?;

    let page = sqlx::query_as::<_, Page>(
        r#"
        UPDATE pages SET parent_id = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, title, slug, meta_description, is_published, is_homepage, parent_id, sort_order, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(parent_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(page_id = %id, parent_id = ?parent_id, "page parent updated");
    Ok(page)
}

/// Persist a full page order as dense `sort_order` values, all or nothing.
pub async fn reorder(pool: &PgPool, ids: &[Uuid]) -> ApiResult<()> {
    ensure_distinct(ids)?;
    let mut tx = pool.begin().await?;
    apply_order(&mut tx, REORDER_SQL, ids, "Page").await?;
    tx.commit().await?;
    tracing::info!(count = ids.len(), "pages reordered");
    Ok(())
}

async fn load_list(pool: &PgPool, id: Uuid) -> ApiResult<PageList<Page>> {
    let list = PageList::new(list(pool).await?);
    if list.position(id).is_none() {
        return Err(ApiError::not_found("Page not found"));
    }
    Ok(list)
}

/// Swap a page with its neighbour in the full list.
pub async fn move_page(
    pool: &PgPool,
    id: Uuid,
    direction: Direction,
) -> ApiResult<(Change, Vec<HierarchicalPage<Page>>)> {
    let mut list = load_list(pool, id).await?;
    let index = list
        .position(id)
        .ok_or_else(|| ApiError::not_found("Page not found"))?;

    let persist = |order: Vec<Uuid>| async move { reorder(pool, &order).await };
    let change = match direction {
        Direction::Up => list.move_up(index, persist).await?,
        Direction::Down => list.move_down(index, persist).await?,
    };
    Ok((change, list.display()))
}

/// Nest a page under the page displayed above it.
pub async fn nest_page(pool: &PgPool, id: Uuid) -> ApiResult<(Change, Vec<HierarchicalPage<Page>>)> {
    let mut list = load_list(pool, id).await?;
    let display_index = list
        .display_position(id)
        .ok_or_else(|| ApiError::not_found("Page not found"))?;

    let change = list
        .nest(display_index, |page_id, parent_id| async move {
            set_parent(pool, page_id, parent_id).await.map(|_| ())
        })
        .await?;
    Ok((change, list.display()))
}

pub async fn unnest_page(pool: &PgPool, id: Uuid) -> ApiResult<(Change, Vec<HierarchicalPage<Page>>)> {
    let mut list = load_list(pool, id).await?;
    let display_index = list
        .display_position(id)
        .ok_or_else(|| ApiError::not_found("Page not found"))?;

    let change = list
        .unnest(display_index, |page_id, parent_id| async move {
            set_parent(pool, page_id, parent_id).await.map(|_| ())
        })
        .await?;
    Ok((change, list.display()))
}
