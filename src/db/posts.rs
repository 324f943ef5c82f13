/*!
 * Post Repository
 */
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::content::{generate_slug, unique_slug};
use crate::db::models::{Post, PostStatus};
use crate::db::{apply_order, ensure_distinct};
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_BACKGROUND_COLOR: &str = "#000000";
pub const DEFAULT_OPACITY: i32 = 100;

const REORDER_SQL: &str = "UPDATE posts SET sort_order = $2, updated_at = now() WHERE id = $1";

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub featured: bool,
    pub background_color: Option<String>,
    pub opacity: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub featured: Option<bool>,
    pub background_color: Option<String>,
    pub opacity: Option<i32>,
}

/// `published_at` is stamped when a post becomes published and cleared when
/// it goes back to draft.
pub fn next_published_at(
    current_status: &str,
    current: Option<DateTime<Utc>>,
    requested: Option<PostStatus>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match requested {
        Some(PostStatus::Published) if current_status != PostStatus::Published.as_str() => Some(now),
        Some(PostStatus::Published) => current.or(Some(now)),
        Some(PostStatus::Draft) => None,
        None => current,
    }
}

pub async fn list(pool: &PgPool, filter: &PostFilter) -> ApiResult<Vec<Post>> {
    let posts = sqlx::query_as::<_, Post>(
        r#"
        SELECT id, title, slug, excerpt, content, image_url, category, tags, status, featured,
               background_color, opacity, sort_order, created_at, updated_at, published_at
        FROM posts
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR category = $2)
          AND ($3::bool IS NULL OR featured = $3)
          AND ($4::text IS NULL OR $4 = ANY(tags))
        ORDER BY sort_order ASC NULLS LAST, created_at DESC
        LIMIT $5 OFFSET COALESCE($6, 0)
        "#,
    )
    .bind(filter.status.map(|s| s.as_str()))
    .bind(&filter.category)
    .bind(filter.featured)
    .bind(&filter.tag)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;
    Ok(posts)
}

/// Most recently published first, for feeds.
pub async fn recent_published(pool: &PgPool, limit: i64) -> ApiResult<Vec<Post>> {
    let posts = sqlx::query_as::<_, Post>(
        r#"
        SELECT id, title, slug, excerpt, content, image_url, category, tags, status, featured,
               background_color, opacity, sort_order, created_at, updated_at, published_at
        FROM posts
        WHERE status = 'published'
        ORDER BY COALESCE(published_at, created_at) DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(posts)
}

pub async fn get(pool: &PgPool, id: Uuid) -> ApiResult<Option<Post>> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        SELECT id, title, slug, excerpt, content, image_url, category, tags, status, featured,
               background_color, opacity, sort_order, created_at, updated_at, published_at
        FROM posts WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(post)
}

pub async fn get_published_by_slug(pool: &PgPool, slug: &str) -> ApiResult<Option<Post>> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        SELECT id, title, slug, excerpt, content, image_url, category, tags, status, featured,
               background_color, opacity, sort_order, created_at, updated_at, published_at
        FROM posts WHERE slug = $1 AND status = 'published'
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(post)
}

async fn slug_for_title(conn: &mut PgConnection, title: &str, exclude: Option<Uuid>) -> ApiResult<String> {
    let base = generate_slug(title);
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT slug FROM posts
        WHERE (slug = $1 OR slug LIKE $1 || '-%') AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(&base)
    .bind(exclude)
    .fetch_all(&mut *conn)
    .await?;
    let taken: Vec<String> = rows.into_iter().map(|(s,)| s).collect();
    Ok(unique_slug(&base, &taken))
}

pub async fn create(pool: &PgPool, new: NewPost) -> ApiResult<Post> {
    let mut tx = pool.begin().await?;

    let slug = slug_for_title(&mut tx, &new.title, None).await?;
    let published_at = next_published_at(PostStatus::Draft.as_str(), None, Some(new.status), Utc::now());

    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (title, slug, excerpt, content, image_url, category, tags, status, featured,
                           background_color, opacity, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id, title, slug, excerpt, content, image_url, category, tags, status, featured,
                  background_color, opacity, sort_order, created_at, updated_at, published_at
        "#,
    )
    .bind(&new.title)
    .bind(&slug)
    .bind(&new.excerpt)
    .bind(&new.content)
    .bind(&new.image_url)
    .bind(&new.category)
    .bind(&new.tags)
    .bind(new.status.as_str())
    .bind(new.featured)
    .bind(new.background_color.as_deref().unwrap_or(DEFAULT_BACKGROUND_COLOR))
    .bind(new.opacity.unwrap_or(DEFAULT_OPACITY))
    .bind(published_at)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(post_id = %post.id, slug = %post.slug, "post created");
    Ok(post)
}

/// A changed title regenerates the slug.
pub async fn update(pool: &PgPool, id: Uuid, changes: PostUpdate) -> ApiResult<Post> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Post>(
        r#"
        SELECT id, title, slug, excerpt, content, image_url, category, tags, status, featured,
               background_color, opacity, sort_order, created_at, updated_at, published_at
        FROM posts WHERE id = $1 FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let slug = match &changes.title {
        Some(title) if *title != existing.title => slug_for_title(&mut tx, title, Some(id)).await?,
        _ => existing.slug.clone(),
    };
    let published_at = next_published_at(
        &existing.status,
        existing.published_at,
        changes.status,
        Utc::now(),
    );
    let status = changes
        .status
        .map(|s| s.as_str().to_string())
        .unwrap_or(existing.status);

    let post = sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET title = $1, slug = $2, excerpt = $3, content = $4, image_url = $5, category = $6,
            tags = $7, status = $8, featured = $9, background_color = $10, opacity = $11,
            published_at = $12, updated_at = now()
        WHERE id = $13
        RETURNING id, title, slug, excerpt, content, image_url, category, tags, status, featured,
                  background_color, opacity, sort_order, created_at, updated_at, published_at
        "#,
    )
    .bind(changes.title.unwrap_or(existing.title))
    .bind(&slug)
    .bind(changes.excerpt.or(existing.excerpt))
    .bind(changes.content.unwrap_or(existing.content))
    .bind(changes.image_url.or(existing.image_url))
    .bind(changes.category.or(existing.category))
    .bind(changes.tags.unwrap_or(existing.tags))
    .bind(&status)
    .bind(changes.featured.unwrap_or(existing.featured))
    .bind(changes.background_color.unwrap_or(existing.background_color))
    .bind(changes.opacity.unwrap_or(existing.opacity))
    .bind(published_at)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(post_id = %id, slug = %post.slug, "post updated");
    Ok(post)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Post not found"));
    }
    tracing::info!(post_id = %id, "post deleted");
    Ok(())
}

pub async fn reorder(pool: &PgPool, ids: &[Uuid]) -> ApiResult<()> {
    ensure_distinct(ids)?;
    let mut tx = pool.begin().await?;
    apply_order(&mut tx, REORDER_SQL, ids, "Post").await?;
    tx.commit().await?;
    tracing::info!(count = ids.len(), "posts reordered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_published_at_transitions() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        assert_eq!(
            next_published_at("draft", None, Some(PostStatus::Published), now),
            Some(now)
        );
        assert_eq!(
            next_published_at("published", Some(earlier), Some(PostStatus::Published), now),
            Some(earlier)
        );
        assert_eq!(
            next_published_at("published", Some(earlier), Some(PostStatus::Draft), now),
            None
        );
        assert_eq!(
            next_published_at("published", Some(earlier), None, now),
            Some(earlier)
        );
        assert_eq!(next_published_at("draft", None, Some(PostStatus::Draft), now), None);
    }

    #[test]
    fn test_second_post_with_same_title_gets_suffix() {
        let base = generate_slug("Hello, World!");
        assert_eq!(unique_slug(&base, &["hello-world"]), "hello-world-1");
    }
}
